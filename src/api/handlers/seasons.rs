use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use chrono::Utc;
use log::info;
use std::sync::Arc;

use super::{AppState, IDEMPOTENT_REPLAYED, idempotency_key};
use crate::api::models::ResetRequest;
use crate::auth::AdminIdentity;
use crate::errors::LeagueError;
use crate::services::season::SeasonOutcome;

pub async fn start_new_season(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AdminIdentity>,
    headers: HeaderMap,
) -> Result<Response, LeagueError> {
    let key = idempotency_key(&headers)?;
    let outcome = state.seasons.start_new_season(Utc::now(), key.as_deref())?;
    Ok(outcome_response(&admin, outcome))
}

pub async fn distribute_rewards(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AdminIdentity>,
    headers: HeaderMap,
) -> Result<Response, LeagueError> {
    let key = idempotency_key(&headers)?;
    let outcome = state.seasons.distribute_rewards(Utc::now(), key.as_deref())?;
    Ok(outcome_response(&admin, outcome))
}

/// A missing or unreadable body is treated as an absent confirmation.
pub async fn reset_season_data(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AdminIdentity>,
    headers: HeaderMap,
    body: Option<Json<ResetRequest>>,
) -> Result<Response, LeagueError> {
    let key = idempotency_key(&headers)?;
    let Json(request) = body.unwrap_or_default();
    let outcome = state
        .seasons
        .reset_season_data(&request.confirmation, Utc::now(), key.as_deref())?;
    Ok(outcome_response(&admin, outcome))
}

fn outcome_response(admin: &AdminIdentity, outcome: SeasonOutcome) -> Response {
    if outcome.replayed {
        info!("{} replayed {}", admin.name, outcome.action);
    } else {
        info!("{} ran {}: {}", admin.name, outcome.action, outcome.message);
    }

    let replayed = outcome.replayed;
    let mut response = Json(outcome).into_response();
    if replayed {
        response
            .headers_mut()
            .insert(IDEMPOTENT_REPLAYED, HeaderValue::from_static("true"));
    }
    response
}
