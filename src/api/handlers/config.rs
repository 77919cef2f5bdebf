use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderValue, header};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use log::info;
use serde_json::Value;
use std::sync::Arc;

use super::AppState;
use crate::auth::AdminIdentity;
use crate::errors::LeagueError;
use crate::league::{BotConfig, RankTier, RewardTier, Section};
use crate::services::config::VersionedSection;

pub async fn get_config(State(state): State<Arc<AppState>>) -> Result<Json<BotConfig>, LeagueError> {
    Ok(Json(state.config.config()?))
}

pub async fn get_section(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Response, LeagueError> {
    let section: Section = name.parse()?;
    Ok(section_response(state.config.section(section)?))
}

pub async fn patch_section(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AdminIdentity>,
    Path(name): Path<String>,
    headers: HeaderMap,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Response, LeagueError> {
    let section: Section = name.parse()?;
    let if_match = if_match(&headers)?;
    let Json(patch) = payload.map_err(|e| LeagueError::field(section.key(), "json", &e.body_text()))?;

    let saved = state.config.patch_section(section, &patch, if_match)?;
    info!("{} updated config section {} to version {}", admin.name, section, saved.version);
    Ok(section_response(saved))
}

pub async fn add_rank_tier(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AdminIdentity>,
    headers: HeaderMap,
    payload: Result<Json<RankTier>, JsonRejection>,
) -> Result<Response, LeagueError> {
    let if_match = if_match(&headers)?;
    let Json(tier) = payload.map_err(|e| LeagueError::field("seasonManagement.rankTiers", "json", &e.body_text()))?;

    let name = tier.name.clone();
    let saved = state.config.add_rank_tier(tier, if_match)?;
    info!("{} added rank tier {}", admin.name, name);
    Ok(section_response(saved))
}

pub async fn add_reward_tier(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AdminIdentity>,
    headers: HeaderMap,
    payload: Result<Json<RewardTier>, JsonRejection>,
) -> Result<Response, LeagueError> {
    let if_match = if_match(&headers)?;
    let Json(tier) = payload.map_err(|e| LeagueError::field("seasonManagement.rewardTiers", "json", &e.body_text()))?;

    let name = tier.name.clone();
    let saved = state.config.add_reward_tier(tier, if_match)?;
    info!("{} added reward tier {}", admin.name, name);
    Ok(section_response(saved))
}

fn section_response(saved: VersionedSection) -> Response {
    let mut response = Json(saved.body).into_response();
    if let Ok(etag) = HeaderValue::from_str(&format!("\"{}\"", saved.version)) {
        response.headers_mut().insert(header::ETAG, etag);
    }
    response
}

/// Parses `If-Match` as a section version. Accepts `"3"`, `W/"3"` and `3`;
/// `*` matches any version.
pub fn if_match(headers: &HeaderMap) -> Result<Option<i64>, LeagueError> {
    let Some(value) = headers.get(header::IF_MATCH) else {
        return Ok(None);
    };

    let invalid = || LeagueError::field("If-Match", "header", "must be a section version such as \"3\"");
    let raw = value.to_str().map_err(|_| invalid())?.trim();
    if raw == "*" {
        return Ok(None);
    }

    raw.trim_start_matches("W/")
        .trim_matches('"')
        .parse()
        .map(Some)
        .map_err(|_| invalid())
}
