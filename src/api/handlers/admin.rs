use axum::extract::State;
use axum::http::{HeaderValue, header};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use chrono::Utc;
use log::info;
use std::sync::Arc;

use super::AppState;
use crate::auth::AdminIdentity;
use crate::errors::LeagueError;
use crate::services::notifications::DispatchReport;

/// Streams a database export back as a file download.
pub async fn export_database(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AdminIdentity>,
) -> Result<Response, LeagueError> {
    let artifact = state.exports.export(Utc::now()).await?;
    info!("{} exported the database as {}", admin.name, artifact.file_name);

    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", artifact.file_name))
        .map_err(|e| LeagueError::Internal(anyhow::Error::new(e).context("Invalid export file name")))?;

    let mut response = artifact.bytes.into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(artifact.content_type));
    headers.insert(header::CONTENT_DISPOSITION, disposition);
    Ok(response)
}

pub async fn dispatch_notifications(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AdminIdentity>,
) -> Result<Json<DispatchReport>, LeagueError> {
    info!("{} requested notification dispatch", admin.name);
    Ok(Json(state.notifications.dispatch_pending().await?))
}
