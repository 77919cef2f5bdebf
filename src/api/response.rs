use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use log::{error, warn};
use serde_json::json;

use crate::errors::LeagueError;

pub fn status_for(error: &LeagueError) -> StatusCode {
    match error {
        LeagueError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        LeagueError::UnknownSection(_) | LeagueError::NotFound { .. } => StatusCode::NOT_FOUND,
        LeagueError::VersionConflict { .. } => StatusCode::PRECONDITION_FAILED,
        LeagueError::IdempotencyConflict { .. } => StatusCode::CONFLICT,
        LeagueError::ConfirmationRequired { .. } => StatusCode::BAD_REQUEST,
        LeagueError::Unauthorized => StatusCode::UNAUTHORIZED,
        LeagueError::ExternalDependency { .. } => StatusCode::BAD_GATEWAY,
        LeagueError::PartialFailure { .. } | LeagueError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Message shown to API clients. Server-side failures get a generic text;
/// their details only go to the log.
fn public_message(error: &LeagueError) -> String {
    match error {
        LeagueError::ExternalDependency { dependency, .. } => format!("{} is unavailable", dependency),
        LeagueError::PartialFailure { failed, .. } => {
            format!("{} failed after partially completing; check the server log before retrying", failed)
        }
        LeagueError::Internal(_) => "Internal server error".to_string(),
        other => other.to_string(),
    }
}

impl IntoResponse for LeagueError {
    fn into_response(self) -> Response {
        let status = status_for(&self);
        if status.is_server_error() {
            error!("Request failed: {:#}", self);
        } else if status != StatusCode::NOT_FOUND {
            warn!("Request rejected: {}", self);
        }

        let mut body = json!({
            "error": self.code(),
            "message": public_message(&self),
            "retryable": self.is_retryable(),
        });
        match &self {
            LeagueError::Validation(fields) => body["fields"] = json!(fields),
            LeagueError::PartialFailure { completed, .. } => body["completed"] = json!(completed),
            _ => {}
        }

        let mut response = (status, Json(body)).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}
