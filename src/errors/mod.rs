use crate::league::{FieldError, UnknownSection};

/// Failures surfaced by the service layer.
///
/// Storage code below the services works with `anyhow` and context strings;
/// anything that reaches a caller is classified here.
#[derive(Debug, thiserror::Error)]
pub enum LeagueError {
    #[error("validation failed for {} field(s)", .0.len())]
    Validation(Vec<FieldError>),

    #[error("unknown config section `{0}`")]
    UnknownSection(String),

    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    #[error("section `{section}` is at version {actual}, request expected {expected}")]
    VersionConflict { section: String, expected: i64, actual: i64 },

    #[error("idempotency key `{key}` was already used for `{action}`")]
    IdempotencyConflict { key: String, action: String },

    #[error("confirmation `{expected}` is required")]
    ConfirmationRequired { expected: &'static str },

    #[error("missing or invalid admin credentials")]
    Unauthorized,

    #[error("{dependency} failed: {detail}")]
    ExternalDependency { dependency: &'static str, detail: String },

    #[error("{failed} failed after {completed}: {detail}")]
    PartialFailure {
        completed: String,
        failed: &'static str,
        detail: String,
    },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl LeagueError {
    pub fn field(field: &str, code: &str, message: &str) -> Self {
        LeagueError::Validation(vec![FieldError::new(field, code, message)])
    }

    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        LeagueError::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub fn database_unavailable(error: impl std::fmt::Display) -> Self {
        LeagueError::ExternalDependency {
            dependency: "database",
            detail: error.to_string(),
        }
    }

    /// Stable machine-readable code sent to API clients.
    pub fn code(&self) -> &'static str {
        match self {
            LeagueError::Validation(_) => "validation_failed",
            LeagueError::UnknownSection(_) => "unknown_section",
            LeagueError::NotFound { .. } => "not_found",
            LeagueError::VersionConflict { .. } => "version_conflict",
            LeagueError::IdempotencyConflict { .. } => "idempotency_conflict",
            LeagueError::ConfirmationRequired { .. } => "confirmation_required",
            LeagueError::Unauthorized => "unauthorized",
            LeagueError::ExternalDependency { .. } => "dependency_failed",
            LeagueError::PartialFailure { .. } => "partial_failure",
            LeagueError::Internal(_) => "internal",
        }
    }

    /// Whether the failure left no side effects behind, so the same request
    /// can be sent again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LeagueError::ExternalDependency { .. } | LeagueError::VersionConflict { .. }
        )
    }
}

impl From<UnknownSection> for LeagueError {
    fn from(e: UnknownSection) -> Self {
        LeagueError::UnknownSection(e.0)
    }
}

impl From<rusqlite::Error> for LeagueError {
    fn from(e: rusqlite::Error) -> Self {
        LeagueError::Internal(anyhow::Error::new(e).context("Database statement failed"))
    }
}

impl From<r2d2::Error> for LeagueError {
    fn from(e: r2d2::Error) -> Self {
        LeagueError::database_unavailable(e)
    }
}

impl From<Vec<FieldError>> for LeagueError {
    fn from(errors: Vec<FieldError>) -> Self {
        LeagueError::Validation(errors)
    }
}
