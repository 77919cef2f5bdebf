use anyhow::Result;
use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use std::sync::Arc;

use crate::api::models::HealthResponse;
use crate::auth::Authenticator;
use crate::config::settings::AppConfig;
use crate::database::DbPool;
use crate::errors::LeagueError;
use crate::services::config::ConfigService;
use crate::services::export::ExportService;
use crate::services::notifications::NotificationService;
use crate::services::season::SeasonService;

pub mod admin;
pub mod config;
pub mod players;
pub mod seasons;

pub const IDEMPOTENCY_KEY: &str = "idempotency-key";
pub const IDEMPOTENT_REPLAYED: &str = "idempotent-replayed";

pub struct AppState {
    pub settings: AppConfig,
    pub pool: DbPool,
    pub config: Arc<ConfigService>,
    pub seasons: SeasonService,
    pub notifications: NotificationService,
    pub exports: ExportService,
    pub authenticator: Arc<dyn Authenticator>,
}

impl AppState {
    /// Wires the services over an initialized store and seeds any missing
    /// config sections.
    pub fn build(settings: AppConfig, pool: DbPool, authenticator: Arc<dyn Authenticator>) -> Result<Self> {
        let config = Arc::new(ConfigService::new(pool.clone()));
        config.initialize()?;

        let seasons = SeasonService::new(pool.clone(), Arc::clone(&config), &settings.storage.archive_dir);
        let notifications = NotificationService::new(pool.clone(), Arc::clone(&config), &settings.webhook)?;
        let exports = ExportService::from_settings(pool.clone(), &settings.export);

        Ok(Self {
            settings,
            pool,
            config,
            seasons,
            notifications,
            exports,
            authenticator,
        })
    }
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let database = match state.pool.get().map(|conn| conn.query_row("SELECT 1", [], |r| r.get::<_, i64>(0))) {
        Ok(Ok(_)) => "ok".to_string(),
        Ok(Err(e)) => format!("error: {}", e),
        Err(e) => format!("unavailable: {}", e),
    };

    Json(HealthResponse {
        ok: database == "ok",
        database,
    })
}

/// Reads the `Idempotency-Key` header. Blank values count as absent.
pub fn idempotency_key(headers: &HeaderMap) -> Result<Option<String>, LeagueError> {
    let Some(value) = headers.get(IDEMPOTENCY_KEY) else {
        return Ok(None);
    };

    let key = value
        .to_str()
        .map_err(|_| LeagueError::field("Idempotency-Key", "header", "must be visible ASCII"))?
        .trim();
    if key.len() > 128 {
        return Err(LeagueError::field("Idempotency-Key", "header", "must be at most 128 characters"));
    }
    Ok(Some(key.to_string()).filter(|k| !k.is_empty()))
}
