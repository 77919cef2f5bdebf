use anyhow::Result;
use log::{info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use super::open_store;
use crate::api::handlers::AppState;
use crate::api::routes::create_router;
use crate::auth::TokenAuthenticator;
use crate::config::settings::AppConfig;

pub struct ServerService {
    port: u16,
    config: AppConfig,
}

impl ServerService {
    pub fn new(port: u16, config: AppConfig) -> Self {
        Self { port, config }
    }

    pub async fn run(&self) -> Result<()> {
        let pool = open_store(&self.config)?;
        info!("Using database {}", self.config.storage.database_path);

        let authenticator = TokenAuthenticator::from_env()?;
        if authenticator.is_empty() {
            warn!("No admin tokens configured; config and admin endpoints will reject every request");
        } else {
            info!("Loaded {} admin token(s)", authenticator.len());
        }

        let state = Arc::new(AppState::build(self.config.clone(), pool, Arc::new(authenticator))?);

        let app = create_router(state)
            .layer(CorsLayer::permissive());

        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        info!("Server listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}
