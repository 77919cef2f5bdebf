use log::{info, warn};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::config::ConfigService;
use crate::config::settings::WebhookSettings;
use crate::database::{self, DbPool, OutboxEntry};
use crate::errors::LeagueError;
use crate::http::RateLimitedClient;

/// Most notifications sent by one dispatch run.
const DISPATCH_BATCH: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchReport {
    pub enabled: bool,
    pub sent: usize,
    pub failed: usize,
    pub remaining: i64,
}

/// Discord-compatible webhook body.
#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    username: &'a str,
    content: String,
}

/// Delivers queued notifications to the configured webhook.
pub struct NotificationService {
    pool: DbPool,
    config: Arc<ConfigService>,
    client: Mutex<RateLimitedClient>,
}

impl NotificationService {
    pub fn new(pool: DbPool, config: Arc<ConfigService>, settings: &WebhookSettings) -> anyhow::Result<Self> {
        let client = RateLimitedClient::new(settings.user_agent, settings.timeout_secs, settings.rate_limit_ms)?;
        Ok(Self {
            pool,
            config,
            client: Mutex::new(client),
        })
    }

    /// Sends pending notifications oldest first. Failed entries stay pending
    /// with their error recorded. Concurrent calls are serialized.
    pub async fn dispatch_pending(&self) -> Result<DispatchReport, LeagueError> {
        let mut client = self.client.lock().await;

        let config = self.config.config()?;
        let integrations = &config.integrations;
        let url = match (&integrations.webhook_url, integrations.enable_webhooks) {
            (Some(url), true) => url.clone(),
            _ => {
                let remaining = database::notifications::count_pending(&*self.pool.get()?)?;
                info!("Webhooks disabled; {} notifications left pending", remaining);
                return Ok(DispatchReport {
                    remaining,
                    ..DispatchReport::default()
                });
            }
        };

        let pending = database::notifications::list_pending(&*self.pool.get()?, DISPATCH_BATCH)?;
        let mut report = DispatchReport {
            enabled: true,
            ..DispatchReport::default()
        };

        client.reset();
        for entry in pending {
            let payload = WebhookPayload {
                username: &config.general.bot_name,
                content: self.content(&entry)?,
            };
            let result = client.post_json(&url, &payload).await;

            let conn = self.pool.get()?;
            match result {
                Ok(_) => {
                    database::notifications::mark_sent(&conn, entry.id, chrono::Utc::now())?;
                    report.sent += 1;
                }
                Err(e) => {
                    warn!("Notification {} not delivered: {:#}", entry.id, e);
                    database::notifications::mark_failed(&conn, entry.id, &format!("{:#}", e))?;
                    report.failed += 1;
                }
            }
        }

        report.remaining = database::notifications::count_pending(&*self.pool.get()?)?;
        info!(
            "Dispatched notifications: {} sent, {} failed, {} pending",
            report.sent, report.failed, report.remaining
        );
        Ok(report)
    }

    /// Message text, mentioning the player when they are still registered.
    fn content(&self, entry: &OutboxEntry) -> Result<String, LeagueError> {
        let conn = self.pool.get()?;
        Ok(match database::players::find_by_id(&conn, entry.player_id)? {
            Some(player) => format!("<@{}> {}", player.discord_id, entry.message),
            None => entry.message.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use axum::Router;
    use axum::http::StatusCode;
    use axum::routing::post;
    use chrono::Utc;
    use serde_json::json;

    use super::*;
    use crate::database::setup::initialize_database;
    use crate::league::Section;

    fn service() -> (NotificationService, Arc<ConfigService>, DbPool) {
        let pool = database::create_memory_pool().unwrap();
        initialize_database(&pool.get().unwrap()).unwrap();
        let config = Arc::new(ConfigService::new(pool.clone()));
        config.initialize().unwrap();

        let settings = WebhookSettings {
            rate_limit_ms: 0,
            timeout_secs: 2,
            ..WebhookSettings::default()
        };
        let service = NotificationService::new(pool.clone(), Arc::clone(&config), &settings).unwrap();
        (service, config, pool)
    }

    fn queue(pool: &DbPool, count: i64) {
        let conn = pool.get().unwrap();
        for player in 1..=count {
            database::notifications::enqueue(&conn, player, 1, "season_reward", "Well played", Utc::now()).unwrap();
        }
    }

    fn enable_webhook(config: &ConfigService, url: &str) {
        config
            .patch_section(Section::Integrations, &json!({ "enableWebhooks": true, "webhookUrl": url }), None)
            .unwrap();
    }

    #[tokio::test]
    async fn test_disabled_webhooks_leave_queue_alone() {
        let (service, _config, pool) = service();
        queue(&pool, 2);

        let report = service.dispatch_pending().await.unwrap();

        assert!(!report.enabled);
        assert_eq!(report.remaining, 2);
        let conn = pool.get().unwrap();
        assert!(database::notifications::list_all(&conn).unwrap().iter().all(|e| e.attempts == 0));
    }

    #[tokio::test]
    async fn test_delivers_to_webhook() {
        let app = Router::new().route("/hook", post(|| async { StatusCode::NO_CONTENT }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        let (service, config, pool) = service();
        enable_webhook(&config, &format!("http://{}/hook", addr));
        queue(&pool, 3);

        let report = service.dispatch_pending().await.unwrap();

        assert_eq!((report.sent, report.failed, report.remaining), (3, 0, 0));
        let conn = pool.get().unwrap();
        assert!(database::notifications::list_all(&conn).unwrap().iter().all(|e| e.status == "sent"));
    }

    #[tokio::test]
    async fn test_failed_delivery_stays_pending() {
        let app = Router::new().route("/hook", post(|| async { StatusCode::INTERNAL_SERVER_ERROR }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        let (service, config, pool) = service();
        enable_webhook(&config, &format!("http://{}/hook", addr));
        queue(&pool, 1);

        let report = service.dispatch_pending().await.unwrap();

        assert_eq!((report.sent, report.failed, report.remaining), (0, 1, 1));
        let conn = pool.get().unwrap();
        let entry = &database::notifications::list_all(&conn).unwrap()[0];
        assert_eq!(entry.attempts, 1);
        assert!(entry.last_error.as_deref().unwrap_or_default().contains("500"));
    }
}
