use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct StorageSettings {
    pub database_path: String,
    pub archive_dir: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            database_path: "late_league.db".to_string(),
            archive_dir: PathBuf::from("archive"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExportSettings {
    /// Postgres connection string handed to `pg_dump`. Without it exports
    /// fall back to a JSON snapshot of the SQLite store.
    pub database_url: Option<String>,
    pub pg_dump_program: String,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            database_url: None,
            pg_dump_program: "pg_dump".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WebhookSettings {
    pub rate_limit_ms: u64,
    pub user_agent: &'static str,
    pub timeout_secs: u64,
}

impl Default for WebhookSettings {
    fn default() -> Self {
        Self {
            rate_limit_ms: 250, // Discord allows ~5 webhook posts per second
            user_agent: "LateLeagueBot/1.0",
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LeaderboardSettings {
    pub default_limit: usize,
    pub max_limit: usize,
}

impl Default for LeaderboardSettings {
    fn default() -> Self {
        Self {
            default_limit: 10,
            max_limit: 100,
        }
    }
}

/// Process-level settings. The editable bot configuration lives in the
/// database, not here.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub storage: StorageSettings,
    pub export: ExportSettings,
    pub webhook: WebhookSettings,
    pub leaderboard: LeaderboardSettings,
}

impl AppConfig {
    /// Defaults overridden by environment variables.
    pub fn new() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(path) = lookup("DATABASE_PATH") {
            config.storage.database_path = path;
        }
        if let Some(dir) = lookup("ARCHIVE_DIR") {
            config.storage.archive_dir = PathBuf::from(dir);
        }
        config.export.database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());
        if let Some(program) = lookup("PG_DUMP_PATH") {
            config.export.pg_dump_program = program;
        }
        if let Some(secs) = lookup("WEBHOOK_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            config.webhook.timeout_secs = secs;
        }
        if let Some(ms) = lookup("WEBHOOK_RATE_LIMIT_MS").and_then(|v| v.parse().ok()) {
            config.webhook.rate_limit_ms = ms;
        }

        config
    }
}
