pub mod config;
pub mod export;
pub mod notifications;
pub mod season;
pub mod server;

use anyhow::Result;

use crate::config::settings::AppConfig;
use crate::database::{self, DbPool};

/// Opens the SQLite store and creates any missing tables.
pub fn open_store(settings: &AppConfig) -> Result<DbPool> {
    let pool = database::create_pool(&settings.storage.database_path)?;
    let conn = database::get_connection(&pool)?;
    database::setup::initialize_database(&conn)?;
    Ok(pool)
}
