use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};

use super::models::AdminAction;

pub fn find(conn: &Connection, idempotency_key: &str) -> Result<Option<AdminAction>> {
    conn.query_row(
        "SELECT idempotency_key, action, message, created_at FROM admin_actions WHERE idempotency_key = ?1",
        params![idempotency_key],
        parse_action_row,
    )
    .optional()
    .context("Failed to query admin action")
}

pub fn record(
    conn: &Connection,
    idempotency_key: &str,
    action: &str,
    message: &str,
    now: DateTime<Utc>,
) -> Result<()> {
    conn.execute(
        "INSERT INTO admin_actions (idempotency_key, action, message, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![idempotency_key, action, message, now],
    )
    .context("Failed to record admin action")?;
    Ok(())
}

pub fn list_all(conn: &Connection) -> Result<Vec<AdminAction>> {
    let mut stmt = conn.prepare(
        "SELECT idempotency_key, action, message, created_at FROM admin_actions ORDER BY created_at, idempotency_key",
    )?;
    let rows = stmt
        .query_map([], parse_action_row)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("Failed to list admin actions")?;

    Ok(rows)
}

fn parse_action_row(row: &rusqlite::Row) -> rusqlite::Result<AdminAction> {
    Ok(AdminAction {
        idempotency_key: row.get(0)?,
        action: row.get(1)?,
        message: row.get(2)?,
        created_at: row.get(3)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::setup::initialize_database;

    #[test]
    fn test_record_and_find() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_database(&conn).unwrap();

        record(&conn, "abc", "startNewSeason", "Season 4 started", Utc::now()).unwrap();

        let found = find(&conn, "abc").unwrap().unwrap();
        assert_eq!(found.action, "startNewSeason");
        assert!(find(&conn, "other").unwrap().is_none());
        assert!(record(&conn, "abc", "resetSeasonData", "again", Utc::now()).is_err());
        assert_eq!(list_all(&conn).unwrap().len(), 1);
    }
}
