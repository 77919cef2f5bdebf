use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};

use super::models::{OutboxEntry, OutboxStatus};

/// Deliveries tried before an entry stops being pending.
pub const MAX_DELIVERY_ATTEMPTS: i64 = 5;

const OUTBOX_COLUMNS: &str = "id, player_id, season_id, kind, message, status, attempts, last_error, created_at, sent_at";

pub fn enqueue(
    conn: &Connection,
    player_id: i64,
    season_id: i64,
    kind: &str,
    message: &str,
    now: DateTime<Utc>,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO notification_outbox (player_id, season_id, kind, message, status, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![player_id, season_id, kind, message, OutboxStatus::Pending.as_str(), now],
    )
    .context("Failed to queue notification")?;

    Ok(conn.last_insert_rowid())
}

fn parse_outbox_row(row: &rusqlite::Row) -> rusqlite::Result<OutboxEntry> {
    Ok(OutboxEntry {
        id: row.get(0)?,
        player_id: row.get(1)?,
        season_id: row.get(2)?,
        kind: row.get(3)?,
        message: row.get(4)?,
        status: row.get(5)?,
        attempts: row.get(6)?,
        last_error: row.get(7)?,
        created_at: row.get(8)?,
        sent_at: row.get(9)?,
    })
}

/// Pending notifications with the fewest attempts first, oldest first among
/// equals.
pub fn list_pending(conn: &Connection, limit: usize) -> Result<Vec<OutboxEntry>> {
    let sql = format!(
        "SELECT {} FROM notification_outbox WHERE status = ?1 ORDER BY attempts, id LIMIT ?2",
        OUTBOX_COLUMNS
    );
    query_outbox(conn, &sql, params![OutboxStatus::Pending.as_str(), limit as i64])
}

pub fn list_all(conn: &Connection) -> Result<Vec<OutboxEntry>> {
    let sql = format!("SELECT {} FROM notification_outbox ORDER BY id", OUTBOX_COLUMNS);
    query_outbox(conn, &sql, [])
}

pub fn count_pending(conn: &Connection) -> Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM notification_outbox WHERE status = ?1",
        params![OutboxStatus::Pending.as_str()],
        |r| r.get(0),
    )
    .context("Failed to count pending notifications")
}

pub fn mark_sent(conn: &Connection, id: i64, now: DateTime<Utc>) -> Result<()> {
    conn.execute(
        "UPDATE notification_outbox SET status = ?1, attempts = attempts + 1, last_error = NULL, sent_at = ?2 WHERE id = ?3",
        params![OutboxStatus::Sent.as_str(), now, id],
    )
    .context("Failed to mark notification sent")?;
    Ok(())
}

/// Leaves the entry pending so the next dispatch retries it, until it has
/// used up `MAX_DELIVERY_ATTEMPTS`.
pub fn mark_failed(conn: &Connection, id: i64, error: &str) -> Result<()> {
    conn.execute(
        "UPDATE notification_outbox
         SET attempts = attempts + 1,
             last_error = ?1,
             status = CASE WHEN attempts + 1 >= ?2 THEN ?3 ELSE status END
         WHERE id = ?4",
        params![error, MAX_DELIVERY_ATTEMPTS, OutboxStatus::Failed.as_str(), id],
    )
    .context("Failed to record notification failure")?;
    Ok(())
}

fn query_outbox<P: rusqlite::Params>(conn: &Connection, sql: &str, params: P) -> Result<Vec<OutboxEntry>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, parse_outbox_row)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("Failed to read notification outbox")?;

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::setup::initialize_database;

    #[test]
    fn test_outbox_lifecycle() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_database(&conn).unwrap();
        let now = Utc::now();

        let first = enqueue(&conn, 1, 3, "season_reward", "You earned Champion", now).unwrap();
        let second = enqueue(&conn, 2, 3, "season_reward", "You earned Participant", now).unwrap();

        mark_failed(&conn, first, "HTTP 500").unwrap();
        let pending = list_pending(&conn, 10).unwrap();
        assert_eq!(pending.iter().map(|e| e.id).collect::<Vec<_>>(), vec![second, first]);
        assert_eq!(pending[1].attempts, 1);
        assert_eq!(pending[1].last_error.as_deref(), Some("HTTP 500"));

        mark_sent(&conn, first, now).unwrap();
        let pending = list_pending(&conn, 10).unwrap();
        assert_eq!(pending.iter().map(|e| e.id).collect::<Vec<_>>(), vec![second]);
        assert_eq!(count_pending(&conn).unwrap(), 1);

        let all = list_all(&conn).unwrap();
        assert_eq!(all[0].status, "sent");
        assert_eq!(all[0].attempts, 2);
        assert!(all[0].last_error.is_none());
        assert!(all[0].sent_at.is_some());
    }

    #[test]
    fn test_failing_entries_do_not_block_newer_ones() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_database(&conn).unwrap();
        let now = Utc::now();

        let stuck = enqueue(&conn, 1, 2, "season_reward", "first", now).unwrap();
        let fresh = enqueue(&conn, 2, 2, "season_reward", "second", now).unwrap();
        mark_failed(&conn, stuck, "HTTP 404").unwrap();

        assert_eq!(list_pending(&conn, 1).unwrap()[0].id, fresh);

        for _ in 1..MAX_DELIVERY_ATTEMPTS {
            mark_failed(&conn, stuck, "HTTP 404").unwrap();
        }
        let all = list_all(&conn).unwrap();
        assert_eq!(all[0].status, "failed");
        assert_eq!(all[0].attempts, MAX_DELIVERY_ATTEMPTS);
        assert_eq!(list_pending(&conn, 10).unwrap().iter().map(|e| e.id).collect::<Vec<_>>(), vec![fresh]);
        assert_eq!(count_pending(&conn).unwrap(), 1);
    }
}
