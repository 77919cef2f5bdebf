use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{Connection, params};

use super::models::QueueEntry;

/// Adds a player to the matchmaking queue. Returns false if already queued.
pub fn enqueue(conn: &Connection, player_id: i64) -> Result<bool> {
    let inserted = conn
        .execute(
            "INSERT OR IGNORE INTO queue_entries (player_id, joined_at) VALUES (?1, ?2)",
            params![player_id, Utc::now()],
        )
        .context("Failed to add player to queue")?;
    Ok(inserted == 1)
}

pub fn list(conn: &Connection) -> Result<Vec<QueueEntry>> {
    let mut stmt = conn.prepare("SELECT player_id, joined_at FROM queue_entries ORDER BY joined_at, player_id")?;
    let rows = stmt
        .query_map([], |row| {
            Ok(QueueEntry {
                player_id: row.get(0)?,
                joined_at: row.get(1)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("Failed to read queue")?;

    Ok(rows)
}

pub fn clear(conn: &Connection) -> Result<usize> {
    conn.execute("DELETE FROM queue_entries", [])
        .context("Failed to clear queue")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::NewPlayer;
    use crate::database::players::insert_player;
    use crate::database::setup::initialize_database;

    #[test]
    fn test_enqueue_once() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_database(&conn).unwrap();
        let player = insert_player(
            &conn,
            &NewPlayer {
                discord_id: "42".to_string(),
                username: "queued".to_string(),
                mmr: 1000,
                season_id: 1,
                ..Default::default()
            },
        )
        .unwrap();

        assert!(enqueue(&conn, player.id).unwrap());
        assert!(!enqueue(&conn, player.id).unwrap());
        assert_eq!(list(&conn).unwrap().len(), 1);

        assert_eq!(clear(&conn).unwrap(), 1);
        assert!(list(&conn).unwrap().is_empty());
    }
}
