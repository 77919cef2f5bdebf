use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};

use super::models::{NewPlayer, Player};

const PLAYER_COLUMNS: &str = "id, discord_id, username, mmr, wins, losses, win_streak, loss_streak, placement_matches_played, placement_matches_complete, season_id, created_at";

pub fn insert_player(conn: &Connection, player: &NewPlayer) -> Result<Player> {
    let sql = format!(
        "INSERT INTO players (discord_id, username, mmr, wins, losses, placement_matches_played, placement_matches_complete, season_id, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9) RETURNING {}",
        PLAYER_COLUMNS
    );

    conn.query_row(
        &sql,
        params![
            player.discord_id,
            player.username,
            player.mmr,
            player.wins,
            player.losses,
            player.placement_matches_played,
            player.placement_matches_complete,
            player.season_id,
            Utc::now()
        ],
        parse_player_row,
    )
    .context("Failed to insert new player")
}

fn parse_player_row(row: &rusqlite::Row) -> rusqlite::Result<Player> {
    Ok(Player {
        id: row.get(0)?,
        discord_id: row.get(1)?,
        username: row.get(2)?,
        mmr: row.get(3)?,
        wins: row.get(4)?,
        losses: row.get(5)?,
        win_streak: row.get(6)?,
        loss_streak: row.get(7)?,
        placement_matches_played: row.get(8)?,
        placement_matches_complete: row.get(9)?,
        season_id: row.get(10)?,
        created_at: row.get(11)?,
    })
}

pub fn find_by_id(conn: &Connection, id: i64) -> Result<Option<Player>> {
    let sql = format!("SELECT {} FROM players WHERE id = ?1", PLAYER_COLUMNS);

    conn.query_row(&sql, params![id], parse_player_row)
        .optional()
        .context("Failed to query player by id")
}

pub fn list_all(conn: &Connection) -> Result<Vec<Player>> {
    let sql = format!("SELECT {} FROM players ORDER BY id", PLAYER_COLUMNS);
    query_players(conn, &sql, [])
}

/// Leaderboard order: MMR, then wins, then registration order.
pub fn list_top(conn: &Connection, limit: usize) -> Result<Vec<Player>> {
    let sql = format!(
        "SELECT {} FROM players ORDER BY mmr DESC, wins DESC, id ASC LIMIT ?1",
        PLAYER_COLUMNS
    );
    query_players(conn, &sql, params![limit as i64])
}

/// Players eligible for end-of-season rewards: placements done and at least
/// one match played in `season_id`.
pub fn list_active(conn: &Connection, season_id: i64) -> Result<Vec<Player>> {
    let sql = format!(
        "SELECT {} FROM players WHERE season_id = ?1 AND placement_matches_complete = 1 AND wins + losses > 0 ORDER BY id",
        PLAYER_COLUMNS
    );
    query_players(conn, &sql, params![season_id])
}

pub fn count(conn: &Connection) -> Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM players", [], |r| r.get(0))
        .context("Failed to count players")
}

pub fn set_mmr(conn: &Connection, id: i64, mmr: i64) -> Result<()> {
    conn.execute("UPDATE players SET mmr = ?1 WHERE id = ?2", params![mmr, id])
        .context("Failed to update player MMR")?;
    Ok(())
}

/// Moves every player into `season_id` with a clean per-season record.
/// MMR is left alone; the caller applies the configured reset.
pub fn start_season(conn: &Connection, season_id: i64) -> Result<usize> {
    let sql = "UPDATE players SET season_id = ?1, wins = 0, losses = 0, win_streak = 0, loss_streak = 0, placement_matches_played = 0, placement_matches_complete = 0";

    conn.execute(sql, params![season_id])
        .context("Failed to move players into the new season")
}

/// Full wipe of player stats back to registration defaults.
pub fn reset_all(conn: &Connection, starting_mmr: i64) -> Result<usize> {
    let sql = "UPDATE players SET mmr = ?1, season_id = 1, wins = 0, losses = 0, win_streak = 0, loss_streak = 0, placement_matches_played = 0, placement_matches_complete = 0";

    conn.execute(sql, params![starting_mmr])
        .context("Failed to reset player stats")
}

fn query_players<P: rusqlite::Params>(conn: &Connection, sql: &str, params: P) -> Result<Vec<Player>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, parse_player_row)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("Failed to read players")?;

    Ok(rows)
}
