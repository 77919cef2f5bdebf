use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};

use super::models::MatchRecord;

const MATCH_COLUMNS: &str = "id, season_id, status, team_one, team_two, winning_team, created_at, ended_at";

pub fn insert_match(
    conn: &Connection,
    season_id: i64,
    status: &str,
    team_one: &[i64],
    team_two: &[i64],
    winning_team: Option<i64>,
    ended_at: Option<DateTime<Utc>>,
) -> Result<MatchRecord> {
    let sql = format!(
        "INSERT INTO matches (season_id, status, team_one, team_two, winning_team, created_at, ended_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) RETURNING {}",
        MATCH_COLUMNS
    );

    conn.query_row(
        &sql,
        params![
            season_id,
            status,
            serde_json::to_string(team_one)?,
            serde_json::to_string(team_two)?,
            winning_team,
            Utc::now(),
            ended_at
        ],
        parse_match_row,
    )
    .context("Failed to insert match")
}

/// Team columns hold JSON arrays of player ids.
fn parse_match_row(row: &rusqlite::Row) -> rusqlite::Result<MatchRecord> {
    let team_one: String = row.get(3)?;
    let team_two: String = row.get(4)?;

    Ok(MatchRecord {
        id: row.get(0)?,
        season_id: row.get(1)?,
        status: row.get(2)?,
        team_one: parse_team(3, &team_one)?,
        team_two: parse_team(4, &team_two)?,
        winning_team: row.get(5)?,
        created_at: row.get(6)?,
        ended_at: row.get(7)?,
    })
}

fn parse_team(column: usize, raw: &str) -> rusqlite::Result<Vec<i64>> {
    serde_json::from_str(raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e))
    })
}

pub fn list_all(conn: &Connection) -> Result<Vec<MatchRecord>> {
    let sql = format!("SELECT {} FROM matches ORDER BY id", MATCH_COLUMNS);

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], parse_match_row)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("Failed to list matches")?;

    Ok(rows)
}

pub fn count(conn: &Connection) -> Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM matches", [], |r| r.get(0))
        .context("Failed to count matches")
}

pub fn delete_all(conn: &Connection) -> Result<usize> {
    conn.execute("DELETE FROM matches", [])
        .context("Failed to delete match history")
}
