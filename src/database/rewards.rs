use anyhow::{Context, Result};
use rusqlite::{Connection, params};

use super::models::SeasonReward;

const REWARD_COLUMNS: &str = "season_id, player_id, tier_name, mmr, awarded_at";

/// Records a reward. A player can hold one reward per season; returns false
/// when the reward was already granted.
pub fn insert_reward(conn: &Connection, reward: &SeasonReward) -> Result<bool> {
    let sql = "INSERT OR IGNORE INTO season_rewards (season_id, player_id, tier_name, mmr, awarded_at) VALUES (?1, ?2, ?3, ?4, ?5)";

    let inserted = conn
        .execute(
            sql,
            params![
                reward.season_id,
                reward.player_id,
                reward.tier_name,
                reward.mmr,
                reward.awarded_at
            ],
        )
        .context("Failed to record season reward")?;
    Ok(inserted == 1)
}

fn parse_reward_row(row: &rusqlite::Row) -> rusqlite::Result<SeasonReward> {
    Ok(SeasonReward {
        season_id: row.get(0)?,
        player_id: row.get(1)?,
        tier_name: row.get(2)?,
        mmr: row.get(3)?,
        awarded_at: row.get(4)?,
    })
}

pub fn list_for_season(conn: &Connection, season_id: i64) -> Result<Vec<SeasonReward>> {
    let sql = format!(
        "SELECT {} FROM season_rewards WHERE season_id = ?1 ORDER BY player_id",
        REWARD_COLUMNS
    );
    query_rewards(conn, &sql, params![season_id])
}

pub fn list_all(conn: &Connection) -> Result<Vec<SeasonReward>> {
    let sql = format!("SELECT {} FROM season_rewards ORDER BY season_id, player_id", REWARD_COLUMNS);
    query_rewards(conn, &sql, [])
}

pub fn delete_all(conn: &Connection) -> Result<usize> {
    conn.execute("DELETE FROM season_rewards", [])
        .context("Failed to delete season rewards")
}

fn query_rewards<P: rusqlite::Params>(conn: &Connection, sql: &str, params: P) -> Result<Vec<SeasonReward>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, parse_reward_row)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("Failed to read season rewards")?;

    Ok(rows)
}
