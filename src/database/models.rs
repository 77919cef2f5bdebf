use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone)]
pub struct SectionRow {
    pub name: String,
    pub body: String,
    pub version: i64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: i64,
    pub discord_id: String,
    pub username: String,
    pub mmr: i64,
    pub wins: i64,
    pub losses: i64,
    pub win_streak: i64,
    pub loss_streak: i64,
    pub placement_matches_played: i64,
    pub placement_matches_complete: bool,
    pub season_id: i64,
    pub created_at: DateTime<Utc>,
}

impl Player {
    pub fn matches_played(&self) -> i64 {
        self.wins + self.losses
    }

    pub fn win_rate(&self) -> f64 {
        match self.matches_played() {
            0 => 0.0,
            played => self.wins as f64 / played as f64,
        }
    }
}

/// Fields needed to register a player; match completion keeps the rest
/// current.
#[derive(Debug, Clone, Default)]
pub struct NewPlayer {
    pub discord_id: String,
    pub username: String,
    pub mmr: i64,
    pub wins: i64,
    pub losses: i64,
    pub placement_matches_played: i64,
    pub placement_matches_complete: bool,
    pub season_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRecord {
    pub id: i64,
    pub season_id: i64,
    pub status: String,
    pub team_one: Vec<i64>,
    pub team_two: Vec<i64>,
    pub winning_team: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeasonReward {
    pub season_id: i64,
    pub player_id: i64,
    pub tier_name: String,
    pub mmr: i64,
    pub awarded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntry {
    pub player_id: i64,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutboxStatus {
    Pending,
    Sent,
    Failed,
}

impl OutboxStatus {
    pub fn as_str(&self) -> &str {
        match self {
            OutboxStatus::Pending => "pending",
            OutboxStatus::Sent => "sent",
            OutboxStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboxEntry {
    pub id: i64,
    pub player_id: i64,
    pub season_id: i64,
    pub kind: String,
    pub message: String,
    pub status: String,
    pub attempts: i64,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminAction {
    pub idempotency_key: String,
    pub action: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}
