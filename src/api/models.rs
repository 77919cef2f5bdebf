use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::database::Player;
use crate::league::RankTier;
use crate::league::tiers::UNRANKED;

/// Rank badge shown next to a player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierBadge {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl TierBadge {
    pub fn from_tier(tier: Option<&RankTier>) -> Self {
        match tier {
            Some(tier) => Self {
                name: tier.name.clone(),
                color: Some(tier.color.clone()),
                icon: tier.icon.clone(),
            },
            None => Self {
                name: UNRANKED.to_string(),
                color: None,
                icon: None,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub player_id: i64,
    pub discord_id: String,
    pub username: String,
    pub mmr: i64,
    pub wins: i64,
    pub losses: i64,
    pub win_rate: f64,
    pub placement_complete: bool,
    pub tier: TierBadge,
}

impl LeaderboardEntry {
    pub fn new(rank: usize, player: Player, tier: TierBadge) -> Self {
        Self {
            rank,
            player_id: player.id,
            win_rate: player.win_rate(),
            discord_id: player.discord_id,
            username: player.username,
            mmr: player.mmr,
            wins: player.wins,
            losses: player.losses,
            placement_complete: player.placement_matches_complete,
            tier,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardResponse {
    pub season: u32,
    pub limit: usize,
    pub items: Vec<LeaderboardEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerDetail {
    pub player_id: i64,
    pub discord_id: String,
    pub username: String,
    pub mmr: i64,
    pub wins: i64,
    pub losses: i64,
    pub win_rate: f64,
    pub win_streak: i64,
    pub loss_streak: i64,
    pub placement_matches_played: i64,
    pub placement_matches_required: u32,
    pub placement_complete: bool,
    pub season_id: i64,
    pub tier: TierBadge,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankResolution {
    pub mmr: i64,
    pub tier: TierBadge,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub ok: bool,
    pub database: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResetRequest {
    #[serde(default)]
    pub confirmation: String,
}
