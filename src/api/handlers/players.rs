use axum::Json;
use axum::extract::{Path, Query, State};
use serde::Deserialize;
use std::sync::Arc;

use super::AppState;
use crate::api::models::{LeaderboardEntry, LeaderboardResponse, PlayerDetail, RankResolution, TierBadge};
use crate::config::settings::LeaderboardSettings;
use crate::database;
use crate::errors::LeagueError;
use crate::league::resolve_tier;

#[derive(Debug, Deserialize)]
pub struct TopParams {
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ResolveParams {
    pub mmr: i64,
}

pub async fn get_top_players(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TopParams>,
) -> Result<Json<LeaderboardResponse>, LeagueError> {
    let limit = clamp_limit(params.limit, &state.settings.leaderboard);
    let season = state.config.snapshot()?.config.season_management.clone();

    let conn = state.pool.get()?;
    let items = database::players::list_top(&conn, limit)?
        .into_iter()
        .enumerate()
        .map(|(i, player)| {
            let tier = TierBadge::from_tier(resolve_tier(player.mmr, &season.rank_tiers));
            LeaderboardEntry::new(i + 1, player, tier)
        })
        .collect();

    Ok(Json(LeaderboardResponse {
        season: season.current_season,
        limit,
        items,
    }))
}

pub async fn get_player(
    State(state): State<Arc<AppState>>,
    Path(player_id): Path<i64>,
) -> Result<Json<PlayerDetail>, LeagueError> {
    let season = state.config.snapshot()?.config.season_management.clone();

    let conn = state.pool.get()?;
    let player = database::players::find_by_id(&conn, player_id)?
        .ok_or_else(|| LeagueError::not_found("player", player_id))?;

    Ok(Json(PlayerDetail {
        player_id: player.id,
        tier: TierBadge::from_tier(resolve_tier(player.mmr, &season.rank_tiers)),
        win_rate: player.win_rate(),
        discord_id: player.discord_id,
        username: player.username,
        mmr: player.mmr,
        wins: player.wins,
        losses: player.losses,
        win_streak: player.win_streak,
        loss_streak: player.loss_streak,
        placement_matches_played: player.placement_matches_played,
        placement_matches_required: season.placement_match_requirements,
        placement_complete: player.placement_matches_complete,
        season_id: player.season_id,
        created_at: player.created_at,
    }))
}

pub async fn resolve_rank(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ResolveParams>,
) -> Result<Json<RankResolution>, LeagueError> {
    let snapshot = state.config.snapshot()?;
    let tier = resolve_tier(params.mmr, &snapshot.config.season_management.rank_tiers);

    Ok(Json(RankResolution {
        mmr: params.mmr,
        tier: TierBadge::from_tier(tier),
    }))
}

/// Missing limits use the default; anything else is clamped into range.
fn clamp_limit(requested: Option<i64>, settings: &LeaderboardSettings) -> usize {
    let max = settings.max_limit.max(1) as i64;
    requested.unwrap_or(settings.default_limit as i64).clamp(1, max) as usize
}
