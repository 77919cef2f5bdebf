use axum::{
    Router, middleware,
    routing::{get, post},
};
use std::sync::Arc;

use crate::api::handlers::{
    AppState, admin, config, health,
    players::{get_player, get_top_players, resolve_rank},
    seasons,
};
use crate::auth::require_admin;

pub fn create_router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/api/config", get(config::get_config))
        .route("/api/config/:section", get(config::get_section).patch(config::patch_section))
        .route("/api/config/seasonManagement/rankTiers", post(config::add_rank_tier))
        .route("/api/config/seasonManagement/rewardTiers", post(config::add_reward_tier))
        .route("/api/admin/seasons/new", post(seasons::start_new_season))
        .route("/api/admin/seasons/distribute-rewards", post(seasons::distribute_rewards))
        .route("/api/admin/seasons/reset-data", post(seasons::reset_season_data))
        .route("/api/admin/notifications/dispatch", post(admin::dispatch_notifications))
        .route("/api/admin/export-database", get(admin::export_database))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state.authenticator),
            require_admin,
        ));

    Router::new()
        .route("/api/health", get(health))
        .route("/api/players/top", get(get_top_players))
        .route("/api/players/:id", get(get_player))
        .route("/api/ranks/resolve", get(resolve_rank))
        .merge(protected)
        .with_state(state)
}
