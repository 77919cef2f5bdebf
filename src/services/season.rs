use chrono::{DateTime, Utc};
use log::{error, info};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::config::{ConfigService, load_snapshot, write_section};
use crate::archive::ArchiveStore;
use crate::database::{self, DbPool, MatchRecord, SeasonReward};
use crate::errors::LeagueError;
use crate::league::bot_config::MAX_SEASON;
use crate::league::season::{RESET_CONFIRMATION, carried_mmr, is_confirmed, season_window};
use crate::league::{BotConfig, FieldError, Section, resolve_tier};

pub const REWARD_NOTIFICATION: &str = "season_reward";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SeasonAction {
    StartNewSeason,
    DistributeRewards,
    ResetSeasonData,
}

impl SeasonAction {
    pub fn key(self) -> &'static str {
        match self {
            SeasonAction::StartNewSeason => "startNewSeason",
            SeasonAction::DistributeRewards => "distributeRewards",
            SeasonAction::ResetSeasonData => "resetSeasonData",
        }
    }
}

impl fmt::Display for SeasonAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardSummary {
    pub season: i64,
    pub awarded: usize,
    pub already_awarded: usize,
    pub unqualified: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeasonOutcome {
    pub action: SeasonAction,
    pub message: String,
    /// Set when an earlier call with the same idempotency key already did
    /// the work; nothing was changed by this call.
    pub replayed: bool,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub rewards: Option<RewardSummary>,
}

/// Everything a data reset removes, written out before it is deleted.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeasonArchive {
    pub season: i64,
    pub archived_at: DateTime<Utc>,
    pub matches: Vec<MatchRecord>,
    pub rewards: Vec<SeasonReward>,
}

/// Administrative season actions. Each runs in one immediate transaction
/// and records its idempotency key in that same transaction.
pub struct SeasonService {
    pool: DbPool,
    config: Arc<ConfigService>,
    archive_dir: PathBuf,
}

impl SeasonService {
    pub fn new(pool: DbPool, config: Arc<ConfigService>, archive_dir: impl AsRef<Path>) -> Self {
        Self {
            pool,
            config,
            archive_dir: archive_dir.as_ref().to_path_buf(),
        }
    }

    pub fn start_new_season(&self, now: DateTime<Utc>, key: Option<&str>) -> Result<SeasonOutcome, LeagueError> {
        let action = SeasonAction::StartNewSeason;
        let mut conn = self.pool.get()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        if let Some(outcome) = replay(&tx, action, key)? {
            return Ok(outcome);
        }

        let snapshot = load_snapshot(&tx)?;
        let mut config = snapshot.config.clone();
        let reset_type = config.season_management.mmr_reset_type;
        let retention = config.season_management.soft_reset_retention;
        if config.season_management.current_season >= MAX_SEASON {
            return Err(LeagueError::Validation(vec![FieldError::new(
                "seasonManagement.currentSeason",
                "range",
                format!("cannot advance past season {}", MAX_SEASON),
            )]));
        }

        let mut adjusted = 0;
        for player in database::players::list_all(&tx)? {
            let mmr = carried_mmr(player.mmr, reset_type, retention, &config.mmr_system);
            if mmr != player.mmr {
                database::players::set_mmr(&tx, player.id, mmr)?;
                adjusted += 1;
            }
        }

        let season = &mut config.season_management;
        season.current_season += 1;
        (season.season_start_date, season.season_end_date) = season_window(now);
        let number = season.current_season;

        let moved = database::players::start_season(&tx, i64::from(number))?;
        let version = snapshot.version(Section::SeasonManagement);
        write_section(&tx, &config, Section::SeasonManagement, version, now)?;

        let message = format!("Season {} started", number);
        finish(tx, action, key, &message, now)?;
        self.config.invalidate();

        info!(
            "{}: {} players moved, {} MMR values adjusted ({:?} reset)",
            message, moved, adjusted, reset_type
        );
        Ok(outcome(action, message, None))
    }

    /// Grants every active player of the current season the highest reward
    /// tier their MMR reaches and queues a notification for each new award.
    pub fn distribute_rewards(&self, now: DateTime<Utc>, key: Option<&str>) -> Result<SeasonOutcome, LeagueError> {
        let action = SeasonAction::DistributeRewards;
        let mut conn = self.pool.get()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        if let Some(outcome) = replay(&tx, action, key)? {
            return Ok(outcome);
        }

        let config = load_snapshot(&tx)?.config;
        let season = i64::from(config.season_management.current_season);
        let tiers = &config.season_management.reward_tiers;
        let mut summary = RewardSummary {
            season,
            ..RewardSummary::default()
        };

        for player in database::players::list_active(&tx, season)? {
            let Some(tier) = resolve_tier(player.mmr, tiers) else {
                summary.unqualified += 1;
                continue;
            };

            let reward = SeasonReward {
                season_id: season,
                player_id: player.id,
                tier_name: tier.name.clone(),
                mmr: player.mmr,
                awarded_at: now,
            };
            if !database::rewards::insert_reward(&tx, &reward)? {
                summary.already_awarded += 1;
                continue;
            }

            let text = format!(
                "Season {} is over! You finished at {} MMR and earned the {} reward.",
                season, player.mmr, tier.name
            );
            database::notifications::enqueue(&tx, player.id, season, REWARD_NOTIFICATION, &text, now)?;
            summary.awarded += 1;
        }

        let message = format!(
            "Season {} rewards distributed: {} awarded, {} already awarded, {} unqualified",
            season, summary.awarded, summary.already_awarded, summary.unqualified
        );
        finish(tx, action, key, &message, now)?;

        info!("{}", message);
        Ok(outcome(action, message, Some(summary)))
    }

    /// Wipes season data back to season 1. Requires the typed confirmation.
    ///
    /// When history archiving is on, matches and rewards are written to the
    /// archive directory first. A failure after that point is reported as a
    /// partial failure naming the archive, since the file already exists.
    pub fn reset_season_data(
        &self,
        confirmation: &str,
        now: DateTime<Utc>,
        key: Option<&str>,
    ) -> Result<SeasonOutcome, LeagueError> {
        if !is_confirmed(confirmation) {
            return Err(LeagueError::ConfirmationRequired {
                expected: RESET_CONFIRMATION,
            });
        }

        let action = SeasonAction::ResetSeasonData;
        let mut conn = self.pool.get()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        if let Some(outcome) = replay(&tx, action, key)? {
            return Ok(outcome);
        }

        let snapshot = load_snapshot(&tx)?;
        let archived = if snapshot.config.data_management.archive_match_history {
            let season = i64::from(snapshot.config.season_management.current_season);
            Some(self.archive(&tx, season, now)?)
        } else {
            None
        };

        let mut config = snapshot.config.clone();
        let version = snapshot.version(Section::SeasonManagement);
        let result = wipe(&tx, &mut config, version, now).and_then(|message| {
            finish(tx, action, key, &message, now)?;
            Ok(message)
        });

        let message = match (result, archived) {
            (Ok(message), _) => message,
            (Err(e), None) => return Err(e),
            (Err(e), Some(path)) => {
                error!("Season reset failed after archiving to {}: {}", path.display(), e);
                return Err(LeagueError::PartialFailure {
                    completed: format!("match history archived to {}", path.display()),
                    failed: "season data reset",
                    detail: e.to_string(),
                });
            }
        };
        self.config.invalidate();

        info!("{}", message);
        Ok(outcome(action, message, None))
    }

    fn archive(&self, conn: &Connection, season: i64, now: DateTime<Utc>) -> Result<PathBuf, LeagueError> {
        let archive = SeasonArchive {
            season,
            archived_at: now,
            matches: database::matches::list_all(conn)?,
            rewards: database::rewards::list_all(conn)?,
        };

        let key = format!("season-{}-{}", season, now.format("%Y%m%dT%H%M%S%.3fZ"));
        ArchiveStore::new(&self.archive_dir)
            .and_then(|store| store.save(&key, &archive))
            .map_err(|e| LeagueError::ExternalDependency {
                dependency: "archive storage",
                detail: format!("{:#}", e),
            })
    }
}

fn wipe(conn: &Connection, config: &mut BotConfig, version: i64, now: DateTime<Utc>) -> Result<String, LeagueError> {
    let matches = database::matches::delete_all(conn)?;
    database::rewards::delete_all(conn)?;
    database::queue::clear(conn)?;
    let players = database::players::reset_all(conn, config.mmr_system.starting_mmr)?;

    let season = &mut config.season_management;
    season.current_season = 1;
    (season.season_start_date, season.season_end_date) = season_window(now);
    write_section(conn, config, Section::SeasonManagement, version, now)?;

    Ok(format!(
        "Season data reset: {} matches removed, {} players reset, season 1 started",
        matches, players
    ))
}

/// Looks up a previous run under `key`. The same key for another action is
/// a client error.
fn replay(conn: &Connection, action: SeasonAction, key: Option<&str>) -> Result<Option<SeasonOutcome>, LeagueError> {
    let Some(key) = key else {
        return Ok(None);
    };

    match database::admin_actions::find(conn, key)? {
        None => Ok(None),
        Some(previous) if previous.action == action.key() => {
            info!("Replaying {} for idempotency key {}", action, key);
            Ok(Some(SeasonOutcome {
                action,
                message: previous.message,
                replayed: true,
                rewards: None,
            }))
        }
        Some(previous) => Err(LeagueError::IdempotencyConflict {
            key: key.to_string(),
            action: previous.action,
        }),
    }
}

fn finish(
    tx: Transaction<'_>,
    action: SeasonAction,
    key: Option<&str>,
    message: &str,
    now: DateTime<Utc>,
) -> Result<(), LeagueError> {
    if let Some(key) = key {
        database::admin_actions::record(&tx, key, action.key(), message, now)?;
    }
    tx.commit()?;
    Ok(())
}

fn outcome(action: SeasonAction, message: String, rewards: Option<RewardSummary>) -> SeasonOutcome {
    SeasonOutcome {
        action,
        message,
        replayed: false,
        rewards,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    use super::*;
    use crate::database::NewPlayer;
    use crate::database::setup::initialize_database;
    use crate::league::MmrResetType;

    struct Fixture {
        pool: DbPool,
        config: Arc<ConfigService>,
        seasons: SeasonService,
        archive_dir: PathBuf,
    }

    impl Drop for Fixture {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.archive_dir);
        }
    }

    fn fixture(name: &str) -> Fixture {
        let pool = database::create_memory_pool().unwrap();
        initialize_database(&pool.get().unwrap()).unwrap();
        let config = Arc::new(ConfigService::new(pool.clone()));
        config.initialize().unwrap();

        let archive_dir = std::env::temp_dir().join(format!("late_league_{}_{}", name, std::process::id()));
        let seasons = SeasonService::new(pool.clone(), Arc::clone(&config), &archive_dir);
        Fixture {
            pool,
            config,
            seasons,
            archive_dir,
        }
    }

    fn add_player(pool: &DbPool, discord_id: &str, mmr: i64, season_id: i64) -> i64 {
        let conn = pool.get().unwrap();
        database::players::insert_player(
            &conn,
            &NewPlayer {
                discord_id: discord_id.to_string(),
                username: format!("player-{}", discord_id),
                mmr,
                wins: 6,
                losses: 4,
                placement_matches_played: 5,
                placement_matches_complete: true,
                season_id,
            },
        )
        .unwrap()
        .id
    }

    fn set_season(config: &ConfigService, season: u32) {
        config
            .patch_section(Section::SeasonManagement, &json!({ "currentSeason": season }), None)
            .unwrap();
    }

    #[test]
    fn test_new_season_advances_and_spans_three_months() {
        let f = fixture("new_season");
        set_season(&f.config, 3);
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();

        let outcome = f.seasons.start_new_season(now, None).unwrap();

        assert_eq!(outcome.message, "Season 4 started");
        let season = f.config.config().unwrap().season_management;
        assert_eq!(season.current_season, 4);
        assert_eq!(season.season_start_date, now);
        let days = (season.season_end_date - season.season_start_date).num_days();
        assert!((89..=92).contains(&days), "{} days", days);
    }

    #[test]
    fn test_new_season_stops_at_last_season() {
        let f = fixture("last_season");
        let id = add_player(&f.pool, "1", 1800, 1);
        set_season(&f.config, MAX_SEASON);

        let err = f.seasons.start_new_season(Utc::now(), Some("past-the-end")).unwrap_err();

        assert!(matches!(err, LeagueError::Validation(_)));
        assert_eq!(f.config.config().unwrap().season_management.current_season, MAX_SEASON);
        let conn = f.pool.get().unwrap();
        assert_eq!(database::players::find_by_id(&conn, id).unwrap().unwrap().mmr, 1800);
        assert!(database::admin_actions::find(&conn, "past-the-end").unwrap().is_none());
    }

    #[test]
    fn test_new_season_soft_resets_and_clears_records() {
        let f = fixture("soft_reset");
        let strong = add_player(&f.pool, "1", 1800, 1);
        let weak = add_player(&f.pool, "2", 700, 1);

        f.seasons.start_new_season(Utc::now(), None).unwrap();

        let conn = f.pool.get().unwrap();
        let strong = database::players::find_by_id(&conn, strong).unwrap().unwrap();
        let weak = database::players::find_by_id(&conn, weak).unwrap().unwrap();
        assert_eq!(strong.mmr, 1400);
        assert_eq!(weak.mmr, 850);
        assert_eq!(strong.season_id, 2);
        assert_eq!(strong.matches_played(), 0);
        assert!(!strong.placement_matches_complete);
    }

    #[test]
    fn test_new_season_without_reset_keeps_mmr() {
        let f = fixture("no_reset");
        f.config
            .patch_section(Section::SeasonManagement, &json!({ "mmrResetType": "none" }), None)
            .unwrap();
        let id = add_player(&f.pool, "1", 2100, 1);

        f.seasons.start_new_season(Utc::now(), None).unwrap();

        let conn = f.pool.get().unwrap();
        assert_eq!(database::players::find_by_id(&conn, id).unwrap().unwrap().mmr, 2100);
        assert_eq!(f.config.config().unwrap().season_management.mmr_reset_type, MmrResetType::None);
    }

    #[test]
    fn test_idempotency_key_replays_without_side_effects() {
        let f = fixture("replay");

        let first = f.seasons.start_new_season(Utc::now(), Some("k-1")).unwrap();
        let second = f.seasons.start_new_season(Utc::now(), Some("k-1")).unwrap();

        assert!(!first.replayed);
        assert!(second.replayed);
        assert_eq!(second.message, first.message);
        assert_eq!(f.config.config().unwrap().season_management.current_season, 2);

        let err = f.seasons.distribute_rewards(Utc::now(), Some("k-1")).unwrap_err();
        assert!(matches!(err, LeagueError::IdempotencyConflict { ref action, .. } if action == "startNewSeason"));
    }

    #[test]
    fn test_rewards_are_granted_once() {
        let f = fixture("rewards");
        let champion = add_player(&f.pool, "1", 2000, 1);
        add_player(&f.pool, "2", 1350, 1);
        add_player(&f.pool, "3", 1500, 7);

        let first = f.seasons.distribute_rewards(Utc::now(), None).unwrap();
        let second = f.seasons.distribute_rewards(Utc::now(), None).unwrap();

        assert_eq!(
            first.rewards,
            Some(RewardSummary {
                season: 1,
                awarded: 2,
                already_awarded: 0,
                unqualified: 0
            })
        );
        assert_eq!(second.rewards.map(|r| r.already_awarded), Some(2));

        let conn = f.pool.get().unwrap();
        let rewards = database::rewards::list_for_season(&conn, 1).unwrap();
        assert_eq!(rewards.len(), 2);
        assert_eq!(rewards[0].player_id, champion);
        assert_eq!(rewards[0].tier_name, "Champion");
        assert_eq!(rewards[1].tier_name, "Contender");

        let outbox = database::notifications::list_all(&conn).unwrap();
        assert_eq!(outbox.len(), 2);
        assert!(outbox[0].message.contains("Champion"));
    }

    #[test]
    fn test_players_below_every_reward_tier_are_unqualified() {
        let f = fixture("unqualified");
        f.config
            .patch_section(
                Section::SeasonManagement,
                &json!({ "rewardTiers": [{ "name": "Elite", "mmrThreshold": 1500, "description": "" }] }),
                None,
            )
            .unwrap();
        add_player(&f.pool, "1", 1200, 1);

        let outcome = f.seasons.distribute_rewards(Utc::now(), None).unwrap();

        assert_eq!(outcome.rewards.map(|r| (r.awarded, r.unqualified)), Some((0, 1)));
    }

    #[test]
    fn test_reset_requires_confirmation() {
        let f = fixture("confirm");
        set_season(&f.config, 5);

        let err = f.seasons.reset_season_data("reset", Utc::now(), None).unwrap_err();

        assert!(matches!(err, LeagueError::ConfirmationRequired { expected: "RESET" }));
        assert_eq!(f.config.config().unwrap().season_management.current_season, 5);
    }

    #[test]
    fn test_reset_twice_ends_in_season_one() {
        let f = fixture("reset_twice");
        set_season(&f.config, 6);
        let id = add_player(&f.pool, "1", 1900, 6);
        {
            let conn = f.pool.get().unwrap();
            database::matches::insert_match(&conn, 6, "completed", &[id], &[], Some(1), None).unwrap();
            database::queue::enqueue(&conn, id).unwrap();
        }

        let now = Utc::now();
        f.seasons.reset_season_data("RESET", now, None).unwrap();
        assert_eq!(f.config.config().unwrap().season_management.current_season, 1);
        f.seasons.reset_season_data("RESET", now + Duration::seconds(1), None).unwrap();
        assert_eq!(f.config.config().unwrap().season_management.current_season, 1);

        let conn = f.pool.get().unwrap();
        let player = database::players::find_by_id(&conn, id).unwrap().unwrap();
        assert_eq!(player.mmr, 1000);
        assert_eq!(player.season_id, 1);
        assert_eq!(database::matches::count(&conn).unwrap(), 0);
        assert!(database::queue::list(&conn).unwrap().is_empty());

        let store = ArchiveStore::new(&f.archive_dir).unwrap();
        let keys = store.list().unwrap();
        assert_eq!(keys.len(), 2);
        let first = keys.iter().find(|k| k.starts_with("season-6-")).unwrap();
        let archive: SeasonArchive = store.load(first).unwrap().unwrap();
        assert_eq!(archive.season, 6);
        assert_eq!(archive.matches.len(), 1);
    }

    #[test]
    fn test_failure_after_archive_is_partial() {
        let f = fixture("partial");
        set_season(&f.config, 4);
        f.pool.get().unwrap().execute_batch("DROP TABLE queue_entries").unwrap();

        let err = f.seasons.reset_season_data("RESET", Utc::now(), None).unwrap_err();

        let LeagueError::PartialFailure { completed, failed, .. } = err else {
            panic!("expected partial failure, got {:?}", err);
        };
        assert!(completed.starts_with("match history archived"));
        assert_eq!(failed, "season data reset");
        assert_eq!(f.config.config().unwrap().season_management.current_season, 4);
        assert_eq!(ArchiveStore::new(&f.archive_dir).unwrap().list().unwrap().len(), 1);
    }

    #[test]
    fn test_failure_without_archive_is_plain() {
        let f = fixture("plain");
        f.config
            .patch_section(Section::DataManagement, &json!({ "archiveMatchHistory": false }), None)
            .unwrap();
        set_season(&f.config, 2);
        f.pool.get().unwrap().execute_batch("DROP TABLE queue_entries").unwrap();

        let err = f.seasons.reset_season_data("RESET", Utc::now(), None).unwrap_err();

        assert!(matches!(err, LeagueError::Internal(_)));
        assert_eq!(f.config.config().unwrap().season_management.current_season, 2);
    }
}
