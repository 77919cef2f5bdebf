use anyhow::Context;
use chrono::{DateTime, Utc};
use log::{info, warn};
use rusqlite::{Connection, TransactionBehavior};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use crate::database::{self, DbPool};
use crate::errors::LeagueError;
use crate::league::section::apply_patch;
use crate::league::tiers::{TierConflict, insert_tier};
use crate::league::{BotConfig, FieldError, RankTier, RewardTier, Section};

/// The configuration document together with the stored version of each
/// section.
#[derive(Debug, Clone)]
pub struct ConfigSnapshot {
    pub config: BotConfig,
    versions: HashMap<Section, i64>,
}

impl ConfigSnapshot {
    /// Version 0 means the section has never been stored.
    pub fn version(&self, section: Section) -> i64 {
        self.versions.get(&section).copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VersionedSection {
    pub section: Section,
    pub body: Value,
    pub version: i64,
}

/// Reads and edits the bot configuration. Reads are served from a cached
/// snapshot which every write drops.
pub struct ConfigService {
    pool: DbPool,
    cache: RwLock<Option<Arc<ConfigSnapshot>>>,
    /// Bumped by `invalidate`; a snapshot loaded under an older generation is
    /// never cached.
    generation: AtomicU64,
}

impl ConfigService {
    pub fn new(pool: DbPool) -> Self {
        Self {
            pool,
            cache: RwLock::new(None),
            generation: AtomicU64::new(0),
        }
    }

    /// Stores defaults for every section that has no row yet.
    pub fn initialize(&self) -> Result<(), LeagueError> {
        let conn = self.pool.get()?;
        let defaults = BotConfig::default();
        let now = Utc::now();

        for section in Section::ALL {
            let body = section_body(&defaults, section)?;
            if database::config::insert_section_if_missing(&conn, section.key(), &body, now)? {
                info!("Seeded default config section {}", section);
            }
        }

        self.invalidate();
        Ok(())
    }

    pub fn snapshot(&self) -> Result<Arc<ConfigSnapshot>, LeagueError> {
        if let Some(cached) = self.cache.read().unwrap_or_else(PoisonError::into_inner).as_ref() {
            return Ok(Arc::clone(cached));
        }

        let generation = self.generation.load(Ordering::Acquire);
        let snapshot = {
            let conn = self.pool.get()?;
            Arc::new(load_snapshot(&conn)?)
        };
        self.fill(generation, &snapshot);
        Ok(snapshot)
    }

    fn fill(&self, generation: u64, snapshot: &Arc<ConfigSnapshot>) {
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        if self.generation.load(Ordering::Acquire) == generation {
            *cache = Some(Arc::clone(snapshot));
        }
    }

    pub fn config(&self) -> Result<BotConfig, LeagueError> {
        Ok(self.snapshot()?.config.clone())
    }

    pub fn section(&self, section: Section) -> Result<VersionedSection, LeagueError> {
        let snapshot = self.snapshot()?;
        Ok(VersionedSection {
            section,
            body: snapshot.config.section_value(section).context("Failed to encode section")?,
            version: snapshot.version(section),
        })
    }

    /// Merges `patch` into one section and stores it when the merged section
    /// is valid. Nothing is written when any field fails.
    pub fn patch_section(
        &self,
        section: Section,
        patch: &Value,
        if_match: Option<i64>,
    ) -> Result<VersionedSection, LeagueError> {
        self.update_section(section, if_match, |config| Ok(apply_patch(config, section, patch)?))
    }

    pub fn add_rank_tier(&self, tier: RankTier, if_match: Option<i64>) -> Result<VersionedSection, LeagueError> {
        self.update_section(Section::SeasonManagement, if_match, |config| {
            let mut updated = config.clone();
            insert_tier(&mut updated.season_management.rank_tiers, tier)
                .map_err(|e| tier_conflict("seasonManagement.rankTiers", e))?;
            Ok(updated)
        })
    }

    pub fn add_reward_tier(&self, tier: RewardTier, if_match: Option<i64>) -> Result<VersionedSection, LeagueError> {
        self.update_section(Section::SeasonManagement, if_match, |config| {
            let mut updated = config.clone();
            insert_tier(&mut updated.season_management.reward_tiers, tier)
                .map_err(|e| tier_conflict("seasonManagement.rewardTiers", e))?;
            Ok(updated)
        })
    }

    pub fn invalidate(&self) {
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        self.generation.fetch_add(1, Ordering::AcqRel);
        *cache = None;
    }

    fn update_section<F>(&self, section: Section, if_match: Option<i64>, edit: F) -> Result<VersionedSection, LeagueError>
    where
        F: FnOnce(&BotConfig) -> Result<BotConfig, LeagueError>,
    {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let snapshot = load_snapshot(&tx)?;
        let current = snapshot.version(section);
        if let Some(expected) = if_match {
            if expected != current {
                return Err(LeagueError::VersionConflict {
                    section: section.key().to_string(),
                    expected,
                    actual: current,
                });
            }
        }

        let updated = edit(&snapshot.config)?;
        let errors = updated.check_section(section);
        if !errors.is_empty() {
            return Err(LeagueError::Validation(errors));
        }

        let version = write_section(&tx, &updated, section, current, Utc::now())?;
        tx.commit()?;
        self.invalidate();

        info!("Config section {} saved at version {}", section, version);
        Ok(VersionedSection {
            section,
            body: updated.section_value(section).context("Failed to encode section")?,
            version,
        })
    }
}

/// Builds the document from the stored rows. Sections without a row keep
/// their defaults.
pub fn load_snapshot(conn: &Connection) -> Result<ConfigSnapshot, LeagueError> {
    let mut config = BotConfig::default();
    let mut versions = HashMap::new();

    for row in database::config::list_sections(conn)? {
        let Ok(section) = row.name.parse::<Section>() else {
            warn!("Ignoring stored config row for unknown section {}", row.name);
            continue;
        };

        let value: Value = serde_json::from_str(&row.body)
            .with_context(|| format!("Stored config section {} is not valid JSON", row.name))?;
        config
            .replace_section(section, value)
            .with_context(|| format!("Stored config section {} does not match its schema", row.name))?;
        versions.insert(section, row.version);
    }

    config.normalize();
    Ok(ConfigSnapshot { config, versions })
}

/// Stores one section of `config` if it is still at `expected_version` and
/// returns the new version. Other section rows are not touched.
pub fn write_section(
    conn: &Connection,
    config: &BotConfig,
    section: Section,
    expected_version: i64,
    now: DateTime<Utc>,
) -> Result<i64, LeagueError> {
    let body = section_body(config, section)?;

    if expected_version == 0 {
        if database::config::insert_section_if_missing(conn, section.key(), &body, now)? {
            return Ok(1);
        }
    } else if let Some(version) =
        database::config::update_section(conn, section.key(), &body, expected_version, now)?
    {
        return Ok(version);
    }

    let actual = database::config::find_section(conn, section.key())?.map_or(0, |row| row.version);
    Err(LeagueError::VersionConflict {
        section: section.key().to_string(),
        expected: expected_version,
        actual,
    })
}

fn section_body(config: &BotConfig, section: Section) -> Result<String, LeagueError> {
    let value = config.section_value(section).context("Failed to encode section")?;
    Ok(serde_json::to_string(&value).context("Failed to encode section")?)
}

fn tier_conflict(field: &str, conflict: TierConflict) -> LeagueError {
    let code = match conflict {
        TierConflict::DuplicateName(_) => "duplicate_name",
        TierConflict::DuplicateThreshold(_) => "duplicate_threshold",
    };
    LeagueError::Validation(vec![FieldError::new(field, code, conflict.to_string())])
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::database::create_memory_pool;
    use crate::database::setup::initialize_database;

    fn service() -> ConfigService {
        let pool = create_memory_pool().unwrap();
        initialize_database(&pool.get().unwrap()).unwrap();
        let service = ConfigService::new(pool);
        service.initialize().unwrap();
        service
    }

    fn stored_bodies(service: &ConfigService) -> Vec<(String, String, i64)> {
        let conn = service.pool.get().unwrap();
        database::config::list_sections(&conn)
            .unwrap()
            .into_iter()
            .map(|row| (row.name, row.body, row.version))
            .collect()
    }

    #[test]
    fn test_initialize_seeds_every_section_once() {
        let service = service();
        let before = stored_bodies(&service);
        service.initialize().unwrap();

        assert_eq!(before.len(), 8);
        assert_eq!(stored_bodies(&service), before);
        assert_eq!(service.section(Section::MmrSystem).unwrap().version, 1);
    }

    #[test]
    fn test_invalid_patch_lists_fields_and_persists_nothing() {
        let service = service();
        let before = stored_bodies(&service);

        let err = service
            .patch_section(Section::MmrSystem, &json!({ "kFactor": 100, "winStreakBonus": 80 }), None)
            .unwrap_err();

        let LeagueError::Validation(fields) = err else {
            panic!("expected validation error, got {:?}", err);
        };
        let names: Vec<&str> = fields.iter().map(|f| f.field.as_str()).collect();
        assert_eq!(names, vec!["mmrSystem.kFactor", "mmrSystem.winStreakBonus"]);
        assert_eq!(stored_bodies(&service), before);
    }

    #[test]
    fn test_type_errors_are_reported_together() {
        let service = service();

        let err = service
            .patch_section(Section::General, &json!({ "botName": 7, "maintenanceMode": "yes" }), None)
            .unwrap_err();

        let LeagueError::Validation(fields) = err else {
            panic!("expected validation error, got {:?}", err);
        };
        assert_eq!(fields.len(), 2);
        assert!(fields.iter().all(|f| f.code == "type"));
    }

    #[test]
    fn test_valid_patch_touches_only_its_section() {
        let service = service();
        let before = stored_bodies(&service);

        let saved = service
            .patch_section(Section::MmrSystem, &json!({ "kFactor": 24 }), Some(1))
            .unwrap();

        assert_eq!(saved.version, 2);
        assert_eq!(saved.body["kFactor"], json!(24));
        assert_eq!(service.config().unwrap().mmr_system.k_factor, 24);

        let after = stored_bodies(&service);
        for (old, new) in before.iter().zip(after.iter()) {
            if old.0 == "mmrSystem" {
                assert_ne!(old.1, new.1);
            } else {
                assert_eq!(old, new);
            }
        }
    }

    #[test]
    fn test_snapshot_loaded_before_a_write_is_not_cached() {
        let service = service();
        let generation = service.generation.load(Ordering::Acquire);
        let stale = Arc::new(load_snapshot(&service.pool.get().unwrap()).unwrap());

        service.patch_section(Section::MmrSystem, &json!({ "kFactor": 40 }), None).unwrap();
        service.fill(generation, &stale);

        assert_eq!(service.config().unwrap().mmr_system.k_factor, 40);
        assert_eq!(service.section(Section::MmrSystem).unwrap().version, 2);
    }

    #[test]
    fn test_stale_version_is_rejected() {
        let service = service();
        service.patch_section(Section::General, &json!({ "botName": "League" }), Some(1)).unwrap();

        let err = service
            .patch_section(Section::General, &json!({ "botName": "Other" }), Some(1))
            .unwrap_err();

        assert!(matches!(err, LeagueError::VersionConflict { expected: 1, actual: 2, .. }));
        assert_eq!(service.config().unwrap().general.bot_name, "League");
    }

    #[test]
    fn test_add_rank_tier_keeps_order_and_rejects_duplicates() {
        let service = service();

        service.add_rank_tier(RankTier::new("Master", 2200, "#AA00FF"), None).unwrap();
        let tiers = service.config().unwrap().season_management.rank_tiers;
        assert_eq!(tiers.last().map(|t| t.name.as_str()), Some("Master"));

        let err = service.add_rank_tier(RankTier::new("Elite", 2200, "#FFFFFF"), None).unwrap_err();
        let LeagueError::Validation(fields) = err else {
            panic!("expected validation error");
        };
        assert_eq!(fields[0].code, "duplicate_threshold");
    }

    #[test]
    fn test_add_reward_tier() {
        let service = service();

        let saved = service
            .add_reward_tier(RewardTier::new("Veteran", 1000, "Finished above 1000"), None)
            .unwrap();

        let names: Vec<&str> = saved.body["rewardTiers"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["Participant", "Veteran", "Contender", "Champion"]);
    }
}
