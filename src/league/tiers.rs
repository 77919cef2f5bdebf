use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use super::validation::{FieldError, Schema};

static HEX_COLOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#(?:[0-9A-Fa-f]{3}|[0-9A-Fa-f]{6})$").expect("valid hex color pattern"));

static ICON_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_\-]+(?:/[A-Za-z0-9_\-.]+)*\.(?:png|jpe?g|gif|webp|svg)$")
        .expect("valid icon path pattern")
});

/// Label shown for a player whose MMR is below every configured tier.
pub const UNRANKED: &str = "Unranked";

/// A named MMR band. Rank tiers and reward tiers share the resolution rule
/// but are kept as distinct lists.
pub trait Tier {
    fn name(&self) -> &str;
    fn threshold(&self) -> i64;
}

/// Display rank used by the leaderboard and profiles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RankTier {
    #[validate(length(min = 1, max = 32))]
    pub name: String,
    #[validate(range(min = 0))]
    pub mmr_threshold: i64,
    #[validate(custom(function = "validate_hex_color"))]
    pub color: String,
    #[serde(default)]
    #[validate(length(max = 200))]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl RankTier {
    pub fn new(name: &str, mmr_threshold: i64, color: &str) -> Self {
        Self {
            name: name.to_string(),
            mmr_threshold,
            color: color.to_string(),
            description: String::new(),
            icon: None,
        }
    }
}

impl Tier for RankTier {
    fn name(&self) -> &str {
        &self.name
    }

    fn threshold(&self) -> i64 {
        self.mmr_threshold
    }
}

impl Schema for RankTier {
    fn extra_checks(&self) -> Vec<FieldError> {
        match &self.icon {
            Some(icon) if !is_valid_icon_path(icon) => vec![FieldError::new(
                "icon",
                "icon_path",
                "must be a relative image path such as ranks/gold.png",
            )],
            _ => Vec::new(),
        }
    }
}

/// Season-end reward band.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RewardTier {
    #[validate(length(min = 1, max = 32))]
    pub name: String,
    #[validate(range(min = 0))]
    pub mmr_threshold: i64,
    #[serde(default)]
    #[validate(length(max = 200))]
    pub description: String,
}

impl RewardTier {
    pub fn new(name: &str, mmr_threshold: i64, description: &str) -> Self {
        Self {
            name: name.to_string(),
            mmr_threshold,
            description: description.to_string(),
        }
    }
}

impl Tier for RewardTier {
    fn name(&self) -> &str {
        &self.name
    }

    fn threshold(&self) -> i64 {
        self.mmr_threshold
    }
}

impl Schema for RewardTier {}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TierConflict {
    #[error("a tier named `{0}` already exists")]
    DuplicateName(String),
    #[error("a tier with threshold {0} already exists")]
    DuplicateThreshold(i64),
}

/// Returns the tier with the largest threshold that is `<= mmr`, or `None`
/// when the player is below every tier.
///
/// The list does not need to be sorted. Equal thresholds resolve to the tier
/// that comes later in input order; stored lists never contain them.
pub fn resolve_tier<T: Tier>(mmr: i64, tiers: &[T]) -> Option<&T> {
    let mut ordered: Vec<&T> = tiers.iter().collect();
    ordered.sort_by_key(|tier| tier.threshold());

    ordered
        .into_iter()
        .take_while(|tier| tier.threshold() <= mmr)
        .last()
}

/// Display name for `mmr`, falling back to [`UNRANKED`].
pub fn tier_name<T: Tier>(mmr: i64, tiers: &[T]) -> &str {
    resolve_tier(mmr, tiers).map_or(UNRANKED, |tier| tier.name())
}

pub fn sort_tiers<T: Tier>(tiers: &mut [T]) {
    tiers.sort_by_key(|tier| tier.threshold());
}

/// Adds a tier and keeps the list ordered by threshold.
pub fn insert_tier<T: Tier>(tiers: &mut Vec<T>, tier: T) -> Result<(), TierConflict> {
    if tiers.iter().any(|t| t.name().eq_ignore_ascii_case(tier.name())) {
        return Err(TierConflict::DuplicateName(tier.name().to_string()));
    }
    if tiers.iter().any(|t| t.threshold() == tier.threshold()) {
        return Err(TierConflict::DuplicateThreshold(tier.threshold()));
    }

    tiers.push(tier);
    sort_tiers(tiers);
    Ok(())
}

/// Validates every entry of a tier list plus the list-level uniqueness rules.
/// Errors are addressed as `field[index].member`.
pub fn check_tier_list<T: Tier + Schema>(field: &str, tiers: &[T]) -> Vec<FieldError> {
    let mut errors = Vec::new();
    let mut names: HashMap<String, usize> = HashMap::new();
    let mut thresholds: HashMap<i64, usize> = HashMap::new();

    for (index, tier) in tiers.iter().enumerate() {
        let entry = format!("{}[{}]", field, index);
        errors.extend(tier.check().into_iter().map(|e| e.prefixed(&entry)));

        if let Some(first) = names.insert(tier.name().to_lowercase(), index) {
            errors.push(FieldError::new(
                format!("{}.name", entry),
                "duplicate",
                format!("duplicates the name of {}[{}]", field, first),
            ));
        }
        if let Some(first) = thresholds.insert(tier.threshold(), index) {
            errors.push(FieldError::new(
                format!("{}.mmrThreshold", entry),
                "duplicate",
                format!("duplicates the threshold of {}[{}]", field, first),
            ));
        }
    }

    errors
}

fn validate_hex_color(color: &str) -> Result<(), ValidationError> {
    if HEX_COLOR.is_match(color) {
        Ok(())
    } else {
        let mut error = ValidationError::new("hex_color");
        error.message = Some("must be a hex color such as #C0C0C0".into());
        Err(error)
    }
}

fn is_valid_icon_path(path: &str) -> bool {
    ICON_PATH.is_match(path) && !path.split('/').any(|segment| segment == "..")
}

pub fn default_rank_tiers() -> Vec<RankTier> {
    vec![
        RankTier {
            name: "Bronze".to_string(),
            mmr_threshold: 0,
            color: "#CD7F32".to_string(),
            description: "Starting tier".to_string(),
            icon: Some("ranks/bronze.png".to_string()),
        },
        RankTier {
            name: "Silver".to_string(),
            mmr_threshold: 1000,
            color: "#C0C0C0".to_string(),
            description: String::new(),
            icon: Some("ranks/silver.png".to_string()),
        },
        RankTier {
            name: "Gold".to_string(),
            mmr_threshold: 1300,
            color: "#FFD700".to_string(),
            description: String::new(),
            icon: Some("ranks/gold.png".to_string()),
        },
        RankTier {
            name: "Platinum".to_string(),
            mmr_threshold: 1600,
            color: "#3FD6C8".to_string(),
            description: String::new(),
            icon: Some("ranks/platinum.png".to_string()),
        },
        RankTier {
            name: "Diamond".to_string(),
            mmr_threshold: 1900,
            color: "#4A7BFF".to_string(),
            description: String::new(),
            icon: Some("ranks/diamond.png".to_string()),
        },
    ]
}

pub fn default_reward_tiers() -> Vec<RewardTier> {
    vec![
        RewardTier::new("Participant", 0, "Played a full season"),
        RewardTier::new("Contender", 1300, "Finished the season Gold or above"),
        RewardTier::new("Champion", 1900, "Finished the season Diamond or above"),
    ]
}
