use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use super::season::season_window;
use super::section::Section;
use super::tiers::{self, RankTier, RewardTier, check_tier_list, sort_tiers};
use super::validation::{FieldError, Schema};

/// The whole bot configuration document. Each section validates on its own
/// and is stored in its own row.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BotConfig {
    pub general: GeneralSettings,
    pub matchmaking: MatchmakingSettings,
    pub mmr_system: MmrSystemSettings,
    pub season_management: SeasonConfig,
    pub match_rules: MatchRulesSettings,
    pub notifications: NotificationSettings,
    pub integrations: IntegrationSettings,
    pub data_management: DataManagementSettings,
}

impl BotConfig {
    pub fn section_value(&self, section: Section) -> serde_json::Result<Value> {
        match section {
            Section::General => serde_json::to_value(&self.general),
            Section::Matchmaking => serde_json::to_value(&self.matchmaking),
            Section::MmrSystem => serde_json::to_value(&self.mmr_system),
            Section::SeasonManagement => serde_json::to_value(&self.season_management),
            Section::MatchRules => serde_json::to_value(&self.match_rules),
            Section::Notifications => serde_json::to_value(&self.notifications),
            Section::Integrations => serde_json::to_value(&self.integrations),
            Section::DataManagement => serde_json::to_value(&self.data_management),
        }
    }

    /// Replaces one section from its JSON form. Other sections are untouched.
    pub fn replace_section(&mut self, section: Section, value: Value) -> serde_json::Result<()> {
        match section {
            Section::General => self.general = serde_json::from_value(value)?,
            Section::Matchmaking => self.matchmaking = serde_json::from_value(value)?,
            Section::MmrSystem => self.mmr_system = serde_json::from_value(value)?,
            Section::SeasonManagement => self.season_management = serde_json::from_value(value)?,
            Section::MatchRules => self.match_rules = serde_json::from_value(value)?,
            Section::Notifications => self.notifications = serde_json::from_value(value)?,
            Section::Integrations => self.integrations = serde_json::from_value(value)?,
            Section::DataManagement => self.data_management = serde_json::from_value(value)?,
        }
        Ok(())
    }

    /// Errors for one section, prefixed with the section key.
    pub fn check_section(&self, section: Section) -> Vec<FieldError> {
        let errors = match section {
            Section::General => self.general.check(),
            Section::Matchmaking => self.matchmaking.check(),
            Section::MmrSystem => self.mmr_system.check(),
            Section::SeasonManagement => self.season_management.check(),
            Section::MatchRules => self.match_rules.check(),
            Section::Notifications => self.notifications.check(),
            Section::Integrations => self.integrations.check(),
            Section::DataManagement => self.data_management.check(),
        };
        errors.into_iter().map(|e| e.prefixed(section.key())).collect()
    }

    pub fn check(&self) -> Vec<FieldError> {
        Section::ALL
            .iter()
            .flat_map(|section| self.check_section(*section))
            .collect()
    }

    /// Puts list-valued fields into their canonical order.
    pub fn normalize(&mut self) {
        sort_tiers(&mut self.season_management.rank_tiers);
        sort_tiers(&mut self.season_management.reward_tiers);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GeneralSettings {
    #[validate(length(min = 1, max = 32))]
    pub bot_name: String,
    #[validate(length(min = 1, max = 5))]
    pub command_prefix: String,
    #[validate(length(min = 1, max = 64))]
    pub timezone: String,
    #[validate(length(min = 2, max = 10))]
    pub language: String,
    pub maintenance_mode: bool,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            bot_name: "Late League".to_string(),
            command_prefix: "!".to_string(),
            timezone: "UTC".to_string(),
            language: "en".to_string(),
            maintenance_mode: false,
        }
    }
}

impl Schema for GeneralSettings {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TeamBalanceMethod {
    Mmr,
    Random,
    Captains,
    RoleBased,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MatchmakingSettings {
    #[validate(range(min = 2, max = 100))]
    pub queue_size_limit: u32,
    #[validate(range(min = 1, max = 10))]
    pub players_per_team: u32,
    #[validate(range(min = 1, max = 240))]
    pub queue_timeout_minutes: u32,
    pub team_balance_method: TeamBalanceMethod,
    #[validate(range(min = 0, max = 5000))]
    pub mmr_range_limit: u32,
    pub allow_duplicate_queue: bool,
    #[validate(range(min = 10, max = 600))]
    pub ready_check_timeout_seconds: u32,
}

impl Default for MatchmakingSettings {
    fn default() -> Self {
        Self {
            queue_size_limit: 10,
            players_per_team: 5,
            queue_timeout_minutes: 30,
            team_balance_method: TeamBalanceMethod::Mmr,
            mmr_range_limit: 500,
            allow_duplicate_queue: false,
            ready_check_timeout_seconds: 60,
        }
    }
}

impl Schema for MatchmakingSettings {
    fn extra_checks(&self) -> Vec<FieldError> {
        if self.queue_size_limit < self.players_per_team.saturating_mul(2) {
            return vec![FieldError::new(
                "queueSizeLimit",
                "too_small",
                format!("must fit two teams of {} players", self.players_per_team),
            )];
        }
        Vec::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MmrCalculationMethod {
    Elo,
    Glicko2,
    Trueskill,
    Custom,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MmrSystemSettings {
    #[validate(range(min = 0, max = 10000))]
    pub starting_mmr: i64,
    #[validate(range(min = 1, max = 64))]
    pub k_factor: u32,
    pub mmr_calculation_method: MmrCalculationMethod,
    #[validate(range(min = 1.0, max = 5.0))]
    pub placement_match_multiplier: f64,
    #[validate(range(min = 0, max = 50))]
    pub win_streak_bonus: u32,
    pub loss_streak_protection: bool,
    #[validate(range(min = 0, max = 10000))]
    pub minimum_mmr: i64,
    #[validate(range(min = 0, max = 20000))]
    pub maximum_mmr: i64,
}

impl Default for MmrSystemSettings {
    fn default() -> Self {
        Self {
            starting_mmr: 1000,
            k_factor: 32,
            mmr_calculation_method: MmrCalculationMethod::Elo,
            placement_match_multiplier: 2.0,
            win_streak_bonus: 5,
            loss_streak_protection: false,
            minimum_mmr: 0,
            maximum_mmr: 5000,
        }
    }
}

impl MmrSystemSettings {
    pub fn clamp(&self, mmr: i64) -> i64 {
        mmr.clamp(self.minimum_mmr, self.maximum_mmr.max(self.minimum_mmr))
    }
}

impl Schema for MmrSystemSettings {
    fn extra_checks(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if self.minimum_mmr > self.maximum_mmr {
            errors.push(FieldError::new(
                "minimumMmr",
                "order",
                "must not exceed maximumMmr",
            ));
        }
        if self.starting_mmr < self.minimum_mmr || self.starting_mmr > self.maximum_mmr {
            errors.push(FieldError::new(
                "startingMmr",
                "order",
                "must lie between minimumMmr and maximumMmr",
            ));
        }
        errors
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MmrResetType {
    Full,
    Soft,
    None,
}

/// Highest season number a league can reach.
pub const MAX_SEASON: u32 = 100_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SeasonConfig {
    #[validate(range(min = 1, max = 100000))]
    pub current_season: u32,
    pub season_start_date: DateTime<Utc>,
    pub season_end_date: DateTime<Utc>,
    pub mmr_reset_type: MmrResetType,
    /// Share of the distance from `startingMmr` a player keeps on a soft reset.
    #[validate(range(min = 0.0, max = 1.0))]
    pub soft_reset_retention: f64,
    #[validate(range(min = 0, max = 20))]
    pub placement_match_requirements: u32,
    pub enable_end_of_season_announcements: bool,
    pub reward_tiers: Vec<RewardTier>,
    pub rank_tiers: Vec<RankTier>,
}

impl Default for SeasonConfig {
    fn default() -> Self {
        let (season_start_date, season_end_date) = season_window(Utc::now());
        Self {
            current_season: 1,
            season_start_date,
            season_end_date,
            mmr_reset_type: MmrResetType::Soft,
            soft_reset_retention: 0.5,
            placement_match_requirements: 5,
            enable_end_of_season_announcements: true,
            reward_tiers: tiers::default_reward_tiers(),
            rank_tiers: tiers::default_rank_tiers(),
        }
    }
}

impl Schema for SeasonConfig {
    fn extra_checks(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if self.season_end_date <= self.season_start_date {
            errors.push(FieldError::new(
                "seasonEndDate",
                "order",
                "must be after seasonStartDate",
            ));
        }
        errors.extend(check_tier_list("rewardTiers", &self.reward_tiers));
        errors.extend(check_tier_list("rankTiers", &self.rank_tiers));
        errors
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MapSelection {
    Random,
    Vote,
    Captains,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MatchRulesSettings {
    #[validate(length(min = 1, max = 32))]
    pub default_game_mode: String,
    pub map_selection: MapSelection,
    #[validate(range(min = 5, max = 240))]
    pub match_time_limit_minutes: u32,
    #[validate(range(min = 0, max = 1440))]
    pub dispute_window_minutes: u32,
    pub require_screenshot_proof: bool,
    pub allow_spectators: bool,
    #[validate(range(min = 1, max = 60))]
    pub forfeit_timeout_minutes: u32,
}

impl Default for MatchRulesSettings {
    fn default() -> Self {
        Self {
            default_game_mode: "standard".to_string(),
            map_selection: MapSelection::Vote,
            match_time_limit_minutes: 60,
            dispute_window_minutes: 30,
            require_screenshot_proof: true,
            allow_spectators: false,
            forfeit_timeout_minutes: 10,
        }
    }
}

impl Schema for MatchRulesSettings {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NotificationSettings {
    pub enable_discord_notifications: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 32))]
    pub match_found_channel_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 32))]
    pub results_channel_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 32))]
    pub announcements_channel_id: Option<String>,
    pub notify_on_queue_pop: bool,
    pub notify_on_match_end: bool,
    pub notify_on_season_events: bool,
    pub direct_message_rewards: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            enable_discord_notifications: true,
            match_found_channel_id: None,
            results_channel_id: None,
            announcements_channel_id: None,
            notify_on_queue_pop: true,
            notify_on_match_end: true,
            notify_on_season_events: true,
            direct_message_rewards: true,
        }
    }
}

impl Schema for NotificationSettings {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct IntegrationSettings {
    pub enable_webhooks: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(url)]
    pub webhook_url: Option<String>,
    pub enable_stats_api: bool,
    #[validate(range(min = 1, max = 10000))]
    pub stats_api_rate_limit_per_minute: u32,
}

impl Default for IntegrationSettings {
    fn default() -> Self {
        Self {
            enable_webhooks: false,
            webhook_url: None,
            enable_stats_api: false,
            stats_api_rate_limit_per_minute: 60,
        }
    }
}

impl Schema for IntegrationSettings {
    fn extra_checks(&self) -> Vec<FieldError> {
        if self.enable_webhooks && self.webhook_url.is_none() {
            return vec![FieldError::new(
                "webhookUrl",
                "required",
                "is required when enableWebhooks is set",
            )];
        }
        Vec::new()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DataManagementSettings {
    #[validate(range(min = 30, max = 3650))]
    pub data_retention_days: u32,
    pub enable_automatic_backups: bool,
    #[validate(range(min = 1, max = 168))]
    pub backup_frequency_hours: u32,
    pub archive_match_history: bool,
    #[validate(range(min = 7, max = 365))]
    pub inactivity_threshold_days: u32,
}

impl Default for DataManagementSettings {
    fn default() -> Self {
        Self {
            data_retention_days: 365,
            enable_automatic_backups: true,
            backup_frequency_hours: 24,
            archive_match_history: true,
            inactivity_threshold_days: 30,
        }
    }
}

impl Schema for DataManagementSettings {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = BotConfig::default();
        assert_eq!(config.check(), Vec::<FieldError>::new());
    }

    #[test]
    fn test_round_trip_is_identical() {
        let mut config = BotConfig::default();
        config.notifications.results_channel_id = Some("123456789012345678".to_string());
        config.integrations.webhook_url = Some("https://example.com/hook".to_string());

        let first = serde_json::to_string(&config).unwrap();
        let decoded: BotConfig = serde_json::from_str(&first).unwrap();
        let second = serde_json::to_string(&decoded).unwrap();

        assert_eq!(first, second);
        assert_eq!(decoded, config);
    }

    #[test]
    fn test_k_factor_out_of_range() {
        let mut config = BotConfig::default();
        config.mmr_system.k_factor = 100;

        let errors = config.check_section(Section::MmrSystem);

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "mmrSystem.kFactor");
        assert_eq!(errors[0].code, "range");
    }

    #[test]
    fn test_huge_team_size_is_a_range_error() {
        let mut config = BotConfig::default();
        config.matchmaking.players_per_team = u32::MAX;

        let errors = config.check_section(Section::Matchmaking);

        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"matchmaking.playersPerTeam"));
        assert!(fields.contains(&"matchmaking.queueSizeLimit"));
    }

    #[test]
    fn test_current_season_upper_bound() {
        let mut config = BotConfig::default();
        config.season_management.current_season = MAX_SEASON;
        assert!(config.check_section(Section::SeasonManagement).is_empty());

        config.season_management.current_season = u32::MAX;
        let errors = config.check_section(Section::SeasonManagement);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "seasonManagement.currentSeason");
    }

    #[test]
    fn test_retention_bounds() {
        let mut config = BotConfig::default();
        config.data_management.data_retention_days = 29;
        assert_eq!(config.check_section(Section::DataManagement).len(), 1);

        config.data_management.data_retention_days = 3651;
        assert_eq!(config.check_section(Section::DataManagement).len(), 1);

        config.data_management.data_retention_days = 3650;
        assert!(config.check_section(Section::DataManagement).is_empty());
    }

    #[test]
    fn test_cross_field_rules() {
        let mut config = BotConfig::default();
        config.mmr_system.starting_mmr = 6000;
        config.integrations.enable_webhooks = true;
        config.season_management.season_end_date = config.season_management.season_start_date;

        let fields: Vec<String> = config.check().into_iter().map(|e| e.field).collect();

        assert!(fields.contains(&"mmrSystem.startingMmr".to_string()));
        assert!(fields.contains(&"integrations.webhookUrl".to_string()));
        assert!(fields.contains(&"seasonManagement.seasonEndDate".to_string()));
    }

    #[test]
    fn test_invalid_webhook_url() {
        let mut config = BotConfig::default();
        config.integrations.webhook_url = Some("not a url".to_string());

        let errors = config.check_section(Section::Integrations);

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "integrations.webhookUrl");
    }

    #[test]
    fn test_unknown_field_rejected() {
        let mut config = BotConfig::default();
        let mut value = config.section_value(Section::General).unwrap();
        value["botNmae"] = Value::from("typo");

        assert!(config.replace_section(Section::General, value).is_err());
    }

    #[test]
    fn test_normalize_sorts_tier_lists() {
        let mut config = BotConfig::default();
        config.season_management.rank_tiers.reverse();
        config.season_management.reward_tiers.reverse();

        config.normalize();

        assert_eq!(config.season_management.rank_tiers, tiers::default_rank_tiers());
        assert_eq!(config.season_management.reward_tiers, tiers::default_reward_tiers());
    }
}
