//! League domain: the bot configuration document, rank/reward tier
//! resolution and the pure parts of the season lifecycle.

pub mod bot_config;
pub mod season;
pub mod section;
pub mod tiers;
pub mod validation;

pub use bot_config::{BotConfig, MmrResetType, SeasonConfig};
pub use section::{Section, UnknownSection};
pub use tiers::{RankTier, RewardTier, Tier, resolve_tier};
pub use validation::{FieldError, Schema};
