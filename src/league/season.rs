use chrono::{DateTime, Duration, Months, Utc};

use super::bot_config::{MmrResetType, MmrSystemSettings};

/// Typed confirmation required before season data may be wiped.
pub const RESET_CONFIRMATION: &str = "RESET";

/// A season lasts three calendar months from its start.
pub const SEASON_LENGTH_MONTHS: u32 = 3;

pub fn season_window(start: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let end = start
        .checked_add_months(Months::new(SEASON_LENGTH_MONTHS))
        .unwrap_or_else(|| start + Duration::days(91));
    (start, end)
}

/// MMR a player carries into the next season.
///
/// `soft` keeps `retention` of the distance from the starting MMR, `full`
/// returns to the starting MMR and `none` keeps the current value. The result
/// always lies within the configured MMR bounds.
pub fn carried_mmr(mmr: i64, reset: MmrResetType, retention: f64, mmr_system: &MmrSystemSettings) -> i64 {
    let starting = mmr_system.starting_mmr;
    let carried = match reset {
        MmrResetType::None => return mmr,
        MmrResetType::Full => starting,
        MmrResetType::Soft => {
            let distance = mmr.saturating_sub(starting) as f64;
            starting.saturating_add((distance * retention.clamp(0.0, 1.0)).round() as i64)
        }
    };
    mmr_system.clamp(carried)
}

pub fn is_confirmed(confirmation: &str) -> bool {
    confirmation.trim() == RESET_CONFIRMATION
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_season_window_is_three_months() {
        let start = Utc.with_ymd_and_hms(2026, 1, 31, 12, 0, 0).unwrap();

        let (from, to) = season_window(start);

        assert_eq!(from, start);
        // Jan 31 + 3 months clamps to the end of April.
        assert_eq!(to, Utc.with_ymd_and_hms(2026, 4, 30, 12, 0, 0).unwrap());
        let days = (to - from).num_days();
        assert!((89..=92).contains(&days), "{} days", days);
    }

    #[test]
    fn test_soft_reset_moves_halfway() {
        let settings = MmrSystemSettings::default();

        assert_eq!(carried_mmr(1600, MmrResetType::Soft, 0.5, &settings), 1300);
        assert_eq!(carried_mmr(600, MmrResetType::Soft, 0.5, &settings), 800);
        assert_eq!(carried_mmr(1600, MmrResetType::Soft, 0.0, &settings), 1000);
        assert_eq!(carried_mmr(1600, MmrResetType::Soft, 1.0, &settings), 1600);
    }

    #[test]
    fn test_full_and_none_resets() {
        let settings = MmrSystemSettings::default();

        assert_eq!(carried_mmr(2400, MmrResetType::Full, 0.5, &settings), 1000);
        assert_eq!(carried_mmr(2400, MmrResetType::None, 0.5, &settings), 2400);
    }

    #[test]
    fn test_reset_respects_bounds() {
        let settings = MmrSystemSettings {
            minimum_mmr: 900,
            maximum_mmr: 1200,
            ..MmrSystemSettings::default()
        };

        assert_eq!(carried_mmr(4000, MmrResetType::Soft, 0.9, &settings), 1200);
        assert_eq!(carried_mmr(0, MmrResetType::Soft, 0.9, &settings), 900);
        assert_eq!(carried_mmr(i64::MIN, MmrResetType::Soft, 0.5, &settings), 900);
        assert_eq!(carried_mmr(i64::MAX, MmrResetType::Soft, 1.0, &settings), 1200);
    }

    #[test]
    fn test_confirmation() {
        assert!(is_confirmed("RESET"));
        assert!(is_confirmed(" RESET "));
        assert!(!is_confirmed("reset"));
        assert!(!is_confirmed(""));
    }
}
