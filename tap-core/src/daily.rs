use chrono::NaiveDate;
use tap_types::UserRecord;

use crate::{FieldValue, GameRules, UserField, UserPatch, tap_capacity};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DailyQuota {
    Taps,
    Spins,
    Ads,
}

/// A quota is due for a refill whenever its stored date is not today.
pub fn needs_reset(stored: Option<NaiveDate>, today: NaiveDate) -> bool {
    stored != Some(today)
}

/// Refill a daily quota in place. Returns the patch to persist, or `None`
/// when the quota was already refilled today.
pub fn refresh_quota(
    record: &mut UserRecord,
    quota: DailyQuota,
    today: NaiveDate,
    rules: &GameRules,
) -> Option<UserPatch> {
    let stored = match quota {
        DailyQuota::Taps => record.taps_reset_date,
        DailyQuota::Spins => record.spins_reset_date,
        DailyQuota::Ads => record.tasks.daily_ads_reset_date,
    };
    if !needs_reset(stored, today) {
        return None;
    }

    let patch = match quota {
        DailyQuota::Taps => UserPatch::new()
            .set(
                UserField::TapsRemaining,
                FieldValue::Int(tap_capacity(&record.upgrades)),
            )
            .set(UserField::TapsResetDate, FieldValue::Date(Some(today))),
        DailyQuota::Spins => UserPatch::new()
            .set(UserField::SpinsFree, FieldValue::Int(rules.free_spins_per_day))
            .set(UserField::SpinsAd, FieldValue::Int(rules.ad_spins_per_day))
            .set(UserField::SpinsResetDate, FieldValue::Date(Some(today))),
        DailyQuota::Ads => UserPatch::new()
            .set(UserField::DailyAdsLeft, FieldValue::Int(rules.daily_ads))
            .set(UserField::DailyAdsResetDate, FieldValue::Date(Some(today))),
    };

    // Every value above matches its field type.
    patch.apply_to(record).ok()?;
    Some(patch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, d).unwrap()
    }

    #[test]
    fn test_taps_reset_is_idempotent_within_a_day() {
        let rules = GameRules::default();
        let mut record = UserRecord::new(1, Utc::now());

        let first = refresh_quota(&mut record, DailyQuota::Taps, day(15), &rules);
        assert!(first.is_some());
        assert_eq!(record.taps_remaining, 1000);

        record.taps_remaining = 10;
        let second = refresh_quota(&mut record, DailyQuota::Taps, day(15), &rules);
        assert!(second.is_none());
        assert_eq!(record.taps_remaining, 10);
    }

    #[test]
    fn test_new_day_restores_current_capacity() {
        let rules = GameRules::default();
        let mut record = UserRecord::new(1, Utc::now());
        refresh_quota(&mut record, DailyQuota::Taps, day(15), &rules);
        record.taps_remaining = 0;
        record.upgrades.tap_energy = 2;

        refresh_quota(&mut record, DailyQuota::Taps, day(16), &rules);
        assert_eq!(record.taps_remaining, 2000);
        assert_eq!(record.taps_reset_date, Some(day(16)));
    }

    #[test]
    fn test_spins_and_ads_refill_to_defaults() {
        let rules = GameRules::default();
        let mut record = UserRecord::new(1, Utc::now());

        let patch = refresh_quota(&mut record, DailyQuota::Spins, day(1), &rules).unwrap();
        assert!(patch.contains(UserField::SpinsResetDate));
        assert_eq!((record.spins_free, record.spins_ad), (1, 2));

        refresh_quota(&mut record, DailyQuota::Ads, day(1), &rules).unwrap();
        assert_eq!(record.tasks.daily_ads_left, 3);
        assert_eq!(record.tasks.daily_ads_reset_date, Some(day(1)));
    }

    #[test]
    fn test_stored_date_ahead_of_clock_still_resets() {
        // A date that is not today is stale, whichever side it is on.
        assert!(needs_reset(Some(day(20)), day(19)));
        assert!(needs_reset(None, day(19)));
        assert!(!needs_reset(Some(day(19)), day(19)));
    }
}
