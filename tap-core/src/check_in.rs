use chrono::NaiveDate;

use crate::GameRules;

/// At most one check-in per calendar day.
pub fn can_check_in(last_check_in: Option<NaiveDate>, today: NaiveDate) -> bool {
    last_check_in != Some(today)
}

/// Reward for the next check-in given the streak so far. The streak only
/// ever grows; missing a day does not reset it.
pub fn check_in_reward(streak: i64, rules: &GameRules) -> i64 {
    rules.check_in_base_reward * (streak.max(0) + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reward_scales_with_streak() {
        let rules = GameRules::default();
        assert_eq!(check_in_reward(0, &rules), 500);
        assert_eq!(check_in_reward(1, &rules), 1000);
        assert_eq!(check_in_reward(6, &rules), 3500);
    }

    #[test]
    fn test_one_check_in_per_day() {
        let today = NaiveDate::from_ymd_opt(2024, 7, 15).unwrap();
        assert!(can_check_in(None, today));
        assert!(can_check_in(today.pred_opt(), today));
        assert!(!can_check_in(Some(today), today));
    }
}
