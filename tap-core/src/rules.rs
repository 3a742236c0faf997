use chrono::TimeDelta;

/// Economy constants shared by every reward path.
#[derive(Debug, Clone)]
pub struct GameRules {
    pub referral_reward: i64,
    pub check_in_base_reward: i64,
    pub free_spins_per_day: i64,
    pub ad_spins_per_day: i64,
    pub daily_ads: i64,
    pub reward_per_ad: i64,
    pub invite_three_reward: i64,
    pub invite_five_reward: i64,
    pub follow_telegram_reward: i64,
    pub follow_x_reward: i64,
    pub faucet_cooldown: TimeDelta,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            referral_reward: 100,
            check_in_base_reward: 500,
            free_spins_per_day: 1,
            ad_spins_per_day: 2,
            daily_ads: 3,
            reward_per_ad: 200,
            invite_three_reward: 500,
            invite_five_reward: 1000,
            follow_telegram_reward: 300,
            follow_x_reward: 300,
            faucet_cooldown: TimeDelta::hours(2), // 2 hours
        }
    }
}
