use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::{RewardCollections, UpgradeLevels};

/// Host-platform user id. Assigned by the platform, never by us.
pub type UserId = i64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UserRecord {
    pub id: UserId,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub balance: i64,
    pub referral_code: String,
    pub referred_by: Option<UserId>,
    pub referral_rewarded_count: i64,
    pub taps_remaining: i64,
    pub taps_reset_date: Option<NaiveDate>,
    pub next_faucet_claim_at: Option<DateTime<Utc>>,
    pub upgrades: UpgradeLevels,
    pub check_in_count: i64,
    pub last_check_in_date: Option<NaiveDate>,
    pub spins_free: i64,
    pub spins_ad: i64,
    pub spins_reset_date: Option<NaiveDate>,
    pub collections: RewardCollections,
    pub tasks: TaskProgress,
    pub created_at: DateTime<Utc>,
}

impl UserRecord {
    /// A fresh record as stored on first contact. Every daily quota starts
    /// with no reset date so the first load refills it.
    pub fn new(id: UserId, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            username: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            balance: 0,
            referral_code: referral_code_for(id),
            referred_by: None,
            referral_rewarded_count: 0,
            taps_remaining: 0,
            taps_reset_date: None,
            next_faucet_claim_at: None,
            upgrades: UpgradeLevels::default(),
            check_in_count: 0,
            last_check_in_date: None,
            spins_free: 0,
            spins_ad: 0,
            spins_reset_date: None,
            collections: RewardCollections::default(),
            tasks: TaskProgress::default(),
            created_at,
        }
    }

    /// Name shown on the leaderboard: username, then first name, then a fallback.
    pub fn display_name(&self) -> String {
        if !self.username.is_empty() {
            self.username.clone()
        } else if !self.first_name.is_empty() {
            self.first_name.clone()
        } else {
            format!("user{}", self.id)
        }
    }

    pub fn title(&self) -> UserTitle {
        UserTitle::for_balance(self.balance)
    }
}

/// Referral code handed out to a user, derived from the platform id.
pub fn referral_code_for(id: UserId) -> String {
    format!("ref_{}", id)
}

/// One-time and daily task state persisted with the user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaskProgress {
    pub invite3_done: bool,
    pub invite5_done: bool,
    pub follow_tg_done: bool,
    pub follow_x_done: bool,
    pub daily_ads_left: i64,
    pub daily_ads_reset_date: Option<NaiveDate>,
}

impl TaskProgress {
    /// Completion flag of a one-time task; `None` for the daily ad task.
    pub fn is_done(&self, task: TaskKind) -> Option<bool> {
        match task {
            TaskKind::WatchAd => None,
            TaskKind::InviteThree => Some(self.invite3_done),
            TaskKind::InviteFive => Some(self.invite5_done),
            TaskKind::FollowTelegram => Some(self.follow_tg_done),
            TaskKind::FollowX => Some(self.follow_x_done),
        }
    }

    pub fn set_done(&mut self, task: TaskKind, done: bool) {
        match task {
            TaskKind::WatchAd => {}
            TaskKind::InviteThree => self.invite3_done = done,
            TaskKind::InviteFive => self.invite5_done = done,
            TaskKind::FollowTelegram => self.follow_tg_done = done,
            TaskKind::FollowX => self.follow_x_done = done,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum TaskKind {
    WatchAd,
    InviteThree,
    InviteFive,
    FollowTelegram,
    FollowX,
}

impl TaskKind {
    pub fn is_one_time(&self) -> bool {
        !matches!(self, TaskKind::WatchAd)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum UserTitle {
    Beginner,
    Skilled,
    Elite,
    Master,
    Grandmaster,
    Legend,
}

impl UserTitle {
    pub fn for_balance(balance: i64) -> Self {
        match balance {
            b if b >= 300_000 => UserTitle::Legend,
            b if b >= 100_000 => UserTitle::Grandmaster,
            b if b >= 50_000 => UserTitle::Master,
            b if b >= 25_000 => UserTitle::Elite,
            b if b >= 10_000 => UserTitle::Skilled,
            _ => UserTitle::Beginner,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LeaderboardEntry {
    pub user_id: UserId,
    pub display_name: String,
    pub balance: i64,
    pub rank: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Leaderboard {
    pub top: Vec<LeaderboardEntry>,
    pub me: Option<LeaderboardEntry>,
    pub me_in_top: bool,
}
