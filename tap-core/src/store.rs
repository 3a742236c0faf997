use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tap_types::{RewardError, TaskKind, UpgradeId, UserId, UserRecord};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("user {0} not found")]
    NotFound(UserId),
    #[error("field {0:?} cannot be incremented")]
    NotACounter(UserField),
    #[error("value does not match the type of field {0:?}")]
    TypeMismatch(UserField),
    #[error("database error: {0}")]
    Database(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<StoreError> for RewardError {
    fn from(error: StoreError) -> Self {
        RewardError::PersistenceFailure {
            message: error.to_string(),
        }
    }
}

/// Addressable column of the user record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum UserField {
    Username,
    FirstName,
    LastName,
    Balance,
    ReferredBy,
    ReferralRewardedCount,
    TapsRemaining,
    TapsResetDate,
    NextFaucetClaimAt,
    UpgradeLevel(UpgradeId),
    CheckInCount,
    LastCheckInDate,
    SpinsFree,
    SpinsAd,
    SpinsResetDate,
    RareCards,
    EpicCards,
    MythicCards,
    TonMilli,
    DailyAdsLeft,
    DailyAdsResetDate,
    TaskDone(TaskKind),
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Int(i64),
    Text(String),
    Flag(bool),
    Date(Option<NaiveDate>),
    Timestamp(Option<DateTime<Utc>>),
    UserRef(Option<UserId>),
}

impl FieldValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            FieldValue::Int(value) => Some(*value),
            _ => None,
        }
    }
}

impl UserField {
    /// Integer columns accept atomic increments.
    pub fn is_counter(&self) -> bool {
        matches!(
            self,
            UserField::Balance
                | UserField::ReferralRewardedCount
                | UserField::TapsRemaining
                | UserField::UpgradeLevel(_)
                | UserField::CheckInCount
                | UserField::SpinsFree
                | UserField::SpinsAd
                | UserField::RareCards
                | UserField::EpicCards
                | UserField::MythicCards
                | UserField::TonMilli
                | UserField::DailyAdsLeft
        )
    }

    pub fn read(&self, record: &UserRecord) -> FieldValue {
        match self {
            UserField::Username => FieldValue::Text(record.username.clone()),
            UserField::FirstName => FieldValue::Text(record.first_name.clone()),
            UserField::LastName => FieldValue::Text(record.last_name.clone()),
            UserField::Balance => FieldValue::Int(record.balance),
            UserField::ReferredBy => FieldValue::UserRef(record.referred_by),
            UserField::ReferralRewardedCount => FieldValue::Int(record.referral_rewarded_count),
            UserField::TapsRemaining => FieldValue::Int(record.taps_remaining),
            UserField::TapsResetDate => FieldValue::Date(record.taps_reset_date),
            UserField::NextFaucetClaimAt => FieldValue::Timestamp(record.next_faucet_claim_at),
            UserField::UpgradeLevel(id) => FieldValue::Int(record.upgrades.get(*id) as i64),
            UserField::CheckInCount => FieldValue::Int(record.check_in_count),
            UserField::LastCheckInDate => FieldValue::Date(record.last_check_in_date),
            UserField::SpinsFree => FieldValue::Int(record.spins_free),
            UserField::SpinsAd => FieldValue::Int(record.spins_ad),
            UserField::SpinsResetDate => FieldValue::Date(record.spins_reset_date),
            UserField::RareCards => FieldValue::Int(record.collections.rare_cards),
            UserField::EpicCards => FieldValue::Int(record.collections.epic_cards),
            UserField::MythicCards => FieldValue::Int(record.collections.mythic_cards),
            UserField::TonMilli => FieldValue::Int(record.collections.ton_milli),
            UserField::DailyAdsLeft => FieldValue::Int(record.tasks.daily_ads_left),
            UserField::DailyAdsResetDate => FieldValue::Date(record.tasks.daily_ads_reset_date),
            UserField::TaskDone(task) => {
                FieldValue::Flag(record.tasks.is_done(*task).unwrap_or(false))
            }
        }
    }

    pub fn write(&self, record: &mut UserRecord, value: FieldValue) -> Result<(), StoreError> {
        let mismatch = || StoreError::TypeMismatch(*self);
        match (self, value) {
            (UserField::Username, FieldValue::Text(v)) => record.username = v,
            (UserField::FirstName, FieldValue::Text(v)) => record.first_name = v,
            (UserField::LastName, FieldValue::Text(v)) => record.last_name = v,
            (UserField::Balance, FieldValue::Int(v)) => record.balance = v,
            (UserField::ReferredBy, FieldValue::UserRef(v)) => record.referred_by = v,
            (UserField::ReferralRewardedCount, FieldValue::Int(v)) => {
                record.referral_rewarded_count = v
            }
            (UserField::TapsRemaining, FieldValue::Int(v)) => record.taps_remaining = v,
            (UserField::TapsResetDate, FieldValue::Date(v)) => record.taps_reset_date = v,
            (UserField::NextFaucetClaimAt, FieldValue::Timestamp(v)) => {
                record.next_faucet_claim_at = v
            }
            (UserField::UpgradeLevel(id), FieldValue::Int(v)) => {
                let level = u32::try_from(v).map_err(|_| mismatch())?;
                record.upgrades.set(*id, level);
            }
            (UserField::CheckInCount, FieldValue::Int(v)) => record.check_in_count = v,
            (UserField::LastCheckInDate, FieldValue::Date(v)) => record.last_check_in_date = v,
            (UserField::SpinsFree, FieldValue::Int(v)) => record.spins_free = v,
            (UserField::SpinsAd, FieldValue::Int(v)) => record.spins_ad = v,
            (UserField::SpinsResetDate, FieldValue::Date(v)) => record.spins_reset_date = v,
            (UserField::RareCards, FieldValue::Int(v)) => record.collections.rare_cards = v,
            (UserField::EpicCards, FieldValue::Int(v)) => record.collections.epic_cards = v,
            (UserField::MythicCards, FieldValue::Int(v)) => record.collections.mythic_cards = v,
            (UserField::TonMilli, FieldValue::Int(v)) => record.collections.ton_milli = v,
            (UserField::DailyAdsLeft, FieldValue::Int(v)) => record.tasks.daily_ads_left = v,
            (UserField::DailyAdsResetDate, FieldValue::Date(v)) => {
                record.tasks.daily_ads_reset_date = v
            }
            (UserField::TaskDone(task), FieldValue::Flag(v)) if task.is_one_time() => {
                record.tasks.set_done(*task, v)
            }
            _ => return Err(mismatch()),
        }
        Ok(())
    }

    /// Add `delta` to an integer field and return the new value.
    pub fn add(&self, record: &mut UserRecord, delta: i64) -> Result<i64, StoreError> {
        if !self.is_counter() {
            return Err(StoreError::NotACounter(*self));
        }
        let current = self
            .read(record)
            .as_int()
            .ok_or(StoreError::NotACounter(*self))?;
        let updated = current + delta;
        self.write(record, FieldValue::Int(updated))?;
        Ok(updated)
    }
}

/// Partial update: only the fields present are written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserPatch {
    fields: BTreeMap<UserField, FieldValue>,
}

impl UserPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, field: UserField, value: FieldValue) -> Self {
        self.fields.insert(field, value);
        self
    }

    pub fn insert(&mut self, field: UserField, value: FieldValue) {
        self.fields.insert(field, value);
    }

    pub fn get(&self, field: UserField) -> Option<&FieldValue> {
        self.fields.get(&field)
    }

    pub fn contains(&self, field: UserField) -> bool {
        self.fields.contains_key(&field)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&UserField, &FieldValue)> {
        self.fields.iter()
    }

    pub fn merge(&mut self, other: UserPatch) {
        self.fields.extend(other.fields);
    }

    pub fn apply_to(&self, record: &mut UserRecord) -> Result<(), StoreError> {
        for (field, value) in &self.fields {
            field.write(record, value.clone())?;
        }
        Ok(())
    }
}

/// Increments plus plain field writes against a single row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserUpdate {
    pub increments: BTreeMap<UserField, i64>,
    pub patch: UserPatch,
}

impl UserUpdate {
    pub fn is_empty(&self) -> bool {
        self.increments.is_empty() && self.patch.is_empty()
    }

    pub fn apply_to(&self, record: &mut UserRecord) -> Result<(), StoreError> {
        for (field, delta) in &self.increments {
            field.add(record, *delta)?;
        }
        self.patch.apply_to(record)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserFilter {
    ReferredBy(UserId),
    BalanceAbove(i64),
}

impl UserFilter {
    pub fn matches(&self, record: &UserRecord) -> bool {
        match self {
            UserFilter::ReferredBy(id) => record.referred_by == Some(*id),
            UserFilter::BalanceAbove(balance) => record.balance > *balance,
        }
    }
}

#[derive(Debug, Clone)]
pub struct UpsertOutcome {
    pub record: UserRecord,
    pub created: bool,
}

/// Remote persistence for user records.
///
/// The store guarantees atomic single-row increments and plain overwrites,
/// nothing more: no multi-row transactions and no compare-and-set. Two
/// sessions for the same user race on every non-counter field and the last
/// write wins.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_user(&self, id: UserId) -> Result<Option<UserRecord>, StoreError>;

    /// Insert-or-update by id. New rows start from `UserRecord::new`; fields
    /// absent from `patch`, `referred_by` included, are left untouched.
    async fn upsert_user(&self, id: UserId, patch: &UserPatch)
    -> Result<UpsertOutcome, StoreError>;

    async fn increment(&self, id: UserId, field: UserField, delta: i64)
    -> Result<i64, StoreError>;

    async fn update_fields(&self, id: UserId, patch: &UserPatch) -> Result<(), StoreError>;

    /// Credits increments before writing plain fields. Implementations that
    /// can do both in one statement should override this.
    async fn apply(&self, id: UserId, update: &UserUpdate) -> Result<(), StoreError> {
        for (field, delta) in &update.increments {
            self.increment(id, *field, *delta).await?;
        }
        if !update.patch.is_empty() {
            self.update_fields(id, &update.patch).await?;
        }
        Ok(())
    }

    async fn count_where(&self, filter: UserFilter) -> Result<u64, StoreError>;

    /// Rows ordered by `order_by` descending.
    async fn top_n(
        &self,
        order_by: UserField,
        n: u64,
        filter: Option<UserFilter>,
    ) -> Result<Vec<UserRecord>, StoreError>;
}
