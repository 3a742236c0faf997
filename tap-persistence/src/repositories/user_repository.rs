use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::{Expr, SimpleExpr};
use sea_orm::{
    ActiveValue, ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect,
};
use std::mem::discriminant;
use tracing::debug;

use crate::entities::{prelude::*, users};
use tap_core::{
    FieldValue, StoreError, UpsertOutcome, UserField, UserFilter, UserPatch, UserStore,
    UserUpdate,
};
use tap_types::{
    RewardCollections, TaskKind, TaskProgress, UpgradeId, UpgradeLevels, UserId, UserRecord,
};

pub struct UserRepository {
    db: DatabaseConnection,
}

fn db_err(error: DbErr) -> StoreError {
    StoreError::Database(error.to_string())
}

fn level_from_column(level: i32) -> u32 {
    u32::try_from(level).unwrap_or(1).max(1)
}

impl UserRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    fn model_to_user(model: users::Model) -> UserRecord {
        UserRecord {
            id: model.id,
            username: model.username,
            first_name: model.first_name,
            last_name: model.last_name,
            balance: model.balance,
            referral_code: model.referral_code,
            referred_by: model.referred_by,
            referral_rewarded_count: model.referral_rewarded_count,
            taps_remaining: model.taps_remaining,
            taps_reset_date: model.taps_reset_date,
            next_faucet_claim_at: model.next_faucet_claim_at.map(|t| t.with_timezone(&Utc)),
            upgrades: UpgradeLevels {
                faucet_rate: level_from_column(model.faucet_rate_level),
                tap_power: level_from_column(model.tap_power_level),
                tap_energy: level_from_column(model.tap_energy_level),
            },
            check_in_count: model.check_in_count,
            last_check_in_date: model.last_check_in_date,
            spins_free: model.spins_free,
            spins_ad: model.spins_ad,
            spins_reset_date: model.spins_reset_date,
            collections: RewardCollections {
                rare_cards: model.rare_cards,
                epic_cards: model.epic_cards,
                mythic_cards: model.mythic_cards,
                ton_milli: model.ton_milli,
            },
            tasks: TaskProgress {
                invite3_done: model.task_invite3_done,
                invite5_done: model.task_invite5_done,
                follow_tg_done: model.task_follow_tg_done,
                follow_x_done: model.task_follow_x_done,
                daily_ads_left: model.daily_ads_left,
                daily_ads_reset_date: model.daily_ads_reset_date,
            },
            created_at: model.created_at.with_timezone(&Utc),
        }
    }

    fn user_to_active_model(user: &UserRecord) -> users::ActiveModel {
        let now = Utc::now().into();

        users::ActiveModel {
            id: ActiveValue::Set(user.id),
            username: ActiveValue::Set(user.username.clone()),
            first_name: ActiveValue::Set(user.first_name.clone()),
            last_name: ActiveValue::Set(user.last_name.clone()),
            balance: ActiveValue::Set(user.balance),
            referral_code: ActiveValue::Set(user.referral_code.clone()),
            referred_by: ActiveValue::Set(user.referred_by),
            referral_rewarded_count: ActiveValue::Set(user.referral_rewarded_count),
            taps_remaining: ActiveValue::Set(user.taps_remaining),
            taps_reset_date: ActiveValue::Set(user.taps_reset_date),
            next_faucet_claim_at: ActiveValue::Set(user.next_faucet_claim_at.map(Into::into)),
            faucet_rate_level: ActiveValue::Set(user.upgrades.faucet_rate as i32),
            tap_power_level: ActiveValue::Set(user.upgrades.tap_power as i32),
            tap_energy_level: ActiveValue::Set(user.upgrades.tap_energy as i32),
            check_in_count: ActiveValue::Set(user.check_in_count),
            last_check_in_date: ActiveValue::Set(user.last_check_in_date),
            spins_free: ActiveValue::Set(user.spins_free),
            spins_ad: ActiveValue::Set(user.spins_ad),
            spins_reset_date: ActiveValue::Set(user.spins_reset_date),
            rare_cards: ActiveValue::Set(user.collections.rare_cards),
            epic_cards: ActiveValue::Set(user.collections.epic_cards),
            mythic_cards: ActiveValue::Set(user.collections.mythic_cards),
            ton_milli: ActiveValue::Set(user.collections.ton_milli),
            daily_ads_left: ActiveValue::Set(user.tasks.daily_ads_left),
            daily_ads_reset_date: ActiveValue::Set(user.tasks.daily_ads_reset_date),
            task_invite3_done: ActiveValue::Set(user.tasks.invite3_done),
            task_invite5_done: ActiveValue::Set(user.tasks.invite5_done),
            task_follow_tg_done: ActiveValue::Set(user.tasks.follow_tg_done),
            task_follow_x_done: ActiveValue::Set(user.tasks.follow_x_done),
            created_at: ActiveValue::Set(user.created_at.into()),
            updated_at: ActiveValue::Set(now),
        }
    }

    fn column_for(field: UserField) -> Result<users::Column, StoreError> {
        let column = match field {
            UserField::Username => users::Column::Username,
            UserField::FirstName => users::Column::FirstName,
            UserField::LastName => users::Column::LastName,
            UserField::Balance => users::Column::Balance,
            UserField::ReferredBy => users::Column::ReferredBy,
            UserField::ReferralRewardedCount => users::Column::ReferralRewardedCount,
            UserField::TapsRemaining => users::Column::TapsRemaining,
            UserField::TapsResetDate => users::Column::TapsResetDate,
            UserField::NextFaucetClaimAt => users::Column::NextFaucetClaimAt,
            UserField::UpgradeLevel(UpgradeId::FaucetRate) => users::Column::FaucetRateLevel,
            UserField::UpgradeLevel(UpgradeId::TapPower) => users::Column::TapPowerLevel,
            UserField::UpgradeLevel(UpgradeId::TapEnergy) => users::Column::TapEnergyLevel,
            UserField::CheckInCount => users::Column::CheckInCount,
            UserField::LastCheckInDate => users::Column::LastCheckInDate,
            UserField::SpinsFree => users::Column::SpinsFree,
            UserField::SpinsAd => users::Column::SpinsAd,
            UserField::SpinsResetDate => users::Column::SpinsResetDate,
            UserField::RareCards => users::Column::RareCards,
            UserField::EpicCards => users::Column::EpicCards,
            UserField::MythicCards => users::Column::MythicCards,
            UserField::TonMilli => users::Column::TonMilli,
            UserField::DailyAdsLeft => users::Column::DailyAdsLeft,
            UserField::DailyAdsResetDate => users::Column::DailyAdsResetDate,
            UserField::TaskDone(TaskKind::InviteThree) => users::Column::TaskInvite3Done,
            UserField::TaskDone(TaskKind::InviteFive) => users::Column::TaskInvite5Done,
            UserField::TaskDone(TaskKind::FollowTelegram) => users::Column::TaskFollowTgDone,
            UserField::TaskDone(TaskKind::FollowX) => users::Column::TaskFollowXDone,
            UserField::TaskDone(TaskKind::WatchAd) => return Err(StoreError::TypeMismatch(field)),
        };
        Ok(column)
    }

    fn value_expr(field: UserField, value: &FieldValue) -> Result<SimpleExpr, StoreError> {
        // Compare against what the field holds on a blank record
        let template = field.read(&UserRecord::new(0, Utc::now()));
        if discriminant(&template) != discriminant(value) {
            return Err(StoreError::TypeMismatch(field));
        }

        let expr = match value {
            FieldValue::Int(v) => match field {
                UserField::UpgradeLevel(_) => {
                    let level = i32::try_from(*v)
                        .ok()
                        .filter(|level| *level >= 1)
                        .ok_or(StoreError::TypeMismatch(field))?;
                    Expr::value(level)
                }
                _ => Expr::value(*v),
            },
            FieldValue::Text(v) => Expr::value(v.clone()),
            FieldValue::Flag(v) => Expr::value(*v),
            FieldValue::Date(v) => Expr::value(*v),
            FieldValue::Timestamp(v) => {
                let stamp: Option<sea_orm::prelude::DateTimeWithTimeZone> = v.map(Into::into);
                Expr::value(stamp)
            }
            FieldValue::UserRef(v) => Expr::value(*v),
        };
        Ok(expr)
    }

    fn condition(filter: UserFilter) -> Condition {
        match filter {
            UserFilter::ReferredBy(id) => Condition::all().add(users::Column::ReferredBy.eq(id)),
            UserFilter::BalanceAbove(balance) => {
                Condition::all().add(users::Column::Balance.gt(balance))
            }
        }
    }

    /// One `UPDATE` carrying both `col = col + delta` and plain assignments.
    async fn apply_update(&self, id: UserId, update: &UserUpdate) -> Result<(), StoreError> {
        let mut statement = Users::update_many().filter(users::Column::Id.eq(id));

        for (field, delta) in &update.increments {
            if !field.is_counter() {
                return Err(StoreError::NotACounter(*field));
            }
            let column = Self::column_for(*field)?;
            statement = statement.col_expr(column, Expr::col(column).add(*delta));
        }
        for (field, value) in update.patch.iter() {
            let column = Self::column_for(*field)?;
            statement = statement.col_expr(column, Self::value_expr(*field, value)?);
        }

        let now: sea_orm::prelude::DateTimeWithTimeZone = Utc::now().into();
        statement = statement.col_expr(users::Column::UpdatedAt, Expr::value(now));

        let result = statement.exec(&self.db).await.map_err(db_err)?;
        if result.rows_affected == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    async fn fetch(&self, id: UserId) -> Result<UserRecord, StoreError> {
        self.get_user(id).await?.ok_or(StoreError::NotFound(id))
    }
}

#[async_trait]
impl UserStore for UserRepository {
    async fn get_user(&self, id: UserId) -> Result<Option<UserRecord>, StoreError> {
        let user_model = Users::find_by_id(id).one(&self.db).await.map_err(db_err)?;
        Ok(user_model.map(Self::model_to_user))
    }

    async fn upsert_user(
        &self,
        id: UserId,
        patch: &UserPatch,
    ) -> Result<UpsertOutcome, StoreError> {
        if self.get_user(id).await?.is_none() {
            let mut user = UserRecord::new(id, Utc::now());
            patch.apply_to(&mut user)?;

            match Users::insert(Self::user_to_active_model(&user))
                .exec(&self.db)
                .await
            {
                Ok(_) => {
                    debug!("Inserted user {}", id);
                    return Ok(UpsertOutcome {
                        record: self.fetch(id).await?,
                        created: true,
                    });
                }
                Err(e) => {
                    // Lost an insert race; fall through to the update path
                    if self.get_user(id).await?.is_none() {
                        return Err(db_err(e));
                    }
                }
            }
        }

        if !patch.is_empty() {
            self.update_fields(id, patch).await?;
        }
        Ok(UpsertOutcome {
            record: self.fetch(id).await?,
            created: false,
        })
    }

    async fn increment(
        &self,
        id: UserId,
        field: UserField,
        delta: i64,
    ) -> Result<i64, StoreError> {
        let mut update = UserUpdate::default();
        update.increments.insert(field, delta);
        self.apply_update(id, &update).await?;

        let user = self.fetch(id).await?;
        field
            .read(&user)
            .as_int()
            .ok_or(StoreError::NotACounter(field))
    }

    async fn update_fields(&self, id: UserId, patch: &UserPatch) -> Result<(), StoreError> {
        let update = UserUpdate {
            increments: Default::default(),
            patch: patch.clone(),
        };
        self.apply_update(id, &update).await
    }

    async fn apply(&self, id: UserId, update: &UserUpdate) -> Result<(), StoreError> {
        if update.is_empty() {
            return Ok(());
        }
        self.apply_update(id, update).await
    }

    async fn count_where(&self, filter: UserFilter) -> Result<u64, StoreError> {
        Users::find()
            .filter(Self::condition(filter))
            .count(&self.db)
            .await
            .map_err(db_err)
    }

    async fn top_n(
        &self,
        order_by: UserField,
        n: u64,
        filter: Option<UserFilter>,
    ) -> Result<Vec<UserRecord>, StoreError> {
        if !order_by.is_counter() {
            return Err(StoreError::NotACounter(order_by));
        }

        let mut query = Users::find();
        if let Some(filter) = filter {
            query = query.filter(Self::condition(filter));
        }

        let users = query
            .order_by_desc(Self::column_for(order_by)?)
            .order_by_asc(users::Column::Id)
            .limit(n)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        Ok(users.into_iter().map(Self::model_to_user).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::connect_to_memory_database;
    use chrono::{NaiveDate, TimeZone};
    use migration::{Migrator, MigratorTrait};

    async fn setup_test_db() -> UserRepository {
        let db = connect_to_memory_database().await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        UserRepository::new(db)
    }

    fn profile(username: &str) -> UserPatch {
        UserPatch::new().set(UserField::Username, FieldValue::Text(username.to_string()))
    }

    #[tokio::test]
    async fn test_upsert_creates_then_updates() {
        let repo = setup_test_db().await;

        let first = repo.upsert_user(1001, &profile("zenith")).await.unwrap();
        assert!(first.created);
        assert_eq!(first.record.username, "zenith");
        assert_eq!(first.record.referral_code, "ref_1001");
        assert_eq!(first.record.upgrades, UpgradeLevels::default());

        let second = repo.upsert_user(1001, &profile("zen")).await.unwrap();
        assert!(!second.created);
        assert_eq!(second.record.username, "zen");

        let found = repo.get_user(1001).await.unwrap().unwrap();
        assert_eq!(found.username, "zen");
        assert!(repo.get_user(1002).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upsert_without_referrer_keeps_existing_one() {
        let repo = setup_test_db().await;
        repo.upsert_user(1, &UserPatch::new()).await.unwrap();

        let with_referrer = profile("newbie").set(UserField::ReferredBy, FieldValue::UserRef(Some(1)));
        repo.upsert_user(2, &with_referrer).await.unwrap();

        let outcome = repo.upsert_user(2, &profile("renamed")).await.unwrap();
        assert_eq!(outcome.record.referred_by, Some(1));
    }

    #[tokio::test]
    async fn test_increment_is_relative() {
        let repo = setup_test_db().await;
        repo.upsert_user(7, &UserPatch::new()).await.unwrap();

        assert_eq!(repo.increment(7, UserField::Balance, 120).await.unwrap(), 120);
        assert_eq!(repo.increment(7, UserField::Balance, -20).await.unwrap(), 100);
        assert_eq!(repo.increment(7, UserField::MythicCards, 1).await.unwrap(), 1);

        assert_eq!(
            repo.increment(7, UserField::TapsResetDate, 1).await,
            Err(StoreError::NotACounter(UserField::TapsResetDate))
        );
        assert_eq!(
            repo.increment(8, UserField::Balance, 1).await,
            Err(StoreError::NotFound(8))
        );
    }

    #[tokio::test]
    async fn test_apply_combines_increment_and_fields() {
        let repo = setup_test_db().await;
        repo.upsert_user(7, &UserPatch::new()).await.unwrap();

        let next_claim = Utc.with_ymd_and_hms(2024, 7, 15, 12, 0, 0).unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 7, 15).unwrap();
        let mut update = UserUpdate::default();
        update.increments.insert(UserField::Balance, 300);
        update
            .patch
            .insert(UserField::NextFaucetClaimAt, FieldValue::Timestamp(Some(next_claim)));
        update
            .patch
            .insert(UserField::TapsResetDate, FieldValue::Date(Some(today)));
        update.patch.insert(
            UserField::UpgradeLevel(UpgradeId::TapPower),
            FieldValue::Int(2),
        );
        update
            .patch
            .insert(UserField::TaskDone(TaskKind::FollowX), FieldValue::Flag(true));

        repo.apply(7, &update).await.unwrap();

        let user = repo.get_user(7).await.unwrap().unwrap();
        assert_eq!(user.balance, 300);
        assert_eq!(user.next_faucet_claim_at, Some(next_claim));
        assert_eq!(user.taps_reset_date, Some(today));
        assert_eq!(user.upgrades.tap_power, 2);
        assert!(user.tasks.follow_x_done);
    }

    #[tokio::test]
    async fn test_update_rejects_mismatched_values() {
        let repo = setup_test_db().await;
        repo.upsert_user(7, &UserPatch::new()).await.unwrap();

        let patch = UserPatch::new().set(UserField::Balance, FieldValue::Flag(true));
        assert_eq!(
            repo.update_fields(7, &patch).await,
            Err(StoreError::TypeMismatch(UserField::Balance))
        );

        let patch = UserPatch::new().set(
            UserField::UpgradeLevel(UpgradeId::FaucetRate),
            FieldValue::Int(0),
        );
        assert!(repo.update_fields(7, &patch).await.is_err());
    }

    #[tokio::test]
    async fn test_count_where() {
        let repo = setup_test_db().await;
        repo.upsert_user(1, &UserPatch::new()).await.unwrap();
        for id in 2..=4 {
            let patch = UserPatch::new().set(UserField::ReferredBy, FieldValue::UserRef(Some(1)));
            repo.upsert_user(id, &patch).await.unwrap();
            repo.increment(id, UserField::Balance, id * 100).await.unwrap();
        }

        assert_eq!(repo.count_where(UserFilter::ReferredBy(1)).await.unwrap(), 3);
        assert_eq!(repo.count_where(UserFilter::ReferredBy(2)).await.unwrap(), 0);
        assert_eq!(repo.count_where(UserFilter::BalanceAbove(250)).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_top_n_orders_by_balance() {
        let repo = setup_test_db().await;

        // Create 5 users
        for i in 1..=5 {
            repo.upsert_user(i, &profile(&format!("user{}", i))).await.unwrap();
            repo.increment(i, UserField::Balance, i * 10).await.unwrap();
        }

        // Get top 3
        let top = repo.top_n(UserField::Balance, 3, None).await.unwrap();
        assert_eq!(top.len(), 3);

        // Should be in descending order by balance
        assert_eq!(top[0].balance, 50);
        assert_eq!(top[1].balance, 40);
        assert_eq!(top[2].balance, 30);

        let filtered = repo
            .top_n(UserField::Balance, 10, Some(UserFilter::BalanceAbove(35)))
            .await
            .unwrap();
        assert_eq!(filtered.len(), 2);
    }
}
