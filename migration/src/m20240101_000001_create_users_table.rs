use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

fn counter(column: Users, default: i64) -> ColumnDef {
    ColumnDef::new(column)
        .big_integer()
        .not_null()
        .default(default)
        .to_owned()
}

fn flag(column: Users) -> ColumnDef {
    ColumnDef::new(column)
        .boolean()
        .not_null()
        .default(false)
        .to_owned()
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Id)
                            .big_integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Users::Username).string().not_null().default(""))
                    .col(ColumnDef::new(Users::FirstName).string().not_null().default(""))
                    .col(ColumnDef::new(Users::LastName).string().not_null().default(""))
                    .col(counter(Users::Balance, 0))
                    .col(
                        ColumnDef::new(Users::ReferralCode)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Users::ReferredBy).big_integer().null())
                    .col(counter(Users::ReferralRewardedCount, 0))
                    .col(counter(Users::TapsRemaining, 0))
                    .col(ColumnDef::new(Users::TapsResetDate).date().null())
                    .col(
                        ColumnDef::new(Users::NextFaucetClaimAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Users::FaucetRateLevel)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(
                        ColumnDef::new(Users::TapPowerLevel)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(
                        ColumnDef::new(Users::TapEnergyLevel)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(counter(Users::CheckInCount, 0))
                    .col(ColumnDef::new(Users::LastCheckInDate).date().null())
                    .col(counter(Users::SpinsFree, 0))
                    .col(counter(Users::SpinsAd, 0))
                    .col(ColumnDef::new(Users::SpinsResetDate).date().null())
                    .col(counter(Users::RareCards, 0))
                    .col(counter(Users::EpicCards, 0))
                    .col(counter(Users::MythicCards, 0))
                    .col(counter(Users::TonMilli, 0))
                    .col(counter(Users::DailyAdsLeft, 0))
                    .col(ColumnDef::new(Users::DailyAdsResetDate).date().null())
                    .col(flag(Users::TaskInvite3Done))
                    .col(flag(Users::TaskInvite5Done))
                    .col(flag(Users::TaskFollowTgDone))
                    .col(flag(Users::TaskFollowXDone))
                    .col(
                        ColumnDef::new(Users::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Users::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Leaderboard ordering and rank counts
        manager
            .create_index(
                Index::create()
                    .name("idx_users_balance")
                    .table(Users::Table)
                    .col(Users::Balance)
                    .to_owned(),
            )
            .await?;

        // Referral counts
        manager
            .create_index(
                Index::create()
                    .name("idx_users_referred_by")
                    .table(Users::Table)
                    .col(Users::ReferredBy)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Username,
    FirstName,
    LastName,
    Balance,
    ReferralCode,
    ReferredBy,
    ReferralRewardedCount,
    TapsRemaining,
    TapsResetDate,
    NextFaucetClaimAt,
    FaucetRateLevel,
    TapPowerLevel,
    TapEnergyLevel,
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
    #[sea_orm(iden = "task_invite3_done")]
    TaskInvite3Done,
    #[sea_orm(iden = "task_invite5_done")]
    TaskInvite5Done,
    TaskFollowTgDone,
    TaskFollowXDone,
    CreatedAt,
    UpdatedAt,
}
