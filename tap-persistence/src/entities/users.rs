use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub balance: i64,
    #[sea_orm(unique)]
    pub referral_code: String,
    pub referred_by: Option<i64>,
    pub referral_rewarded_count: i64,
    pub taps_remaining: i64,
    pub taps_reset_date: Option<Date>,
    pub next_faucet_claim_at: Option<DateTimeWithTimeZone>,
    pub faucet_rate_level: i32,
    pub tap_power_level: i32,
    pub tap_energy_level: i32,
    pub check_in_count: i64,
    pub last_check_in_date: Option<Date>,
    pub spins_free: i64,
    pub spins_ad: i64,
    pub spins_reset_date: Option<Date>,
    pub rare_cards: i64,
    pub epic_cards: i64,
    pub mythic_cards: i64,
    pub ton_milli: i64,
    pub daily_ads_left: i64,
    pub daily_ads_reset_date: Option<Date>,
    pub task_invite3_done: bool,
    pub task_invite5_done: bool,
    pub task_follow_tg_done: bool,
    pub task_follow_x_done: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
