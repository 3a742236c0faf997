use serde::{Deserialize, Serialize};
use ts_rs::TS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum CardTier {
    Rare,
    Epic,
    Mythic,
}

/// What a single wheel segment pays out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum SpinReward {
    Ribs { amount: i64 },
    /// Secondary currency, in thousandths of a TON.
    Ton { milli: i64 },
    Card { tier: CardTier },
    TryAgain,
}

impl SpinReward {
    pub fn label(&self) -> String {
        match self {
            SpinReward::Ribs { amount } => format!("{} RIBS", amount),
            SpinReward::Ton { milli } => {
                if milli % 1000 == 0 {
                    format!("{} TON", milli / 1000)
                } else {
                    format!("{} TON", *milli as f64 / 1000.0)
                }
            }
            SpinReward::Card { tier } => match tier {
                CardTier::Rare => "Rare Card".to_string(),
                CardTier::Epic => "Epic Card".to_string(),
                CardTier::Mythic => "Mythic Card".to_string(),
            },
            SpinReward::TryAgain => "Try Again!".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum SpinKind {
    Free,
    Ad,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RewardCollections {
    pub rare_cards: i64,
    pub epic_cards: i64,
    pub mythic_cards: i64,
    pub ton_milli: i64,
}
