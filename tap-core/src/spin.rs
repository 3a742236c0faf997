use rand::Rng;
use tap_types::{CardTier, SpinReward};

use crate::UserField;

/// Wheel segments in display order.
pub const STANDARD_WHEEL: [SpinReward; 10] = [
    SpinReward::Ton { milli: 1000 },
    SpinReward::Ribs { amount: 5000 },
    SpinReward::Card { tier: CardTier::Epic },
    SpinReward::TryAgain,
    SpinReward::Ton { milli: 200 },
    SpinReward::Card { tier: CardTier::Rare },
    SpinReward::Ribs { amount: 500 },
    SpinReward::Card { tier: CardTier::Mythic },
    SpinReward::Ton { milli: 200 },
    SpinReward::Ton { milli: 1000 },
];

/// A drawn segment. The presentation layer positions the wheel from
/// `segment`; the reward credited is always `reward`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpinOutcome {
    pub segment: usize,
    pub reward: SpinReward,
}

#[derive(Debug, Clone)]
pub struct SpinWheel {
    segments: Vec<SpinReward>,
}

impl Default for SpinWheel {
    fn default() -> Self {
        Self {
            segments: STANDARD_WHEEL.to_vec(),
        }
    }
}

impl SpinWheel {
    /// `None` for an empty wheel.
    pub fn new(segments: Vec<SpinReward>) -> Option<Self> {
        if segments.is_empty() {
            return None;
        }
        Some(Self { segments })
    }

    pub fn segments(&self) -> &[SpinReward] {
        &self.segments
    }

    /// Pick one segment uniformly. Labels that repeat on the wheel are
    /// proportionally more likely.
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> SpinOutcome {
        let segment = rng.random_range(0..self.segments.len());
        SpinOutcome {
            segment,
            reward: self.segments[segment],
        }
    }
}

/// The counter a reward is credited to, with the amount.
pub fn reward_credit(reward: &SpinReward) -> Option<(UserField, i64)> {
    match reward {
        SpinReward::Ribs { amount } => Some((UserField::Balance, *amount)),
        SpinReward::Ton { milli } => Some((UserField::TonMilli, *milli)),
        SpinReward::Card { tier } => Some(match tier {
            CardTier::Rare => (UserField::RareCards, 1),
            CardTier::Epic => (UserField::EpicCards, 1),
            CardTier::Mythic => (UserField::MythicCards, 1),
        }),
        SpinReward::TryAgain => None,
    }
}
