use tap_types::{RewardError, UpgradeId, UpgradeLevels};

/// Static definition of an upgrade track.
///
/// `costs[level - 1]` is the price of going from `level` to `level + 1`;
/// `benefits[level - 1]` is what the upgrade yields while at `level`.
#[derive(Debug)]
pub struct UpgradeDefinition {
    pub id: UpgradeId,
    pub name: &'static str,
    pub description: &'static str,
    pub max_level: u32,
    pub costs: &'static [i64],
    pub benefits: &'static [i64],
    pub benefit_unit: &'static str,
}

pub static UPGRADES: [UpgradeDefinition; 3] = [
    UpgradeDefinition {
        id: UpgradeId::FaucetRate,
        name: "Faucet Rate",
        description: "Increase the amount of RIBS you earn from the faucet.",
        max_level: 10,
        costs: &[2500, 5000, 7500, 10000, 12500, 15000, 17500, 20000, 22500],
        benefits: &[300, 350, 400, 450, 500, 550, 600, 650, 700, 750],
        benefit_unit: "RIBS/2hr",
    },
    UpgradeDefinition {
        id: UpgradeId::TapPower,
        name: "Tap Power",
        description: "Increase the amount of RIBS you earn per tap.",
        max_level: 3,
        costs: &[3000, 6000],
        benefits: &[1, 5, 10],
        benefit_unit: "RIBS/tap",
    },
    UpgradeDefinition {
        id: UpgradeId::TapEnergy,
        name: "Tap Energy",
        description: "Increase your maximum daily tap limit.",
        max_level: 3,
        costs: &[5000, 10000],
        benefits: &[1000, 2000, 3000],
        benefit_unit: "Taps",
    },
];

impl UpgradeDefinition {
    pub fn get(id: UpgradeId) -> &'static UpgradeDefinition {
        match id {
            UpgradeId::FaucetRate => &UPGRADES[0],
            UpgradeId::TapPower => &UPGRADES[1],
            UpgradeId::TapEnergy => &UPGRADES[2],
        }
    }

    /// Price to move up from `level`, or `None` at the cap.
    pub fn cost_at(&self, level: u32) -> Option<i64> {
        if level == 0 || level >= self.max_level {
            return None;
        }
        self.costs.get(level as usize - 1).copied()
    }

    /// Benefit at `level`, clamped into the defined range.
    pub fn benefit_at(&self, level: u32) -> i64 {
        let index = (level.max(1) as usize - 1).min(self.benefits.len() - 1);
        self.benefits[index]
    }

    pub fn benefit_label(&self, level: u32) -> String {
        format!("+{} {}", self.benefit_at(level), self.benefit_unit)
    }
}

/// Validate a purchase and return its cost. Nothing is mutated.
pub fn check_purchase(
    levels: &UpgradeLevels,
    balance: i64,
    id: UpgradeId,
) -> Result<i64, RewardError> {
    let definition = UpgradeDefinition::get(id);
    let level = levels.get(id);
    let cost = definition
        .cost_at(level)
        .ok_or(RewardError::MaxLevelReached { upgrade: id })?;

    if balance < cost {
        return Err(RewardError::InsufficientBalance {
            required: cost,
            available: balance,
        });
    }

    Ok(cost)
}

/// Daily tap quota implied by the tap-energy level.
pub fn tap_capacity(levels: &UpgradeLevels) -> i64 {
    UpgradeDefinition::get(UpgradeId::TapEnergy).benefit_at(levels.tap_energy)
}

/// Balance gained per accepted tap.
pub fn tap_yield(levels: &UpgradeLevels) -> i64 {
    UpgradeDefinition::get(UpgradeId::TapPower).benefit_at(levels.tap_power)
}

/// Amount credited by one faucet claim.
pub fn faucet_amount(levels: &UpgradeLevels) -> i64 {
    UpgradeDefinition::get(UpgradeId::FaucetRate).benefit_at(levels.faucet_rate)
}
