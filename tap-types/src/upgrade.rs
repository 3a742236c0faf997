use serde::{Deserialize, Serialize};
use ts_rs::TS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[serde(rename_all = "kebab-case")]
#[ts(export)]
pub enum UpgradeId {
    FaucetRate,
    TapPower,
    TapEnergy,
}

impl UpgradeId {
    pub const ALL: [UpgradeId; 3] = [UpgradeId::FaucetRate, UpgradeId::TapPower, UpgradeId::TapEnergy];

    pub fn as_str(&self) -> &'static str {
        match self {
            UpgradeId::FaucetRate => "faucet-rate",
            UpgradeId::TapPower => "tap-power",
            UpgradeId::TapEnergy => "tap-energy",
        }
    }
}

impl std::fmt::Display for UpgradeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-user upgrade levels. Every upgrade starts at level 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UpgradeLevels {
    pub faucet_rate: u32,
    pub tap_power: u32,
    pub tap_energy: u32,
}

impl Default for UpgradeLevels {
    fn default() -> Self {
        Self {
            faucet_rate: 1,
            tap_power: 1,
            tap_energy: 1,
        }
    }
}

impl UpgradeLevels {
    pub fn get(&self, id: UpgradeId) -> u32 {
        match id {
            UpgradeId::FaucetRate => self.faucet_rate,
            UpgradeId::TapPower => self.tap_power,
            UpgradeId::TapEnergy => self.tap_energy,
        }
    }

    pub fn set(&mut self, id: UpgradeId, level: u32) {
        match id {
            UpgradeId::FaucetRate => self.faucet_rate = level,
            UpgradeId::TapPower => self.tap_power = level,
            UpgradeId::TapEnergy => self.tap_energy = level,
        }
    }
}
