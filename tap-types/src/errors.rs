use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

use crate::{SpinKind, UpgradeId};

/// Errors surfaced to the presentation layer. Transport errors are converted
/// into `PersistenceFailure` before they get here.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum RewardError {
    #[error("no platform identity available")]
    IdentityUnavailable,
    #[error("this action needs a signed-in user")]
    NotAuthenticated,
    #[error("could not save progress: {message}")]
    PersistenceFailure { message: String },
    #[error("insufficient balance: need {required}, have {available}")]
    InsufficientBalance { required: i64, available: i64 },
    #[error("{upgrade} is already at its maximum level")]
    MaxLevelReached { upgrade: UpgradeId },
    #[error("already claimed today")]
    AlreadyClaimedToday,
    #[error("faucet not ready, {seconds_remaining}s remaining")]
    FaucetNotReady { seconds_remaining: i64 },
    #[error("faucet has not been started")]
    FaucetInactive,
    #[error("no {kind:?} spins left today")]
    NoSpinsLeft { kind: SpinKind },
    #[error("no taps left today")]
    NoTapsLeft,
    #[error("task already completed")]
    TaskAlreadyCompleted,
    #[error("task requirement not met: {have}/{need}")]
    TaskRequirementNotMet { have: i64, need: i64 },
    #[error("daily limit reached")]
    DailyLimitReached,
}

impl RewardError {
    /// Whether the user can reasonably retry the same action right away.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RewardError::PersistenceFailure { .. })
    }
}
