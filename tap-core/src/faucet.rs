use chrono::{DateTime, TimeDelta, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaucetState {
    /// Never started.
    Inactive,
    Armed {
        next_claim_at: DateTime<Utc>,
        remaining: TimeDelta,
    },
    Claimable,
}

impl FaucetState {
    pub fn at(next_claim_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Self {
        match next_claim_at {
            None => FaucetState::Inactive,
            Some(next_claim_at) if now >= next_claim_at => FaucetState::Claimable,
            Some(next_claim_at) => FaucetState::Armed {
                next_claim_at,
                remaining: next_claim_at - now,
            },
        }
    }

    pub fn is_claimable(&self) -> bool {
        matches!(self, FaucetState::Claimable)
    }

    /// Countdown text for display; claimable and inactive show zeros.
    pub fn countdown(&self) -> String {
        match self {
            FaucetState::Armed { remaining, .. } => format_remaining(*remaining),
            _ => format_remaining(TimeDelta::zero()),
        }
    }
}

/// `HH:MM:SS`, never negative.
pub fn format_remaining(remaining: TimeDelta) -> String {
    let total = remaining.num_seconds().max(0);
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}
