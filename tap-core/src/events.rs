use chrono::{DateTime, Utc};
use tap_types::{SpinKind, SpinReward, TaskKind, UpgradeId, UserId};

use crate::{DailyQuota, MutationId};

#[derive(Debug, Clone)]
pub enum EngineEvent {
    SessionStarted {
        user_id: UserId,
        created: bool,
    },
    QuotaRefilled {
        user_id: UserId,
        quota: DailyQuota,
    },
    TapsFlushed {
        user_id: UserId,
        amount: i64,
        taps_remaining: i64,
    },
    TapFlushFailed {
        user_id: UserId,
        amount: i64,
        reason: String,
    },
    FaucetActivated {
        user_id: UserId,
        next_claim_at: DateTime<Utc>,
    },
    FaucetClaimed {
        user_id: UserId,
        amount: i64,
        next_claim_at: DateTime<Utc>,
    },
    CheckedIn {
        user_id: UserId,
        reward: i64,
        streak: i64,
    },
    UpgradePurchased {
        user_id: UserId,
        upgrade: UpgradeId,
        level: u32,
        cost: i64,
    },
    MutationRolledBack {
        user_id: UserId,
        mutation_id: MutationId,
        label: &'static str,
        reason: String,
    },
    SpinResolved {
        user_id: UserId,
        kind: SpinKind,
        segment: usize,
        reward: SpinReward,
    },
    SpinRewardSaved {
        user_id: UserId,
        reward: SpinReward,
    },
    ReferralsCredited {
        user_id: UserId,
        new_referrals: i64,
        bonus: i64,
    },
    TaskCompleted {
        user_id: UserId,
        task: TaskKind,
        reward: i64,
    },
}

impl EngineEvent {
    pub fn user_id(&self) -> UserId {
        match self {
            EngineEvent::SessionStarted { user_id, .. } => *user_id,
            EngineEvent::QuotaRefilled { user_id, .. } => *user_id,
            EngineEvent::TapsFlushed { user_id, .. } => *user_id,
            EngineEvent::TapFlushFailed { user_id, .. } => *user_id,
            EngineEvent::FaucetActivated { user_id, .. } => *user_id,
            EngineEvent::FaucetClaimed { user_id, .. } => *user_id,
            EngineEvent::CheckedIn { user_id, .. } => *user_id,
            EngineEvent::UpgradePurchased { user_id, .. } => *user_id,
            EngineEvent::MutationRolledBack { user_id, .. } => *user_id,
            EngineEvent::SpinResolved { user_id, .. } => *user_id,
            EngineEvent::SpinRewardSaved { user_id, .. } => *user_id,
            EngineEvent::ReferralsCredited { user_id, .. } => *user_id,
            EngineEvent::TaskCompleted { user_id, .. } => *user_id,
        }
    }
}

/// Event handler trait for processing engine events
pub trait EngineEventHandler: Send {
    fn handle_event(&mut self, event: EngineEvent);
}

/// Simple event bus for distributing engine events
pub struct EngineEventBus {
    handlers: Vec<Box<dyn EngineEventHandler>>,
}

impl EngineEventBus {
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    pub fn add_handler(&mut self, handler: Box<dyn EngineEventHandler>) {
        self.handlers.push(handler);
    }

    pub fn publish(&mut self, event: EngineEvent) {
        tracing::debug!("Publishing {:?}", event);
        for handler in &mut self.handlers {
            handler.handle_event(event.clone());
        }
    }
}

impl Default for EngineEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct TestHandler {
        events: Arc<Mutex<Vec<EngineEvent>>>,
    }

    impl EngineEventHandler for TestHandler {
        fn handle_event(&mut self, event: EngineEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    #[test]
    fn test_event_bus() {
        let mut bus = EngineEventBus::new();
        let events = Arc::new(Mutex::new(Vec::new()));

        bus.add_handler(Box::new(TestHandler {
            events: events.clone(),
        }));
        bus.publish(EngineEvent::TapsFlushed {
            user_id: 9,
            amount: 12,
            taps_remaining: 988,
        });

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].user_id(), 9);
    }
}
