#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use std::sync::{Arc, Mutex};
use tap_core::{EngineEvent, EngineEventHandler, ManualClock};
use tap_types::{UserId, UserRecord};

/// 2024-07-15 10:00:00 UTC
pub fn start_instant() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 7, 15, 10, 0, 0).unwrap()
}

pub fn create_test_clock() -> ManualClock {
    ManualClock::new(start_instant())
}

/// Creates a user record with the given balance
pub fn create_test_user(id: UserId, balance: i64) -> UserRecord {
    let mut record = UserRecord::new(id, start_instant());
    record.username = format!("player{}", id);
    record.balance = balance;
    record
}

/// Event collector for testing event emissions
#[derive(Clone)]
pub struct EventCollector {
    events: Arc<Mutex<Vec<EngineEvent>>>,
}

impl EventCollector {
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn get_events(&self) -> Vec<EngineEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn event_count(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    pub fn has_event_type(&self, check_fn: impl Fn(&EngineEvent) -> bool) -> bool {
        self.events.lock().unwrap().iter().any(check_fn)
    }
}

impl EngineEventHandler for EventCollector {
    fn handle_event(&mut self, event: EngineEvent) {
        self.events.lock().unwrap().push(event);
    }
}
