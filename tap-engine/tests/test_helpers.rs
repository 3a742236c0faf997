#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use tap_core::{EngineEvent, EngineEventBus, EngineEventHandler, ManualClock};
use tap_engine::config::EngineConfig;
use tap_engine::identity::{IdentityProvider, StaticIdentity};
use tap_engine::memory_store::MemoryStore;
use tap_engine::{EngineDeps, TapEngine};
use tap_types::{LaunchContext, PlatformUser, RewardError, UserId, UserRecord};

/// 2024-07-15 10:00:00 UTC
pub fn start_instant() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 7, 15, 10, 0, 0).unwrap()
}

pub fn start_day() -> NaiveDate {
    start_instant().date_naive()
}

/// Defaults, minus the limits that would get in the way of scripted taps.
pub fn test_config() -> EngineConfig {
    EngineConfig {
        identity_timeout: Duration::from_millis(300),
        identity_poll_interval: Duration::from_millis(50),
        tap_rate_burst: 100_000,
        tap_rate_refill: Duration::from_millis(1),
        persist_retry_backoff: Duration::from_millis(10),
        ..EngineConfig::default()
    }
}

pub fn launch(id: UserId) -> LaunchContext {
    LaunchContext::new(PlatformUser {
        id,
        username: Some(format!("player{}", id)),
        first_name: None,
        last_name: None,
    })
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

    pub fn count(&self, check_fn: impl Fn(&EngineEvent) -> bool) -> usize {
        self.events.lock().unwrap().iter().filter(|e| check_fn(e)).count()
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

/// Test setup that provides all necessary components
pub struct TestEngineSetup {
    pub store: MemoryStore,
    pub clock: ManualClock,
    pub events: EventCollector,
    pub config: EngineConfig,
}

impl TestEngineSetup {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            store: MemoryStore::new(),
            clock: ManualClock::new(start_instant()),
            events: EventCollector::new(),
            config,
        }
    }

    pub fn seed(&self, record: UserRecord) {
        self.store.insert(record);
    }

    /// Seed a user whose daily quotas were already refilled today.
    pub fn seed_refilled(&self, mut record: UserRecord) {
        record.taps_remaining = 1000;
        record.taps_reset_date = Some(start_day());
        record.spins_free = 1;
        record.spins_ad = 2;
        record.spins_reset_date = Some(start_day());
        record.tasks.daily_ads_left = 3;
        record.tasks.daily_ads_reset_date = Some(start_day());
        self.store.insert(record);
    }

    pub async fn try_start_with(
        &self,
        identity: &dyn IdentityProvider,
    ) -> Result<TapEngine, RewardError> {
        let mut events = EngineEventBus::new();
        events.add_handler(Box::new(self.events.clone()));

        let deps = EngineDeps {
            store: Arc::new(self.store.clone()),
            clock: Arc::new(self.clock.clone()),
            events,
        };
        TapEngine::start(&self.config, identity, deps).await
    }

    pub async fn start_with(&self, identity: &dyn IdentityProvider) -> TapEngine {
        self.try_start_with(identity)
            .await
            .expect("engine should start")
    }

    pub async fn start(&self, context: Option<LaunchContext>) -> TapEngine {
        let identity = match context {
            Some(context) => StaticIdentity::new(context),
            None => StaticIdentity::none(),
        };
        self.start_with(&identity).await
    }

    pub async fn start_user(&self, id: UserId) -> TapEngine {
        self.start(Some(launch(id))).await
    }

    pub fn stored(&self, id: UserId) -> UserRecord {
        self.store.record(id).expect("user should be stored")
    }
}

/// Let spawned tasks run without moving the clock.
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}
