use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tap_core::{
    StoreError, UpsertOutcome, UserField, UserFilter, UserPatch, UserStore, UserUpdate,
};
use tap_types::{UserId, UserRecord};

#[derive(Default)]
struct MemoryInner {
    users: Mutex<BTreeMap<UserId, UserRecord>>,
    unavailable: AtomicBool,
    failing_writes: AtomicUsize,
    writes: AtomicUsize,
    latency: Mutex<Duration>,
}

/// `UserStore` kept in process memory, with switches for outages, failed
/// writes and slow round trips.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn users(&self) -> MutexGuard<'_, BTreeMap<UserId, UserRecord>> {
        self.inner.users.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seed a record directly, bypassing failure injection.
    pub fn insert(&self, record: UserRecord) {
        self.users().insert(record.id, record);
    }

    pub fn record(&self, id: UserId) -> Option<UserRecord> {
        self.users().get(&id).cloned()
    }

    /// Every operation fails until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.inner.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// The next `count` writes fail.
    pub fn fail_next_writes(&self, count: usize) {
        self.inner.failing_writes.store(count, Ordering::SeqCst);
    }

    pub fn set_latency(&self, latency: Duration) {
        *self.inner.latency.lock().unwrap_or_else(PoisonError::into_inner) = latency;
    }

    /// Number of successful writes so far.
    pub fn write_count(&self) -> usize {
        self.inner.writes.load(Ordering::SeqCst)
    }

    async fn round_trip(&self) -> Result<(), StoreError> {
        let latency = *self.inner.latency.lock().unwrap_or_else(PoisonError::into_inner);
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        if self.inner.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("store offline".to_string()));
        }
        Ok(())
    }

    async fn begin_write(&self) -> Result<(), StoreError> {
        self.round_trip().await?;
        let injected = self
            .inner
            .failing_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if injected.is_ok() {
            return Err(StoreError::Unavailable("injected write failure".to_string()));
        }
        Ok(())
    }

    fn commit<T>(
        &self,
        id: UserId,
        change: impl FnOnce(&mut UserRecord) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut users = self.users();
        let current = users.get(&id).ok_or(StoreError::NotFound(id))?;
        // Work on a copy so a rejected change leaves the row untouched
        let mut updated = current.clone();
        let value = change(&mut updated)?;
        users.insert(id, updated);
        self.inner.writes.fetch_add(1, Ordering::SeqCst);
        Ok(value)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn get_user(&self, id: UserId) -> Result<Option<UserRecord>, StoreError> {
        self.round_trip().await?;
        Ok(self.record(id))
    }

    async fn upsert_user(
        &self,
        id: UserId,
        patch: &UserPatch,
    ) -> Result<UpsertOutcome, StoreError> {
        self.begin_write().await?;

        let mut users = self.users();
        let created = !users.contains_key(&id);
        let mut record = users
            .get(&id)
            .cloned()
            .unwrap_or_else(|| UserRecord::new(id, Utc::now()));
        patch.apply_to(&mut record)?;
        users.insert(id, record.clone());
        self.inner.writes.fetch_add(1, Ordering::SeqCst);

        Ok(UpsertOutcome { record, created })
    }

    async fn increment(
        &self,
        id: UserId,
        field: UserField,
        delta: i64,
    ) -> Result<i64, StoreError> {
        self.begin_write().await?;
        self.commit(id, |record| field.add(record, delta))
    }

    async fn update_fields(&self, id: UserId, patch: &UserPatch) -> Result<(), StoreError> {
        self.begin_write().await?;
        self.commit(id, |record| patch.apply_to(record))
    }

    async fn apply(&self, id: UserId, update: &UserUpdate) -> Result<(), StoreError> {
        self.begin_write().await?;
        self.commit(id, |record| update.apply_to(record))
    }

    async fn count_where(&self, filter: UserFilter) -> Result<u64, StoreError> {
        self.round_trip().await?;
        let count = self.users().values().filter(|r| filter.matches(r)).count();
        Ok(count as u64)
    }

    async fn top_n(
        &self,
        order_by: UserField,
        n: u64,
        filter: Option<UserFilter>,
    ) -> Result<Vec<UserRecord>, StoreError> {
        self.round_trip().await?;
        if !order_by.is_counter() {
            return Err(StoreError::NotACounter(order_by));
        }

        let mut rows: Vec<(i64, UserRecord)> = self
            .users()
            .values()
            .filter(|r| filter.is_none_or(|f| f.matches(r)))
            .filter_map(|r| order_by.read(r).as_int().map(|key| (key, r.clone())))
            .collect();
        rows.sort_by(|(a_key, a), (b_key, b)| b_key.cmp(a_key).then(a.id.cmp(&b.id)));

        Ok(rows
            .into_iter()
            .take(usize::try_from(n).unwrap_or(usize::MAX))
            .map(|(_, record)| record)
            .collect())
    }
}
