use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tap_types::UserRecord;

/// In-memory copy of the user record that every sub-mechanism reads and
/// mutates. Closures run under the lock and must not block.
#[derive(Debug, Clone)]
pub struct UserMirror {
    record: Arc<Mutex<UserRecord>>,
}

impl UserMirror {
    pub fn new(record: UserRecord) -> Self {
        Self {
            record: Arc::new(Mutex::new(record)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, UserRecord> {
        self.record.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> UserRecord {
        self.lock().clone()
    }

    pub fn read<T>(&self, f: impl FnOnce(&UserRecord) -> T) -> T {
        f(&self.lock())
    }

    pub fn update<T>(&self, f: impl FnOnce(&mut UserRecord) -> T) -> T {
        f(&mut self.lock())
    }

    pub fn balance(&self) -> i64 {
        self.lock().balance
    }

    pub fn taps_remaining(&self) -> i64 {
        self.lock().taps_remaining
    }
}
