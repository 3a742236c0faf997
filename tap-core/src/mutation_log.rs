use tap_types::UserRecord;
use uuid::Uuid;

use crate::{FieldValue, StoreError, UserField, UserUpdate};

pub type MutationId = Uuid;

#[derive(Debug, Clone, PartialEq)]
enum LogEntry {
    Set {
        field: UserField,
        previous: FieldValue,
    },
    Add {
        field: UserField,
        delta: i64,
    },
}

/// Record of one optimistic mutation against the in-memory user.
///
/// Each change is applied to the record as it is logged. `revert` undoes the
/// entries in reverse order: plain fields go back to their exact previous
/// value, counters get the logged delta subtracted so that accrual landing in
/// between survives the rollback.
#[derive(Debug, Clone)]
pub struct MutationLog {
    id: MutationId,
    label: &'static str,
    entries: Vec<LogEntry>,
    update: UserUpdate,
}

impl MutationLog {
    pub fn new(label: &'static str) -> Self {
        Self {
            id: Uuid::new_v4(),
            label,
            entries: Vec::new(),
            update: UserUpdate::default(),
        }
    }

    pub fn id(&self) -> MutationId {
        self.id
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Overwrite `field` with `value`.
    pub fn set(
        &mut self,
        record: &mut UserRecord,
        field: UserField,
        value: FieldValue,
    ) -> Result<(), StoreError> {
        let previous = field.read(record);
        field.write(record, value.clone())?;
        self.entries.push(LogEntry::Set { field, previous });
        self.update.patch.insert(field, value);
        Ok(())
    }

    /// Add `delta` to an integer field and return its new value; persisted
    /// as an atomic increment.
    pub fn add(
        &mut self,
        record: &mut UserRecord,
        field: UserField,
        delta: i64,
    ) -> Result<i64, StoreError> {
        let updated = field.add(record, delta)?;
        self.entries.push(LogEntry::Add { field, delta });
        *self.update.increments.entry(field).or_insert(0) += delta;
        Ok(updated)
    }

    /// The remote write that makes this mutation durable.
    pub fn to_update(&self) -> &UserUpdate {
        &self.update
    }

    pub fn revert(&self, record: &mut UserRecord) -> Result<(), StoreError> {
        for entry in self.entries.iter().rev() {
            match entry {
                LogEntry::Set { field, previous } => field.write(record, previous.clone())?,
                LogEntry::Add { field, delta } => {
                    field.add(record, -delta)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tap_types::UpgradeId;

    fn purchase(record: &mut UserRecord, cost: i64) -> MutationLog {
        let mut log = MutationLog::new("purchase");
        let field = UserField::UpgradeLevel(UpgradeId::FaucetRate);
        let level = record.upgrades.faucet_rate as i64;
        log.add(record, UserField::Balance, -cost).unwrap();
        log.set(record, field, FieldValue::Int(level + 1)).unwrap();
        log
    }

    #[test]
    fn test_revert_restores_snapshot() {
        let mut record = UserRecord::new(1, Utc::now());
        record.balance = 3000;
        let before = record.clone();

        let log = purchase(&mut record, 2500);
        assert_eq!(record.balance, 500);
        assert_eq!(record.upgrades.faucet_rate, 2);

        log.revert(&mut record).unwrap();
        assert_eq!(record, before);
    }

    #[test]
    fn test_revert_keeps_concurrent_accrual() {
        let mut record = UserRecord::new(1, Utc::now());
        record.balance = 3000;

        let log = purchase(&mut record, 2500);
        // Taps land while the purchase is in flight
        record.balance += 7;

        log.revert(&mut record).unwrap();
        assert_eq!(record.balance, 3007);
        assert_eq!(record.upgrades.faucet_rate, 1);
    }

    #[test]
    fn test_update_mirrors_logged_changes() {
        let mut record = UserRecord::new(1, Utc::now());
        record.balance = 6000;

        let log = purchase(&mut record, 2500);
        let update = log.to_update();
        assert_eq!(update.increments.get(&UserField::Balance), Some(&-2500));
        assert_eq!(
            update
                .patch
                .get(UserField::UpgradeLevel(UpgradeId::FaucetRate)),
            Some(&FieldValue::Int(2))
        );
    }

    #[test]
    fn test_failed_entry_is_not_logged() {
        let mut record = UserRecord::new(1, Utc::now());
        let mut log = MutationLog::new("bad");
        assert!(
            log.set(&mut record, UserField::Balance, FieldValue::Flag(true))
                .is_err()
        );
        assert!(log.is_empty());
        assert!(log.to_update().is_empty());
    }
}
