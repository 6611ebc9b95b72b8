//! In-memory record store.

use crate::store::records::{BlockList, KeyTable, VisitLog, VisitRecord};
use crate::store::RecordStore;
use crate::GateError;
use std::sync::{Mutex, MutexGuard};

/// Record store that keeps every collection in memory.
///
/// Same contract as [`FileStore`](crate::store::FileStore) minus durability.
#[derive(Debug, Default)]
pub struct MemoryStore {
    keys: Mutex<KeyTable>,
    ips: Mutex<BlockList>,
    visits: Mutex<VisitLog>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with keys.
    pub fn with_keys(table: KeyTable) -> Self {
        Self {
            keys: Mutex::new(table),
            ..Self::default()
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl RecordStore for MemoryStore {
    fn load_keys(&self) -> KeyTable {
        lock(&self.keys).clone()
    }

    fn save_keys(&self, table: &KeyTable) -> Result<(), GateError> {
        *lock(&self.keys) = table.clone();
        Ok(())
    }

    fn update_keys(
        &self,
        apply: &mut dyn FnMut(&mut KeyTable) -> bool,
    ) -> Result<bool, GateError> {
        let mut keys = lock(&self.keys);
        // Mutate a copy so an unchanged cycle leaves the stored table untouched.
        let mut table = keys.clone();
        let changed = apply(&mut table);
        if changed {
            *keys = table;
        }
        Ok(changed)
    }

    fn is_blocked(&self, ip: &str) -> bool {
        lock(&self.ips).blocked_ips.iter().any(|blocked| blocked == ip)
    }

    fn block_ip(&self, ip: &str) -> Result<(), GateError> {
        let mut list = lock(&self.ips);
        if !list.blocked_ips.iter().any(|blocked| blocked == ip) {
            list.blocked_ips.push(ip.to_string());
        }
        Ok(())
    }

    fn blocked_ips(&self) -> Vec<String> {
        lock(&self.ips).blocked_ips.clone()
    }

    fn append_visit(&self, visit: VisitRecord) -> Result<(), GateError> {
        lock(&self.visits).visits.push(visit);
        Ok(())
    }

    fn visits(&self) -> Vec<VisitRecord> {
        lock(&self.visits).visits.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::records::KeyRecord;

    #[test]
    fn test_memory_store_blocklist() {
        let store = MemoryStore::new();
        assert!(!store.is_blocked("1.2.3.4"));
        store.block_ip("1.2.3.4").unwrap();
        store.block_ip("1.2.3.4").unwrap();
        assert!(store.is_blocked("1.2.3.4"));
        assert_eq!(store.blocked_ips().len(), 1);
    }

    #[test]
    fn test_memory_store_update_keys() {
        let mut table = KeyTable::default();
        table.keys.insert("k".to_string(), KeyRecord::active());
        let store = MemoryStore::with_keys(table);

        let changed = store
            .update_keys(&mut |t: &mut KeyTable| {
                if let Some(record) = t.keys.get_mut("k") {
                    record.active = false;
                }
                false
            })
            .unwrap();

        // Unreported changes are discarded.
        assert!(!changed);
        assert!(store.load_keys().is_active("k"));
    }
}
