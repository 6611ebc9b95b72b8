//! Record store for keys, blocked IPs and visit logs.
//!
//! Three logically independent collections share one storage boundary.
//! Reads never fail: missing or corrupt data reads as the empty default.
//! Writes replace a whole collection and are serialized per collection,
//! but never overwrite data they could not parse.
//!
//! Store calls are synchronous. Async callers go through [`run_blocking`]
//! so file I/O and collection locks stay off the runtime workers.

pub mod file;
pub mod memory;
pub mod records;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use records::{BlockList, DeviceClass, KeyRecord, KeyTable, VisitLog, VisitRecord};

use crate::GateError;
use std::sync::Arc;

/// Durable state shared by the admission filter, forwarding handler and
/// key lifecycle monitor.
pub trait RecordStore: Send + Sync {
    /// Load the key table; empty on missing or corrupt data.
    fn load_keys(&self) -> KeyTable;

    /// Overwrite the key table.
    fn save_keys(&self, table: &KeyTable) -> Result<(), GateError>;

    /// Load, mutate and save the key table under the key writer lock.
    ///
    /// The closure returns whether it changed anything; the table is only
    /// saved when it did. Returns that flag.
    fn update_keys(&self, apply: &mut dyn FnMut(&mut KeyTable) -> bool)
        -> Result<bool, GateError>;

    /// Whether `ip` is on the blocklist.
    fn is_blocked(&self, ip: &str) -> bool;

    /// Add `ip` to the blocklist. No-op if already present.
    fn block_ip(&self, ip: &str) -> Result<(), GateError>;

    /// Snapshot of the blocklist.
    fn blocked_ips(&self) -> Vec<String>;

    /// Append one entry to the visit log.
    fn append_visit(&self, visit: VisitRecord) -> Result<(), GateError>;

    /// Snapshot of the visit log.
    fn visits(&self) -> Vec<VisitRecord>;
}

/// Run a store call on Tokio's blocking pool.
pub async fn run_blocking<T, F>(store: &Arc<dyn RecordStore>, call: F) -> Result<T, GateError>
where
    F: FnOnce(&dyn RecordStore) -> T + Send + 'static,
    T: Send + 'static,
{
    let store = Arc::clone(store);
    tokio::task::spawn_blocking(move || call(store.as_ref()))
        .await
        .map_err(|e| GateError::StoreIO(format!("Store task panicked: {}", e)))
}
