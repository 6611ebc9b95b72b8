//! Key lifecycle monitor.
//!
//! Each cycle, for every active key:
//! - a `duration` without `expires_at` is materialized once into
//!   `expires_at = reference_now + duration`;
//! - a key past its `expires_at` is deactivated.
//!
//! Deactivation is permanent; the monitor never re-activates a key.

use crate::clock::{reference_seconds, Clock, SystemClock};
use crate::store::records::{key_fingerprint, KeyTable};
use crate::store::RecordStore;
use crate::GateError;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// What one monitor cycle changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Keys that received an `expires_at` this cycle.
    pub materialized: usize,
    /// Keys deactivated this cycle.
    pub expired: usize,
}

impl TickReport {
    /// Whether the key table was modified.
    pub fn changed(&self) -> bool {
        self.materialized > 0 || self.expired > 0
    }
}

/// Apply one expiration pass to `table` at reference time `now`.
pub fn apply_expiry(table: &mut KeyTable, now: f64) -> TickReport {
    let mut report = TickReport::default();

    for (key, record) in table.keys.iter_mut() {
        if !record.active {
            continue;
        }

        if let (Some(duration), None) = (record.duration, record.expires_at) {
            record.expires_at = Some(now + duration as f64);
            report.materialized += 1;
            tracing::debug!(key_id = %key_fingerprint(key), duration, "expiry scheduled");
        }

        if let Some(expires_at) = record.expires_at {
            if now > expires_at {
                record.active = false;
                report.expired += 1;
                tracing::info!(key_id = %key_fingerprint(key), "key expired");
            }
        }
    }

    report
}

/// Background task that expires keys on a fixed interval.
pub struct KeyMonitor {
    store: Arc<dyn RecordStore>,
    clock: Arc<dyn Clock>,
    interval: Duration,
    reference_offset_secs: i64,
}

impl KeyMonitor {
    /// Create a monitor using the system clock.
    pub fn new(store: Arc<dyn RecordStore>, interval: Duration, reference_offset_secs: i64) -> Self {
        Self::with_clock(store, Arc::new(SystemClock), interval, reference_offset_secs)
    }

    /// Create a monitor with a custom clock.
    pub fn with_clock(
        store: Arc<dyn RecordStore>,
        clock: Arc<dyn Clock>,
        interval: Duration,
        reference_offset_secs: i64,
    ) -> Self {
        Self {
            store,
            clock,
            interval,
            reference_offset_secs,
        }
    }

    /// Run one cycle. The key table is saved at most once, and only if a
    /// record changed.
    pub fn tick(&self) -> Result<TickReport, GateError> {
        let now = reference_seconds(self.clock.as_ref(), self.reference_offset_secs);
        let mut report = TickReport::default();

        self.store.update_keys(&mut |table: &mut KeyTable| {
            report = apply_expiry(table, now);
            report.changed()
        })?;

        Ok(report)
    }

    /// Run cycles forever on the configured interval.
    ///
    /// Each cycle runs on the blocking pool. A failed cycle is logged and
    /// the loop continues.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let monitor = Arc::new(self);

        loop {
            ticker.tick().await;
            let cycle = Arc::clone(&monitor);
            let outcome = tokio::task::spawn_blocking(move || cycle.tick())
                .await
                .map_err(|e| GateError::StoreIO(format!("Monitor task panicked: {}", e)))
                .and_then(|result| result);
            match outcome {
                Ok(report) if report.changed() => {
                    tracing::debug!(
                        materialized = report.materialized,
                        expired = report.expired,
                        "key table updated"
                    );
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = %e, "key monitor cycle failed"),
            }
        }
    }

    /// Spawn [`run`](Self::run) on the current Tokio runtime.
    pub fn spawn(self) -> JoinHandle<()> {
        tracing::info!(interval_ms = self.interval.as_millis() as u64, "key monitor started");
        tokio::spawn(self.run())
    }
}
