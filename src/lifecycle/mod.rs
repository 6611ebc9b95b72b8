//! Key lifecycle: duration materialization and expiry.

pub mod monitor;

pub use monitor::{apply_expiry, KeyMonitor, TickReport};
