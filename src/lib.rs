//! # Keygate
//!
//! **Key-gated HTTP relay with User-Agent admission filtering.**
//!
//! Keygate sits in front of a single upstream data API. Callers present an
//! API key; keygate checks it against a key table, filters traffic by IP
//! blocklist and User-Agent heuristics, logs every visitor, and relays valid
//! requests upstream.
//!
//! ## Request pipeline
//!
//! 1. **Visit logging** — IP, geolocation, device class and browser label
//!    are appended to the visit log for every request
//! 2. **IP blocklist** — blocked IPs get `403`
//! 3. **User-Agent policy** — known automation tools get `403` and their IP
//!    is blocked permanently; empty or unfamiliar agents are logged and admitted
//! 4. **Key validation** — `GET /dvm7api/player?uid=&region=&key=` requires an
//!    active key before the upstream is called
//!
//! A background [`KeyMonitor`] turns key durations into expiry deadlines and
//! deactivates keys once their deadline passes.
//!
//! ## Quickstart
//!
//! ```no_run
//! use keygate::{GateConfig, GateError};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), GateError> {
//!     let config = GateConfig {
//!         upstream_url: Some("https://upstream.example/api".to_string()),
//!         ..GateConfig::default()
//!     };
//!     keygate::server::serve(config).await
//! }
//! ```
//!
//! ## Storage
//!
//! State lives behind the [`RecordStore`] trait. [`FileStore`] keeps three
//! JSON files in a data directory; [`MemoryStore`] keeps them in memory.
//! Unreadable data loads as empty rather than failing requests, and a
//! write never replaces a file it could not parse.

#![deny(warnings)]
#![deny(missing_docs)]

// Core modules
pub mod clock;
pub mod config;
pub mod errors;

// Storage layer
pub mod store;

// Visitor classification
pub mod visitor;

// Admission layer
pub mod admission;

// Key lifecycle
pub mod lifecycle;

// Client layer
pub mod client;

// Forwarding layer
pub mod forward;

// HTTP server
pub mod server;

// Re-exports for public API
pub use clock::{Clock, SystemClock};
pub use config::GateConfig;
pub use errors::GateError;
pub use lifecycle::KeyMonitor;
pub use server::{router, AppState};
pub use store::{FileStore, KeyRecord, KeyTable, MemoryStore, RecordStore, VisitRecord};

#[cfg(any(test, feature = "test-seams"))]
pub use clock::MockClock;
