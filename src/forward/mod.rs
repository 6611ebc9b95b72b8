//! Forwarding: key validation and upstream relay.

pub mod handler;

pub use handler::{player, validate_request, PlayerQuery, PlayerRequest, PlayerResponse};
