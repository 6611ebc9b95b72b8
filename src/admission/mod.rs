//! Request admission: visit logging, IP blocklist and User-Agent policy.

pub mod middleware;
pub mod policy;

pub use middleware::admission_middleware;
pub use policy::{inspect_agent, AgentVerdict};
