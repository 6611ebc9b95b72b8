//! HTTP client layer for the upstream data API.

pub mod http;

pub use http::UpstreamClient;
