//! HTTP host exposing a provider over JSON content.
//!
//! - [`api`]: Route handlers, request/response types, router construction
//! - [`streaming`]: SSE streaming of mount notifications
//! - [`metrics`]: Prometheus registry and counters

pub mod api;
pub mod metrics;
pub mod streaming;
