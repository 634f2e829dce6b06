//! HTTP API layer.
//!
//! One endpoint per pipeline stage plus health and history. Routes are
//! nested under `/api/` and protected by a middleware stack:
//! Rate Limit → Auth → Handler. `/health` stays open.
//!
//! The router is composable — `api_router()` returns a `Router` that can
//! be mounted on any axum server instance.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod types;

pub use router::api_router;
pub use types::ApiContext;
