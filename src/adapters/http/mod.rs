//! HTTP adapters - REST API implementations.

pub mod payments;

pub use payments::{payments_router, PaymentsAppState};

/// GET /health - liveness probe.
pub async fn health() -> &'static str {
    "ok"
}
