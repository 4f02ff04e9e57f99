//! HTTP adapter for the payment endpoints.

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::PaymentsAppState;
pub use routes::{payments_router, payments_routes};
