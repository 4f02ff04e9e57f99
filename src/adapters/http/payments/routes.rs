//! Axum router configuration for the payment endpoints.

use axum::{routing::post, Router};

use super::handlers::{
    checkout_webhook, open_session, process_payment, xpay_callback, PaymentsAppState,
};

/// Create the payment API router.
///
/// # Routes
///
/// ## Booking UI endpoints
/// - `POST /session` - open a payment session for a booking
/// - `POST /process` - submit the tokenized hosted-fields payment
///
/// ## Gateway endpoints (no auth; MAC / signature verified)
/// - `POST /callbacks/xpay` - hosted-fields gateway result callback
/// - `POST /webhooks/checkout` - hosted-checkout gateway webhook
pub fn payments_routes() -> Router<PaymentsAppState> {
    Router::new()
        .route("/session", post(open_session))
        .route("/process", post(process_payment))
        .route("/callbacks/xpay", post(xpay_callback))
        .route("/webhooks/checkout", post(checkout_webhook))
}

/// Complete payment module router, suitable for nesting at `/api`.
pub fn payments_router() -> Router<PaymentsAppState> {
    Router::new().nest("/payments", payments_routes())
}
