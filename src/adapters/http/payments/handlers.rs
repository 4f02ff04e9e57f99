//! HTTP handlers for the payment endpoints.
//!
//! These connect axum routes to the application handlers and the callback
//! processor. Gateway deliveries (callback, webhook) are verified and
//! normalized by the gateway adapters before they reach the domain.

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;

use axum::extract::{Form, Json, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::adapters::hosted_checkout::HostedCheckoutAdapter;
use crate::adapters::xpay::XPayAdapter;
use crate::application::handlers::payment::{
    OpenSessionCommand, OpenSessionHandler, OpenSessionResult, ProcessPaymentCommand,
    ProcessPaymentHandler,
};
use crate::domain::foundation::{BookingId, Currency, GatewayTransactionId, MinorUnits};
use crate::domain::payment::{CallbackProcessor, PaymentError, TransactionRegistry};
use crate::ports::{AuditLog, CheckoutGatewayClient, FieldsGatewayClient, PaymentSessionRepository};

use super::dto::{
    ErrorResponse, GatewayParamResponse, OpenSessionRequest, OpenSessionResponse,
    ProcessPaymentRequest, ProcessPaymentResponse,
};

/// Shared application state for the payment routes.
///
/// Cloned per request; all dependencies are Arc-wrapped.
#[derive(Clone)]
pub struct PaymentsAppState {
    pub registry: Arc<TransactionRegistry>,
    pub sessions: Arc<dyn PaymentSessionRepository>,
    pub audit: Arc<dyn AuditLog>,
    pub processor: Arc<CallbackProcessor>,
    pub xpay: Arc<XPayAdapter>,
    pub fields_gateway: Arc<dyn FieldsGatewayClient>,
    pub checkout: Arc<dyn CheckoutGatewayClient>,
    pub hosted_checkout: Arc<HostedCheckoutAdapter>,
    pub checkout_return_url: String,
}

impl PaymentsAppState {
    fn open_session_handler(&self) -> OpenSessionHandler {
        OpenSessionHandler::new(
            self.registry.clone(),
            self.sessions.clone(),
            self.xpay.clone(),
            self.checkout.clone(),
            self.checkout_return_url.clone(),
        )
    }

    fn process_payment_handler(&self) -> ProcessPaymentHandler {
        ProcessPaymentHandler::new(
            self.sessions.clone(),
            self.audit.clone(),
            self.fields_gateway.clone(),
        )
    }
}

/// POST /api/payments/session - open a payment session for a booking.
pub async fn open_session(
    State(state): State<PaymentsAppState>,
    Json(request): Json<OpenSessionRequest>,
) -> Result<impl IntoResponse, PaymentsApiError> {
    let booking_id = BookingId::from_str(&request.booking_id)
        .map_err(|e| PaymentError::input("bookingId", e.to_string()))?;
    let currency = Currency::new(request.currency)
        .map_err(|e| PaymentError::input("currency", e.to_string()))?;

    let handler = state.open_session_handler();
    let cmd = OpenSessionCommand {
        booking_id,
        details: request.booking_details.into(),
        submitted_amount: MinorUnits::new(request.total_amount),
        currency,
        payer_email: request.payer_email,
        payer_name: request.payer_name,
        flow: request.flow.into(),
    };

    let result = handler.handle(cmd).await?;

    let response = match result {
        OpenSessionResult::HostedFields {
            transaction_id,
            endpoint_url,
            gateway_params,
        } => OpenSessionResponse::HostedFields {
            transaction_id,
            endpoint_url,
            gateway_params: gateway_params
                .into_iter()
                .map(|(name, value)| GatewayParamResponse { name, value })
                .collect(),
        },
        OpenSessionResult::HostedCheckout {
            transaction_id,
            redirect_url,
        } => OpenSessionResponse::HostedCheckout {
            transaction_id,
            redirect_url,
        },
    };

    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /api/payments/process - submit the tokenized hosted-fields payment.
pub async fn process_payment(
    State(state): State<PaymentsAppState>,
    Json(request): Json<ProcessPaymentRequest>,
) -> Result<impl IntoResponse, PaymentsApiError> {
    let transaction_id = GatewayTransactionId::new(request.transaction_id)
        .map_err(|e| PaymentError::input("transactionId", e.to_string()))?;

    let handler = state.process_payment_handler();
    let result = handler
        .handle(ProcessPaymentCommand {
            transaction_id,
            payment_token: request.payment_token,
        })
        .await?;

    Ok(Json(ProcessPaymentResponse::from(result)))
}

/// POST /api/payments/callbacks/xpay - hosted-fields gateway callback.
///
/// The gateway expects a plain-text `OK` on success and retries on any
/// non-200 reply.
pub async fn xpay_callback(
    State(state): State<PaymentsAppState>,
    Form(form): Form<BTreeMap<String, String>>,
) -> Result<impl IntoResponse, PaymentsApiError> {
    let params = state.xpay.parse_callback(form)?;
    state.processor.process_callback(&params).await?;
    Ok((StatusCode::OK, "OK"))
}

/// POST /api/payments/webhooks/checkout - hosted-checkout gateway webhook.
pub async fn checkout_webhook(
    State(state): State<PaymentsAppState>,
    headers: axum::http::HeaderMap,
    body: axum::body::Bytes,
) -> Result<impl IntoResponse, PaymentsApiError> {
    let signature = headers
        .get("Checkout-Signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            PaymentError::input("Checkout-Signature", "Missing Checkout-Signature header")
        })?;

    let notification = state.hosted_checkout.verify_webhook(&body, signature)?;
    state.processor.process_checkout_webhook(&notification).await?;

    Ok(StatusCode::OK)
}

/// API error type that converts payment errors to HTTP responses.
#[derive(Debug)]
pub struct PaymentsApiError(PaymentError);

impl From<PaymentError> for PaymentsApiError {
    fn from(err: PaymentError) -> Self {
        Self(err)
    }
}

impl From<crate::domain::foundation::DomainError> for PaymentsApiError {
    fn from(err: crate::domain::foundation::DomainError) -> Self {
        Self(PaymentError::from(err))
    }
}

impl IntoResponse for PaymentsApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_code) = match &self.0 {
            PaymentError::InputError { .. } => (StatusCode::BAD_REQUEST, "INVALID_INPUT"),
            PaymentError::AmountMismatch { .. } => (StatusCode::BAD_REQUEST, "AMOUNT_MISMATCH"),
            PaymentError::SessionConflict(_) => (StatusCode::CONFLICT, "SESSION_CONFLICT"),
            PaymentError::SessionNotFound { .. } => (StatusCode::NOT_FOUND, "SESSION_NOT_FOUND"),
            PaymentError::BookingNotFound(_) => (StatusCode::NOT_FOUND, "BOOKING_NOT_FOUND"),
            PaymentError::GatewayUnavailable { .. } => {
                (StatusCode::BAD_GATEWAY, "GATEWAY_UNAVAILABLE")
            }
            PaymentError::Persistence(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let body = ErrorResponse::new(error_code, self.0.message());
        (status, Json(body)).into_response()
    }
}
