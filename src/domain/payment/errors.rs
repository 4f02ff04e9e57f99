//! Payment-specific error types.
//!
//! # HTTP Status Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | InputError | 400 |
//! | AmountMismatch | 400 |
//! | SessionConflict | 409 |
//! | SessionNotFound | 404 |
//! | GatewayUnavailable | 502 |
//! | Persistence | 500 |
//!
//! MAC verification failure is deliberately absent from this taxonomy as a
//! processing failure: it is recorded on the session as a distinct signal
//! (see `MacVerification`) and does not abort callback handling.

use crate::domain::foundation::{BookingId, DomainError, ErrorCode};

/// Payment orchestration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentError {
    /// Malformed request or missing required field; rejected before any
    /// state mutation.
    InputError { field: String, message: String },

    /// Client-submitted total disagrees with the server-computed total
    /// beyond tolerance. No session is created.
    AmountMismatch { computed: i64, submitted: i64 },

    /// An active (initialized/pending) session already exists for the
    /// booking; the caller must reuse or resolve it.
    SessionConflict(BookingId),

    /// No session matches the gateway transaction identifier.
    SessionNotFound { transaction_id: String },

    /// The linked booking row could not be found.
    BookingNotFound(BookingId),

    /// Network failure or timeout talking to the remote gateway; safe to
    /// retry, session remains non-terminal.
    GatewayUnavailable { reason: String },

    /// Storage failure; no partial state is guaranteed to have committed,
    /// so the caller must retry.
    Persistence(String),
}

impl PaymentError {
    pub fn input(field: impl Into<String>, message: impl Into<String>) -> Self {
        PaymentError::InputError {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn amount_mismatch(computed: i64, submitted: i64) -> Self {
        PaymentError::AmountMismatch { computed, submitted }
    }

    pub fn session_conflict(booking_id: BookingId) -> Self {
        PaymentError::SessionConflict(booking_id)
    }

    pub fn session_not_found(transaction_id: impl Into<String>) -> Self {
        PaymentError::SessionNotFound {
            transaction_id: transaction_id.into(),
        }
    }

    pub fn booking_not_found(booking_id: BookingId) -> Self {
        PaymentError::BookingNotFound(booking_id)
    }

    pub fn gateway_unavailable(reason: impl Into<String>) -> Self {
        PaymentError::GatewayUnavailable {
            reason: reason.into(),
        }
    }

    pub fn persistence(message: impl Into<String>) -> Self {
        PaymentError::Persistence(message.into())
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            PaymentError::InputError { .. } => ErrorCode::ValidationFailed,
            PaymentError::AmountMismatch { .. } => ErrorCode::AmountMismatch,
            PaymentError::SessionConflict(_) => ErrorCode::SessionConflict,
            PaymentError::SessionNotFound { .. } => ErrorCode::SessionNotFound,
            PaymentError::BookingNotFound(_) => ErrorCode::BookingNotFound,
            PaymentError::GatewayUnavailable { .. } => ErrorCode::GatewayUnavailable,
            PaymentError::Persistence(_) => ErrorCode::DatabaseError,
        }
    }

    /// Returns a user-facing error message. Raw gateway payloads are never
    /// surfaced here.
    pub fn message(&self) -> String {
        match self {
            PaymentError::InputError { field, message } => {
                format!("Invalid request: {} ({})", message, field)
            }
            PaymentError::AmountMismatch { computed, submitted } => format!(
                "Submitted amount {} does not match the computed total {}",
                submitted, computed
            ),
            PaymentError::SessionConflict(booking_id) => format!(
                "An active payment session already exists for booking {}",
                booking_id
            ),
            PaymentError::SessionNotFound { transaction_id } => {
                format!("No payment session for transaction {}", transaction_id)
            }
            PaymentError::BookingNotFound(booking_id) => {
                format!("Booking not found: {}", booking_id)
            }
            PaymentError::GatewayUnavailable { reason } => {
                format!("Payment gateway unavailable: {}", reason)
            }
            PaymentError::Persistence(message) => {
                format!("Storage failure: {}", message)
            }
        }
    }

    /// Whether the caller may safely retry the operation.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PaymentError::GatewayUnavailable { .. } | PaymentError::Persistence(_)
        )
    }
}

impl std::fmt::Display for PaymentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code(), self.message())
    }
}

impl std::error::Error for PaymentError {}

impl From<DomainError> for PaymentError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::ValidationFailed
            | ErrorCode::EmptyField
            | ErrorCode::InvalidFormat => PaymentError::input(
                err.details
                    .get("field")
                    .cloned()
                    .unwrap_or_else(|| "unknown".to_string()),
                err.message,
            ),
            _ => PaymentError::persistence(err.message),
        }
    }
}
