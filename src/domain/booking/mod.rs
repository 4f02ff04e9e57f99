//! Narrow slice of the booking aggregate touched by payment orchestration.
//!
//! The booking aggregate is owned by the booking subsystem; this core only
//! mirrors payment outcome into a few of its fields, transactionally
//! alongside the PaymentSession update.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainError, ErrorCode, Timestamp};
use crate::domain::payment::PaymentStatus;

/// Payment status vocabulary on the booking side.
///
/// Mirrors [`PaymentStatus`] plus the booking's own lifecycle values:
/// a completed payment confirms the booking, a failed one marks it
/// `payment_failed` so the UI can offer a retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingPaymentStatus {
    Initialized,
    Pending,
    Confirmed,
    PaymentFailed,
}

impl BookingPaymentStatus {
    /// The booking-side mirror of a session status.
    pub fn mirror_of(status: PaymentStatus) -> Self {
        match status {
            PaymentStatus::Initialized => BookingPaymentStatus::Initialized,
            PaymentStatus::Pending => BookingPaymentStatus::Pending,
            PaymentStatus::Completed => BookingPaymentStatus::Confirmed,
            PaymentStatus::Failed => BookingPaymentStatus::PaymentFailed,
        }
    }

    /// Storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingPaymentStatus::Initialized => "initialized",
            BookingPaymentStatus::Pending => "pending",
            BookingPaymentStatus::Confirmed => "confirmed",
            BookingPaymentStatus::PaymentFailed => "payment_failed",
        }
    }

    /// Parses the storage representation.
    pub fn parse(s: &str) -> Result<Self, DomainError> {
        match s {
            "initialized" => Ok(BookingPaymentStatus::Initialized),
            "pending" => Ok(BookingPaymentStatus::Pending),
            "confirmed" => Ok(BookingPaymentStatus::Confirmed),
            "payment_failed" => Ok(BookingPaymentStatus::PaymentFailed),
            _ => Err(DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid booking payment status: {}", s),
            )),
        }
    }
}

/// The mirrored fields written back onto a booking row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingPaymentMirror {
    pub payment_status: BookingPaymentStatus,
    pub gateway_transaction_id: String,
    pub payment_completed_at: Option<Timestamp>,
}

impl BookingPaymentMirror {
    /// Builds the mirror for a session reaching `status` at `now`.
    pub fn for_transition(
        status: PaymentStatus,
        gateway_transaction_id: impl Into<String>,
        completed_at: Option<Timestamp>,
    ) -> Self {
        Self {
            payment_status: BookingPaymentStatus::mirror_of(status),
            gateway_transaction_id: gateway_transaction_id.into(),
            payment_completed_at: completed_at,
        }
    }
}
