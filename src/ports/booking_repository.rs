//! Booking repository port.
//!
//! The booking aggregate belongs to the booking subsystem; this port only
//! exposes the narrow slice payment orchestration reads and writes.

use async_trait::async_trait;

use crate::domain::booking::BookingPaymentMirror;
use crate::domain::foundation::{BookingId, DomainError};

/// Read/write access to a booking's payment-mirrored fields.
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Whether the booking exists at all.
    async fn exists(&self, booking_id: &BookingId) -> Result<bool, DomainError>;

    /// Writes the payment mirror onto the booking row.
    ///
    /// Used for the non-terminal states (`initialized`, `pending`);
    /// terminal mirrors travel inside
    /// [`PaymentSessionRepository::finalize`](crate::ports::PaymentSessionRepository::finalize)
    /// so they commit atomically with the session update.
    async fn apply_payment_mirror(
        &self,
        booking_id: &BookingId,
        mirror: &BookingPaymentMirror,
    ) -> Result<(), DomainError>;
}
