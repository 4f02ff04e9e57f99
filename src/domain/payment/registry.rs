//! Transaction registry - opens and looks up payment sessions.
//!
//! `open` is the single entry point for creating a session: it validates the
//! price server-side first, enforces the one-active-session-per-booking
//! invariant, and writes the `init` audit entry. Lookups by gateway
//! transaction id serve the callback path.

use std::sync::Arc;

use crate::domain::booking::BookingPaymentMirror;
use crate::domain::foundation::{
    BookingId, Currency, GatewayTransactionId, MinorUnits, Timestamp,
};
use crate::domain::payment::{PaymentError, PaymentSession};
use crate::domain::pricing::{BookingDetails, PriceValidator};
use crate::ports::{
    AuditAction, AuditLog, AuditLogEntry, BookingRepository, InsertResult,
    PaymentSessionRepository,
};

/// Request to open a payment session for a booking.
#[derive(Debug, Clone)]
pub struct OpenSessionRequest {
    pub booking_id: BookingId,
    pub details: BookingDetails,
    /// Client-displayed total; validated, never trusted.
    pub submitted_amount: MinorUnits,
    pub currency: Currency,
}

/// Creates and looks up payment sessions.
pub struct TransactionRegistry {
    sessions: Arc<dyn PaymentSessionRepository>,
    bookings: Arc<dyn BookingRepository>,
    audit: Arc<dyn AuditLog>,
    pricing: PriceValidator,
}

impl TransactionRegistry {
    pub fn new(
        sessions: Arc<dyn PaymentSessionRepository>,
        bookings: Arc<dyn BookingRepository>,
        audit: Arc<dyn AuditLog>,
        pricing: PriceValidator,
    ) -> Self {
        Self {
            sessions,
            bookings,
            audit,
            pricing,
        }
    }

    /// Opens a session in `initialized` state.
    ///
    /// Fails fast with no side effects on input or amount validation;
    /// fails with `SessionConflict` when an active session already exists,
    /// in which case the caller must reuse that session.
    pub async fn open(&self, request: OpenSessionRequest) -> Result<PaymentSession, PaymentError> {
        if !self
            .bookings
            .exists(&request.booking_id)
            .await
            .map_err(|e| PaymentError::persistence(e.to_string()))?
        {
            return Err(PaymentError::booking_not_found(request.booking_id));
        }

        // Server-side total; the session always carries this number.
        let amount = self
            .pricing
            .validate_submitted(&request.details, request.submitted_amount)?;

        if self
            .sessions
            .find_active_for_booking(&request.booking_id)
            .await
            .map_err(|e| PaymentError::persistence(e.to_string()))?
            .is_some()
        {
            return Err(PaymentError::session_conflict(request.booking_id));
        }

        let now = Timestamp::now();
        let session = PaymentSession::open(
            request.booking_id,
            GatewayTransactionId::generate(now.as_unix_millis()),
            amount,
            request.currency.clone(),
            now,
        );

        // The unique constraint is the real arbiter under concurrency.
        match self
            .sessions
            .insert(&session)
            .await
            .map_err(|e| PaymentError::persistence(e.to_string()))?
        {
            InsertResult::Inserted => {}
            InsertResult::Conflict => {
                return Err(PaymentError::session_conflict(request.booking_id))
            }
        }

        let mirror = BookingPaymentMirror::for_transition(
            session.status,
            session.gateway_transaction_id.as_str(),
            None,
        );
        self.bookings
            .apply_payment_mirror(&session.booking_id, &mirror)
            .await
            .map_err(|e| PaymentError::persistence(e.to_string()))?;

        self.audit
            .append(AuditLogEntry::record(
                session.booking_id,
                session.id,
                AuditAction::Init,
                session.amount,
                session.currency.clone(),
                serde_json::json!({
                    "transaction_id": session.gateway_transaction_id.as_str(),
                    "submitted_amount": request.submitted_amount.value(),
                    "computed_amount": amount.value(),
                }),
            ))
            .await
            .map_err(|e| PaymentError::persistence(e.to_string()))?;

        Ok(session)
    }

    /// Looks up a session by its gateway transaction identifier.
    pub async fn find(
        &self,
        transaction_id: &GatewayTransactionId,
    ) -> Result<PaymentSession, PaymentError> {
        self.sessions
            .find_by_transaction_id(transaction_id)
            .await
            .map_err(|e| PaymentError::persistence(e.to_string()))?
            .ok_or_else(|| PaymentError::session_not_found(transaction_id.as_str()))
    }
}
