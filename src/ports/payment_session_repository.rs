//! Payment session repository port.
//!
//! The store is the sole point of mutation arbitration: the one-active-
//! session-per-booking invariant and the terminal-state-is-final invariant
//! are both enforced here, not in memory.

use async_trait::async_trait;

use crate::domain::booking::BookingPaymentMirror;
use crate::domain::foundation::{BookingId, DomainError, GatewayTransactionId, Timestamp};
use crate::domain::payment::{MacVerification, PaymentSession, PaymentStatus};

/// Result of inserting a new session.
///
/// `Conflict` is returned when the storage-level uniqueness check finds an
/// active session for the same booking; first to insert wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertResult {
    Inserted,
    Conflict,
}

/// Result of a terminal compare-and-set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalizeOutcome {
    /// This caller won the transition; session and booking were updated.
    Applied,
    /// The session was already terminal; nothing was mutated.
    AlreadyTerminal,
}

/// Everything a terminal transition writes, applied atomically.
///
/// The session-status update and the booking mirror must commit together or
/// not at all; duplicate deliveries race on the status precondition and
/// exactly one wins.
#[derive(Debug, Clone)]
pub struct SessionFinalization {
    pub transaction_id: GatewayTransactionId,
    /// Target terminal status (`Completed` or `Failed`).
    pub status: PaymentStatus,
    pub gateway_response_code: Option<String>,
    pub authorization_code: Option<String>,
    pub mac_verification: MacVerification,
    /// Set if and only if `status` is `Completed`.
    pub completed_at: Option<Timestamp>,
    /// Structured failure code; set if and only if `status` is `Failed`.
    pub error_message: Option<String>,
    pub booking_mirror: BookingPaymentMirror,
}

/// Persistence contract for payment sessions.
#[async_trait]
pub trait PaymentSessionRepository: Send + Sync {
    /// Inserts a freshly opened session.
    ///
    /// Must fail with `Conflict` (not an error) when an active session
    /// already exists for the booking, even under concurrent inserts.
    async fn insert(&self, session: &PaymentSession) -> Result<InsertResult, DomainError>;

    /// Finds the active (initialized/pending) session for a booking.
    async fn find_active_for_booking(
        &self,
        booking_id: &BookingId,
    ) -> Result<Option<PaymentSession>, DomainError>;

    /// Finds a session by its gateway transaction identifier.
    async fn find_by_transaction_id(
        &self,
        transaction_id: &GatewayTransactionId,
    ) -> Result<Option<PaymentSession>, DomainError>;

    /// Moves an initialized session to pending (payer handed to gateway).
    async fn mark_pending(
        &self,
        transaction_id: &GatewayTransactionId,
        now: Timestamp,
    ) -> Result<(), DomainError>;

    /// Applies a terminal transition with a status precondition.
    ///
    /// Implementations must use a single conditional update (or equivalent)
    /// guarded on the session still being non-terminal, and must update the
    /// linked booking's mirrored fields in the same transaction.
    async fn finalize(
        &self,
        finalization: &SessionFinalization,
    ) -> Result<FinalizeOutcome, DomainError>;
}
