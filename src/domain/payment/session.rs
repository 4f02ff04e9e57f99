//! PaymentSession aggregate - one record per payment attempt.
//!
//! Sessions move through a small forward-only state machine:
//!
//! ```text
//! initialized -> pending -> { completed | failed }
//! ```
//!
//! `completed` and `failed` are terminal; no transition leaves them. Sessions
//! are never deleted - superseded ones are retained for audit.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    BookingId, Currency, DomainError, ErrorCode, GatewayTransactionId, MinorUnits,
    PaymentSessionId, Timestamp,
};

/// Lifecycle state of a payment session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Session created, gateway not yet contacted by the payer.
    Initialized,
    /// Payer handed off to the gateway, awaiting the result.
    Pending,
    /// Gateway confirmed the payment.
    Completed,
    /// Gateway reported failure, or the attempt was abandoned.
    Failed,
}

impl PaymentStatus {
    /// Whether no further transition is permitted from this state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PaymentStatus::Completed | PaymentStatus::Failed)
    }

    /// Whether a session in this state blocks opening another one
    /// for the same booking.
    pub fn is_active(&self) -> bool {
        matches!(self, PaymentStatus::Initialized | PaymentStatus::Pending)
    }

    /// Whether the state machine permits moving to `next`.
    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        match (self, next) {
            (PaymentStatus::Initialized, PaymentStatus::Pending) => true,
            (PaymentStatus::Initialized, PaymentStatus::Completed) => true,
            (PaymentStatus::Initialized, PaymentStatus::Failed) => true,
            (PaymentStatus::Pending, PaymentStatus::Completed) => true,
            (PaymentStatus::Pending, PaymentStatus::Failed) => true,
            _ => false,
        }
    }

    /// Storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Initialized => "initialized",
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
        }
    }

    /// Parses the storage representation.
    pub fn parse(s: &str) -> Result<Self, DomainError> {
        match s {
            "initialized" => Ok(PaymentStatus::Initialized),
            "pending" => Ok(PaymentStatus::Pending),
            "completed" => Ok(PaymentStatus::Completed),
            "failed" => Ok(PaymentStatus::Failed),
            _ => Err(DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid payment status value: {}", s),
            )),
        }
    }
}

/// Outcome of MAC verification for the most recent callback.
///
/// Kept as a distinct signal from [`PaymentStatus`]: "gateway says failed"
/// and "gateway says success but the signature didn't verify" are different
/// operational conditions, and the latter warrants manual reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MacVerification {
    /// No callback received yet.
    Unverified,
    /// Digest recomputed locally and matched.
    Verified,
    /// Digest did not match the locally recomputed value.
    Failed,
}

impl MacVerification {
    /// Storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            MacVerification::Unverified => "unverified",
            MacVerification::Verified => "verified",
            MacVerification::Failed => "failed",
        }
    }

    /// Parses the storage representation.
    pub fn parse(s: &str) -> Result<Self, DomainError> {
        match s {
            "unverified" => Ok(MacVerification::Unverified),
            "verified" => Ok(MacVerification::Verified),
            "failed" => Ok(MacVerification::Failed),
            _ => Err(DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid MAC verification value: {}", s),
            )),
        }
    }
}

/// One payment attempt for a booking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentSession {
    pub id: PaymentSessionId,
    pub booking_id: BookingId,
    pub gateway_transaction_id: GatewayTransactionId,
    pub amount: MinorUnits,
    pub currency: Currency,
    pub status: PaymentStatus,
    pub gateway_response_code: Option<String>,
    pub authorization_code: Option<String>,
    pub mac_verification: MacVerification,
    pub completed_at: Option<Timestamp>,
    pub error_message: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl PaymentSession {
    /// Opens a new session in `initialized` state.
    ///
    /// The amount is immutable for the session's whole lifetime.
    pub fn open(
        booking_id: BookingId,
        gateway_transaction_id: GatewayTransactionId,
        amount: MinorUnits,
        currency: Currency,
        now: Timestamp,
    ) -> Self {
        Self {
            id: PaymentSessionId::new(),
            booking_id,
            gateway_transaction_id,
            amount,
            currency,
            status: PaymentStatus::Initialized,
            gateway_response_code: None,
            authorization_code: None,
            mac_verification: MacVerification::Unverified,
            completed_at: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Marks the payer handed off to the gateway.
    pub fn mark_pending(&mut self, now: Timestamp) -> Result<(), DomainError> {
        self.transition(PaymentStatus::Pending, now)?;
        Ok(())
    }

    /// Applies a successful gateway result.
    ///
    /// `completed_at` is set if and only if the session completes.
    pub fn complete(
        &mut self,
        response_code: String,
        authorization_code: Option<String>,
        now: Timestamp,
    ) -> Result<(), DomainError> {
        self.transition(PaymentStatus::Completed, now)?;
        self.gateway_response_code = Some(response_code);
        self.authorization_code = authorization_code;
        self.completed_at = Some(now);
        self.error_message = None;
        Ok(())
    }

    /// Applies a failed gateway result with a structured failure code.
    pub fn fail(
        &mut self,
        response_code: String,
        error_message: String,
        now: Timestamp,
    ) -> Result<(), DomainError> {
        self.transition(PaymentStatus::Failed, now)?;
        self.gateway_response_code = Some(response_code);
        self.error_message = Some(error_message);
        Ok(())
    }

    /// Records the MAC verification outcome for the latest callback.
    ///
    /// Recorded regardless of the gateway-reported result; a mismatch does
    /// not by itself abort callback processing.
    pub fn record_mac_verification(&mut self, verified: bool) {
        self.mac_verification = if verified {
            MacVerification::Verified
        } else {
            MacVerification::Failed
        };
    }

    fn transition(&mut self, next: PaymentStatus, now: Timestamp) -> Result<(), DomainError> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!(
                    "Cannot move payment session from {} to {}",
                    self.status.as_str(),
                    next.as_str()
                ),
            ));
        }
        self.status = next;
        self.updated_at = now;
        Ok(())
    }
}
