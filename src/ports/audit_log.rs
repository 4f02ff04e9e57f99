//! Append-only audit log port.
//!
//! Every state-changing event writes one entry with the raw gateway payload,
//! including forged or failed attempts - the trail must retain evidence.
//! Entries are never mutated or deleted.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    BookingId, Currency, DomainError, MinorUnits, PaymentSessionId, Timestamp,
};

/// What kind of event produced an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Session opened.
    Init,
    /// Synchronous payment submission processed.
    Process,
    /// Hosted-fields gateway callback received.
    Callback,
    /// Hosted-checkout gateway webhook received.
    Webhook,
}

impl AuditAction {
    /// Storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Init => "init",
            AuditAction::Process => "process",
            AuditAction::Callback => "callback",
            AuditAction::Webhook => "webhook",
        }
    }
}

/// One immutable audit record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub booking_id: BookingId,
    pub payment_session_id: PaymentSessionId,
    pub action: AuditAction,
    pub amount: MinorUnits,
    pub currency: Currency,
    /// Opaque key/value capture of the gateway payload, verbatim.
    pub raw_gateway_payload: serde_json::Value,
    pub recorded_at: Timestamp,
}

impl AuditLogEntry {
    /// Builds an entry recorded at the current instant.
    pub fn record(
        booking_id: BookingId,
        payment_session_id: PaymentSessionId,
        action: AuditAction,
        amount: MinorUnits,
        currency: Currency,
        raw_gateway_payload: serde_json::Value,
    ) -> Self {
        Self {
            booking_id,
            payment_session_id,
            action,
            amount,
            currency,
            raw_gateway_payload,
            recorded_at: Timestamp::now(),
        }
    }
}

/// Insert-only audit sink.
#[async_trait]
pub trait AuditLog: Send + Sync {
    /// Appends one entry. There is no update or delete.
    async fn append(&self, entry: AuditLogEntry) -> Result<(), DomainError>;
}
