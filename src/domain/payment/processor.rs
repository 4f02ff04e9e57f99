//! Callback processor - applies gateway results to payment sessions.
//!
//! Handles both delivery paths: form-encoded callbacks from the
//! hosted-fields gateway (MAC-verified here) and webhook notifications from
//! the hosted-checkout gateway (signature already verified by its adapter).
//!
//! ## Idempotence
//!
//! Real gateways redeliver. The terminal transition is a compare-and-set at
//! the storage layer; a redelivered or concurrently racing callback loses
//! the precondition, mutates nothing, and still leaves an audit entry.
//!
//! ## MAC failure policy
//!
//! A MAC mismatch does not force the session to `failed`. It is recorded as
//! `mac_verification = failed` so operators can tell "gateway says failed"
//! apart from "gateway says success but the signature didn't verify" - the
//! latter needs manual reconciliation, not silent trust of either signal.

use std::sync::Arc;

use tracing::warn;

use crate::domain::booking::BookingPaymentMirror;
use crate::domain::foundation::{BookingId, GatewayTransactionId, Timestamp};
use crate::domain::payment::callback::CallbackParams;
use crate::domain::payment::mac::MacCodec;
use crate::domain::payment::{PaymentError, PaymentSession, PaymentStatus};
use crate::ports::{
    AuditAction, AuditLog, AuditLogEntry, FinalizeOutcome, PaymentSessionRepository,
    SessionFinalization,
};

use super::session::MacVerification;

/// Normalized notification from the hosted-checkout gateway webhook.
///
/// The adapter verifies the webhook signature before constructing one of
/// these, so reaching the processor implies an authentic notification.
#[derive(Debug, Clone)]
pub struct CheckoutNotification {
    /// Local transaction id echoed through gateway metadata, if present.
    pub transaction_id: Option<GatewayTransactionId>,
    /// Booking correlation id from gateway metadata; the fallback when the
    /// transaction lookup fails.
    pub booking_id: Option<BookingId>,
    pub success: bool,
    /// Gateway's own result code.
    pub response_code: String,
    /// Full webhook payload for the audit trail.
    pub raw: serde_json::Value,
}

/// How a delivery was disposed of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackDisposition {
    /// This delivery won the transition to `completed`.
    Completed,
    /// This delivery won the transition to `failed`.
    Failed,
    /// The session was already terminal; audit recorded, nothing mutated.
    AlreadyFinal,
}

/// Result of processing one delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallbackOutcome {
    pub disposition: CallbackDisposition,
    pub mac_verified: bool,
    /// Whether the delivery's amount agrees with the stored session amount.
    /// A disagreement is flagged like a MAC mismatch, not a hard failure.
    pub amount_matches: bool,
}

/// Applies idempotent state transitions from gateway responses.
pub struct CallbackProcessor {
    sessions: Arc<dyn PaymentSessionRepository>,
    audit: Arc<dyn AuditLog>,
    codec: MacCodec,
}

impl CallbackProcessor {
    pub fn new(
        sessions: Arc<dyn PaymentSessionRepository>,
        audit: Arc<dyn AuditLog>,
        codec: MacCodec,
    ) -> Self {
        Self {
            sessions,
            audit,
            codec,
        }
    }

    /// Processes a hosted-fields gateway callback.
    ///
    /// Verification failure never aborts processing by itself; the boolean
    /// is recorded and the gateway-reported result still decides the
    /// transition.
    pub async fn process_callback(
        &self,
        params: &CallbackParams,
    ) -> Result<CallbackOutcome, PaymentError> {
        let transaction_id = GatewayTransactionId::new(params.transaction_id.clone())
            .map_err(|e| PaymentError::input("codTrans", e.to_string()))?;

        let session = self.find_session(&transaction_id).await?;

        let mac_verified = self
            .codec
            .verify(&params.mac_pairs(self.codec.protocol()), &params.mac);
        if !mac_verified {
            warn!(
                transaction_id = %transaction_id,
                booking_id = %session.booking_id,
                "callback MAC verification failed; flagging for reconciliation"
            );
        }

        // The MAC only proves the body was signed, not that it names the
        // amount this session was opened for.
        let amount_matches = params
            .amount_minor()
            .map(|amount| amount == session.amount)
            .unwrap_or(false);
        if !amount_matches {
            warn!(
                transaction_id = %transaction_id,
                booking_id = %session.booking_id,
                callback_amount = %params.amount,
                session_amount = %session.amount,
                "callback amount disagrees with session amount"
            );
        }

        let success = params.gateway_success();
        let raw = serde_json::to_value(params.raw())
            .map_err(|e| PaymentError::persistence(e.to_string()))?;

        let disposition = self
            .apply_transition(
                &session,
                success,
                params
                    .status_code
                    .clone()
                    .unwrap_or_else(|| params.result.clone()),
                params.authorization_code.clone(),
                if success { None } else { Some(params.failure_code()) },
                mac_verified,
            )
            .await?;

        self.append_audit(&session, AuditAction::Callback, raw).await?;

        Ok(CallbackOutcome {
            disposition,
            mac_verified,
            amount_matches,
        })
    }

    /// Processes a hosted-checkout webhook notification.
    ///
    /// Resolves the session by transaction id first, falling back to the
    /// booking correlation id echoed through gateway metadata.
    pub async fn process_checkout_webhook(
        &self,
        notification: &CheckoutNotification,
    ) -> Result<CallbackOutcome, PaymentError> {
        let session = self.resolve_checkout_session(notification).await?;

        let disposition = self
            .apply_transition(
                &session,
                notification.success,
                notification.response_code.clone(),
                None,
                if notification.success {
                    None
                } else {
                    Some(format!(
                        "gateway_result_{}",
                        notification.response_code.to_ascii_lowercase()
                    ))
                },
                true,
            )
            .await?;

        self.append_audit(&session, AuditAction::Webhook, notification.raw.clone())
            .await?;

        Ok(CallbackOutcome {
            disposition,
            mac_verified: true,
            amount_matches: true,
        })
    }

    async fn resolve_checkout_session(
        &self,
        notification: &CheckoutNotification,
    ) -> Result<PaymentSession, PaymentError> {
        if let Some(transaction_id) = &notification.transaction_id {
            if let Some(session) = self
                .sessions
                .find_by_transaction_id(transaction_id)
                .await
                .map_err(|e| PaymentError::persistence(e.to_string()))?
            {
                return Ok(session);
            }
        }
        if let Some(booking_id) = &notification.booking_id {
            if let Some(session) = self
                .sessions
                .find_active_for_booking(booking_id)
                .await
                .map_err(|e| PaymentError::persistence(e.to_string()))?
            {
                return Ok(session);
            }
        }
        Err(PaymentError::session_not_found(
            notification
                .transaction_id
                .as_ref()
                .map(|t| t.as_str().to_string())
                .unwrap_or_else(|| "<none>".to_string()),
        ))
    }

    async fn find_session(
        &self,
        transaction_id: &GatewayTransactionId,
    ) -> Result<PaymentSession, PaymentError> {
        self.sessions
            .find_by_transaction_id(transaction_id)
            .await
            .map_err(|e| PaymentError::persistence(e.to_string()))?
            .ok_or_else(|| PaymentError::session_not_found(transaction_id.as_str()))
    }

    async fn apply_transition(
        &self,
        session: &PaymentSession,
        success: bool,
        response_code: String,
        authorization_code: Option<String>,
        error_message: Option<String>,
        mac_verified: bool,
    ) -> Result<CallbackDisposition, PaymentError> {
        // Idempotence guard: terminal deliveries only leave an audit entry.
        if session.status.is_terminal() {
            return Ok(CallbackDisposition::AlreadyFinal);
        }

        let now = Timestamp::now();
        let status = if success {
            PaymentStatus::Completed
        } else {
            PaymentStatus::Failed
        };
        let completed_at = success.then_some(now);

        let finalization = SessionFinalization {
            transaction_id: session.gateway_transaction_id.clone(),
            status,
            gateway_response_code: Some(response_code),
            authorization_code: if success { authorization_code } else { None },
            mac_verification: if mac_verified {
                MacVerification::Verified
            } else {
                MacVerification::Failed
            },
            completed_at,
            error_message,
            booking_mirror: BookingPaymentMirror::for_transition(
                status,
                session.gateway_transaction_id.as_str(),
                completed_at,
            ),
        };

        match self
            .sessions
            .finalize(&finalization)
            .await
            .map_err(|e| PaymentError::persistence(e.to_string()))?
        {
            FinalizeOutcome::Applied if success => Ok(CallbackDisposition::Completed),
            FinalizeOutcome::Applied => Ok(CallbackDisposition::Failed),
            // Lost the precondition race to a concurrent delivery.
            FinalizeOutcome::AlreadyTerminal => Ok(CallbackDisposition::AlreadyFinal),
        }
    }

    async fn append_audit(
        &self,
        session: &PaymentSession,
        action: AuditAction,
        raw: serde_json::Value,
    ) -> Result<(), PaymentError> {
        self.audit
            .append(AuditLogEntry::record(
                session.booking_id,
                session.id,
                action,
                session.amount,
                session.currency.clone(),
                raw,
            ))
            .await
            .map_err(|e| PaymentError::persistence(e.to_string()))
    }
}
