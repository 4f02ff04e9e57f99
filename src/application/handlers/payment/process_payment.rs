//! ProcessPaymentHandler - submits a tokenized hosted-fields payment.

use std::sync::Arc;

use serde_json::json;
use tracing::{info, warn};

use crate::domain::foundation::{GatewayTransactionId, Timestamp};
use crate::domain::payment::{PaymentError, PaymentStatus};
use crate::domain::booking::BookingPaymentMirror;
use crate::ports::{
    AuditAction, AuditLog, AuditLogEntry, FieldsGatewayClient, FinalizeOutcome,
    GatewayPaymentOutcome, PaymentSessionRepository, SessionFinalization,
};

/// Command to submit the payment token captured by the hosted fields.
#[derive(Debug, Clone)]
pub struct ProcessPaymentCommand {
    pub transaction_id: GatewayTransactionId,
    /// One-time token minted by the gateway's hosted fields (`xpayNonce`).
    pub payment_token: String,
}

/// Outcome of a payment submission, as seen by the booking UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessPaymentResult {
    /// Authorized synchronously; session and booking are completed.
    Completed { authorization_code: Option<String> },
    /// Declined synchronously; session and booking are failed.
    Failed { response_code: String },
    /// Strong customer authentication required; session stays pending.
    ChallengeRequired { url: String },
    /// The session was already terminal; nothing changed.
    AlreadyFinal,
}

/// Handler for the server-to-server payment submission step.
pub struct ProcessPaymentHandler {
    sessions: Arc<dyn PaymentSessionRepository>,
    audit: Arc<dyn AuditLog>,
    gateway: Arc<dyn FieldsGatewayClient>,
}

impl ProcessPaymentHandler {
    pub fn new(
        sessions: Arc<dyn PaymentSessionRepository>,
        audit: Arc<dyn AuditLog>,
        gateway: Arc<dyn FieldsGatewayClient>,
    ) -> Self {
        Self {
            sessions,
            audit,
            gateway,
        }
    }

    pub async fn handle(
        &self,
        cmd: ProcessPaymentCommand,
    ) -> Result<ProcessPaymentResult, PaymentError> {
        let session = self
            .sessions
            .find_by_transaction_id(&cmd.transaction_id)
            .await
            .map_err(|e| PaymentError::persistence(e.to_string()))?
            .ok_or_else(|| {
                PaymentError::session_not_found(format!(
                    "No payment session for transaction {}",
                    cmd.transaction_id
                ))
            })?;

        if session.status.is_terminal() {
            info!(
                transaction_id = %session.gateway_transaction_id,
                status = session.status.as_str(),
                "payment submission for already-final session ignored"
            );
            return Ok(ProcessPaymentResult::AlreadyFinal);
        }

        // The payer has reached the card form by now.
        if session.status == PaymentStatus::Initialized {
            self.sessions
                .mark_pending(&session.gateway_transaction_id, Timestamp::now())
                .await
                .map_err(|e| PaymentError::persistence(e.to_string()))?;
        }

        let outcome = self
            .gateway
            .submit_payment(&session, &cmd.payment_token)
            .await?;

        let result = match &outcome {
            GatewayPaymentOutcome::Authorized {
                response_code,
                authorization_code,
            } => {
                let now = Timestamp::now();
                let finalization = SessionFinalization {
                    transaction_id: session.gateway_transaction_id.clone(),
                    status: PaymentStatus::Completed,
                    gateway_response_code: Some(response_code.clone()),
                    authorization_code: authorization_code.clone(),
                    mac_verification: session.mac_verification,
                    completed_at: Some(now),
                    error_message: None,
                    booking_mirror: BookingPaymentMirror::for_transition(
                        PaymentStatus::Completed,
                        session.gateway_transaction_id.as_str(),
                        Some(now),
                    ),
                };
                match self
                    .sessions
                    .finalize(&finalization)
                    .await
                    .map_err(|e| PaymentError::persistence(e.to_string()))?
                {
                    FinalizeOutcome::Applied => ProcessPaymentResult::Completed {
                        authorization_code: authorization_code.clone(),
                    },
                    FinalizeOutcome::AlreadyTerminal => ProcessPaymentResult::AlreadyFinal,
                }
            }
            GatewayPaymentOutcome::Declined { response_code } => {
                warn!(
                    transaction_id = %session.gateway_transaction_id,
                    response_code = %response_code,
                    "gateway declined payment submission"
                );
                let finalization = SessionFinalization {
                    transaction_id: session.gateway_transaction_id.clone(),
                    status: PaymentStatus::Failed,
                    gateway_response_code: Some(response_code.clone()),
                    authorization_code: None,
                    mac_verification: session.mac_verification,
                    completed_at: None,
                    error_message: Some(format!("gateway_status_{}", response_code)),
                    booking_mirror: BookingPaymentMirror::for_transition(
                        PaymentStatus::Failed,
                        session.gateway_transaction_id.as_str(),
                        None,
                    ),
                };
                match self
                    .sessions
                    .finalize(&finalization)
                    .await
                    .map_err(|e| PaymentError::persistence(e.to_string()))?
                {
                    FinalizeOutcome::Applied => ProcessPaymentResult::Failed {
                        response_code: response_code.clone(),
                    },
                    FinalizeOutcome::AlreadyTerminal => ProcessPaymentResult::AlreadyFinal,
                }
            }
            // Not terminal: the gateway answers again through the callback
            // once the payer completes the challenge.
            GatewayPaymentOutcome::ChallengeRequired { url } => {
                ProcessPaymentResult::ChallengeRequired { url: url.clone() }
            }
        };

        let raw = match &outcome {
            GatewayPaymentOutcome::Authorized {
                response_code,
                authorization_code,
            } => json!({
                "step": "payment",
                "outcome": "authorized",
                "response_code": response_code,
                "authorization_code": authorization_code,
            }),
            GatewayPaymentOutcome::Declined { response_code } => json!({
                "step": "payment",
                "outcome": "declined",
                "response_code": response_code,
            }),
            GatewayPaymentOutcome::ChallengeRequired { url } => json!({
                "step": "payment",
                "outcome": "challenge_required",
                "challenge_url": url,
            }),
        };
        self.audit
            .append(AuditLogEntry::record(
                session.booking_id,
                session.id,
                AuditAction::Process,
                session.amount,
                session.currency.clone(),
                raw,
            ))
            .await
            .map_err(|e| PaymentError::persistence(e.to_string()))?;

        Ok(result)
    }
}
