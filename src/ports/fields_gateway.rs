//! Hosted-fields gateway client port.
//!
//! Covers the server-to-server payment submission step of the merchant
//! signed flow. Building the browser-side initialization request needs no
//! port - it is pure parameter signing with no I/O.

use async_trait::async_trait;

use crate::domain::payment::{PaymentError, PaymentSession};

/// Result of submitting a tokenized payment to the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayPaymentOutcome {
    /// Gateway authorized the payment synchronously.
    Authorized {
        response_code: String,
        authorization_code: Option<String>,
    },
    /// Gateway declined the payment synchronously.
    Declined { response_code: String },
    /// Strong customer authentication required; redirect the payer.
    ChallengeRequired { url: String },
}

/// Outbound client for the hosted-fields gateway payment step.
#[async_trait]
pub trait FieldsGatewayClient: Send + Sync {
    /// Submits the tokenized payment.
    ///
    /// Network failures surface as `GatewayUnavailable` and are safe to
    /// retry; the local session stays non-terminal.
    async fn submit_payment(
        &self,
        session: &PaymentSession,
        payment_token: &str,
    ) -> Result<GatewayPaymentOutcome, PaymentError>;
}
