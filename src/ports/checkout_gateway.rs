//! Hosted-checkout gateway client port.
//!
//! The hosted-checkout gateway is driven server-to-server: this core creates
//! a remote checkout session and later receives a webhook. The remote
//! gateway manages its own request signature internally, so no MAC is
//! computed on this path.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{BookingId, Currency, GatewayTransactionId, MinorUnits};
use crate::domain::payment::PaymentError;

/// Request to open a remote checkout session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCheckoutSession {
    /// Echoed back through gateway metadata so the webhook can always be
    /// correlated with the booking, even if local transaction lookup fails.
    pub booking_id: BookingId,
    pub transaction_id: GatewayTransactionId,
    pub amount: MinorUnits,
    pub currency: Currency,
    pub payer_email: String,
    pub payer_name: Option<String>,
    /// Where the gateway sends the payer after checkout.
    pub return_url: String,
}

/// Remote session handle returned by the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteCheckoutSession {
    /// Opaque gateway-side session handle.
    pub handle: String,
    /// Gateway-hosted page the payer is redirected to.
    pub redirect_url: String,
}

/// Outbound client for the hosted-checkout gateway.
#[async_trait]
pub trait CheckoutGatewayClient: Send + Sync {
    /// Creates a checkout session on the remote gateway.
    ///
    /// Network failures surface as `GatewayUnavailable` and are safe to
    /// retry; the local session stays non-terminal.
    async fn create_session(
        &self,
        request: &CreateCheckoutSession,
    ) -> Result<RemoteCheckoutSession, PaymentError>;
}
