//! OpenPaymentSessionHandler - opens a session and prepares the gateway flow.

use std::sync::Arc;

use crate::adapters::xpay::XPayAdapter;
use crate::domain::foundation::{BookingId, Currency, MinorUnits, Timestamp};
use crate::domain::payment::{OpenSessionRequest, PaymentError, TransactionRegistry};
use crate::domain::pricing::BookingDetails;
use crate::ports::{CheckoutGatewayClient, CreateCheckoutSession, PaymentSessionRepository};

/// Which gateway flow the caller wants to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentFlow {
    /// Card fields embedded in the booking UI, merchant-signed protocol.
    HostedFields,
    /// Full redirect to the gateway-hosted checkout page.
    HostedCheckout,
}

/// Command to open a payment session.
#[derive(Debug, Clone)]
pub struct OpenSessionCommand {
    pub booking_id: BookingId,
    pub details: BookingDetails,
    pub submitted_amount: MinorUnits,
    pub currency: Currency,
    pub payer_email: String,
    pub payer_name: Option<String>,
    pub flow: PaymentFlow,
}

/// What the booking UI needs to continue the payment.
#[derive(Debug, Clone)]
pub enum OpenSessionResult {
    /// Parameters for the gateway's hosted-fields script.
    HostedFields {
        transaction_id: String,
        endpoint_url: String,
        gateway_params: Vec<(String, String)>,
    },
    /// Redirect target on the gateway-hosted page.
    HostedCheckout {
        transaction_id: String,
        redirect_url: String,
    },
}

/// Handler for opening payment sessions.
pub struct OpenSessionHandler {
    registry: Arc<TransactionRegistry>,
    sessions: Arc<dyn PaymentSessionRepository>,
    xpay: Arc<XPayAdapter>,
    checkout: Arc<dyn CheckoutGatewayClient>,
    checkout_return_url: String,
}

impl OpenSessionHandler {
    pub fn new(
        registry: Arc<TransactionRegistry>,
        sessions: Arc<dyn PaymentSessionRepository>,
        xpay: Arc<XPayAdapter>,
        checkout: Arc<dyn CheckoutGatewayClient>,
        checkout_return_url: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            sessions,
            xpay,
            checkout,
            checkout_return_url: checkout_return_url.into(),
        }
    }

    pub async fn handle(&self, cmd: OpenSessionCommand) -> Result<OpenSessionResult, PaymentError> {
        let session = self
            .registry
            .open(OpenSessionRequest {
                booking_id: cmd.booking_id,
                details: cmd.details,
                submitted_amount: cmd.submitted_amount,
                currency: cmd.currency,
            })
            .await?;

        match cmd.flow {
            PaymentFlow::HostedFields => {
                let request = self.xpay.build_session_request(&session);
                Ok(OpenSessionResult::HostedFields {
                    transaction_id: session.gateway_transaction_id.as_str().to_string(),
                    endpoint_url: request.endpoint_url,
                    gateway_params: request.params,
                })
            }
            PaymentFlow::HostedCheckout => {
                let remote = self
                    .checkout
                    .create_session(&CreateCheckoutSession {
                        booking_id: session.booking_id,
                        transaction_id: session.gateway_transaction_id.clone(),
                        amount: session.amount,
                        currency: session.currency.clone(),
                        payer_email: cmd.payer_email,
                        payer_name: cmd.payer_name,
                        return_url: self.checkout_return_url.clone(),
                    })
                    .await?;

                // The payer is handed off as soon as the remote session exists.
                self.sessions
                    .mark_pending(&session.gateway_transaction_id, Timestamp::now())
                    .await
                    .map_err(|e| PaymentError::persistence(e.to_string()))?;

                Ok(OpenSessionResult::HostedCheckout {
                    transaction_id: session.gateway_transaction_id.as_str().to_string(),
                    redirect_url: remote.redirect_url,
                })
            }
        }
    }
}
