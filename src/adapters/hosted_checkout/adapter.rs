//! Hosted-checkout gateway adapter.
//!
//! Drives the redirect-based flow server-to-server: create a remote
//! checkout session, hand the payer the redirect URL, and confirm the
//! outcome from a signed webhook. The gateway manages its own request
//! signature internally, so this adapter computes no MAC of its own; it
//! only verifies the webhook HMAC.
//!
//! Both the booking id and the local transaction id ride along as session
//! metadata so the webhook can always be correlated, even when the local
//! transaction lookup fails.

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::domain::foundation::{BookingId, GatewayTransactionId};
use crate::domain::payment::{CheckoutNotification, PaymentError};
use crate::ports::{CheckoutGatewayClient, CreateCheckoutSession, RemoteCheckoutSession};

use super::webhook_types::{CheckoutSessionObject, CheckoutWebhookEvent, SignatureHeader};

type HmacSha256 = Hmac<Sha256>;

/// Maximum age for webhook events (5 minutes).
const MAX_TIMESTAMP_AGE_SECS: i64 = 300;

/// Clock skew tolerance for future timestamps (60 seconds).
const MAX_FUTURE_TOLERANCE_SECS: i64 = 60;

/// Hosted-checkout gateway configuration.
#[derive(Clone)]
pub struct HostedCheckoutConfig {
    api_key: SecretString,
    webhook_secret: SecretString,
    base_url: String,
}

impl HostedCheckoutConfig {
    pub fn new(api_key: impl Into<String>, webhook_secret: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::new(api_key.into()),
            webhook_secret: SecretString::new(webhook_secret.into()),
            base_url: "https://api.checkout.example.com".to_string(),
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

#[derive(Debug, Deserialize)]
struct RemoteSessionResponse {
    id: String,
    redirect_url: String,
}

/// Hosted-checkout gateway adapter.
pub struct HostedCheckoutAdapter {
    config: HostedCheckoutConfig,
    http_client: reqwest::Client,
}

impl HostedCheckoutAdapter {
    pub fn new(config: HostedCheckoutConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }

    /// Verifies a webhook delivery and normalizes it for the processor.
    ///
    /// Constant-time signature comparison; timestamp window rejects replays.
    pub fn verify_webhook(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<CheckoutNotification, PaymentError> {
        let header = SignatureHeader::parse(signature).map_err(|e| {
            warn!(error = %e, "failed to parse webhook signature header");
            PaymentError::input("signature", e.to_string())
        })?;

        self.verify_signature(payload, &header)?;
        self.parse_event(payload)
    }

    fn verify_signature(
        &self,
        payload: &[u8],
        header: &SignatureHeader,
    ) -> Result<(), PaymentError> {
        let now = chrono::Utc::now().timestamp();
        let age = now - header.timestamp;

        if age > MAX_TIMESTAMP_AGE_SECS {
            warn!(
                event_timestamp = header.timestamp,
                age_secs = age,
                "webhook event too old, possible replay"
            );
            return Err(PaymentError::input(
                "signature",
                format!("Event too old ({} seconds)", age),
            ));
        }
        if age < -MAX_FUTURE_TOLERANCE_SECS {
            warn!(
                event_timestamp = header.timestamp,
                current_time = now,
                "webhook event timestamp in future"
            );
            return Err(PaymentError::input("signature", "Event timestamp in future"));
        }

        let signed_payload = format!("{}.{}", header.timestamp, String::from_utf8_lossy(payload));

        let mut mac = HmacSha256::new_from_slice(
            self.config.webhook_secret.expose_secret().as_bytes(),
        )
        .map_err(|e| PaymentError::persistence(e.to_string()))?;
        mac.update(signed_payload.as_bytes());
        let expected = mac.finalize().into_bytes();

        let matches: bool = expected.as_slice().ct_eq(&header.v1_signature).into();
        if !matches {
            warn!("invalid webhook signature");
            return Err(PaymentError::input("signature", "Invalid signature"));
        }

        Ok(())
    }

    fn parse_event(&self, payload: &[u8]) -> Result<CheckoutNotification, PaymentError> {
        let event: CheckoutWebhookEvent = serde_json::from_slice(payload).map_err(|e| {
            warn!(error = %e, "failed to parse webhook payload");
            PaymentError::input("payload", format!("Invalid JSON: {}", e))
        })?;

        let object: CheckoutSessionObject =
            serde_json::from_value(event.data.object.clone()).map_err(|e| {
                PaymentError::input("payload", format!("Invalid checkout session: {}", e))
            })?;

        let success = event.event_type == "checkout.completed"
            && object.payment_status.as_deref() == Some("paid");
        let response_code = object
            .payment_status
            .clone()
            .unwrap_or_else(|| object.status.clone());

        let transaction_id = object
            .metadata
            .get("transaction_id")
            .and_then(|t| GatewayTransactionId::new(t.clone()).ok());
        let booking_id = object
            .metadata
            .get("booking_id")
            .and_then(|b| b.parse::<BookingId>().ok());

        let raw = serde_json::from_slice(payload)
            .unwrap_or(serde_json::Value::Null);

        Ok(CheckoutNotification {
            transaction_id,
            booking_id,
            success,
            response_code,
            raw,
        })
    }
}

#[async_trait]
impl CheckoutGatewayClient for HostedCheckoutAdapter {
    async fn create_session(
        &self,
        request: &CreateCheckoutSession,
    ) -> Result<RemoteCheckoutSession, PaymentError> {
        let url = format!("{}/v1/checkout/sessions", self.config.base_url);

        let body = serde_json::json!({
            "amount": request.amount.value(),
            "currency": request.currency.as_str(),
            "customer_email": request.payer_email,
            "customer_name": request.payer_name,
            "return_url": request.return_url,
            "metadata": {
                "booking_id": request.booking_id.to_string(),
                "transaction_id": request.transaction_id.as_str(),
            },
        });

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(self.config.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| PaymentError::gateway_unavailable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            warn!(status = %status, error = %error_text, "checkout session creation failed");
            return Err(PaymentError::gateway_unavailable(format!(
                "Gateway returned {}: {}",
                status, error_text
            )));
        }

        let remote: RemoteSessionResponse = response
            .json()
            .await
            .map_err(|e| PaymentError::gateway_unavailable(format!("Malformed response: {}", e)))?;

        Ok(RemoteCheckoutSession {
            handle: remote.id,
            redirect_url: remote.redirect_url,
        })
    }
}
