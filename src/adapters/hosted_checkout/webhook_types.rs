//! Wire types for hosted-checkout webhook handling.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error parsing the webhook signature header.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureParseError {
    #[error("Missing signature header")]
    MissingHeader,
    #[error("Missing timestamp (t=) in signature")]
    MissingTimestamp,
    #[error("Missing v1 signature in header")]
    MissingV1Signature,
    #[error("Invalid timestamp format")]
    InvalidTimestamp,
    #[error("Invalid signature format (not valid hex)")]
    InvalidSignatureFormat,
}

/// Parsed signature header components.
///
/// The header format is `t=<timestamp>,v1=<hex signature>`; unknown
/// components are ignored for forward compatibility.
#[derive(Debug, Clone)]
pub struct SignatureHeader {
    /// Unix timestamp the gateway generated the event at.
    pub timestamp: i64,

    /// HMAC-SHA256 signature, decoded from hex.
    pub v1_signature: Vec<u8>,
}

impl SignatureHeader {
    pub fn parse(header: &str) -> Result<Self, SignatureParseError> {
        if header.is_empty() {
            return Err(SignatureParseError::MissingHeader);
        }

        let mut timestamp: Option<i64> = None;
        let mut v1_signature: Option<Vec<u8>> = None;

        for part in header.split(',') {
            let (key, value) = part
                .split_once('=')
                .ok_or(SignatureParseError::MissingTimestamp)?;

            match key.trim() {
                "t" => {
                    timestamp = Some(
                        value
                            .trim()
                            .parse()
                            .map_err(|_| SignatureParseError::InvalidTimestamp)?,
                    );
                }
                "v1" => {
                    v1_signature = Some(
                        hex::decode(value.trim())
                            .map_err(|_| SignatureParseError::InvalidSignatureFormat)?,
                    );
                }
                _ => {}
            }
        }

        Ok(Self {
            timestamp: timestamp.ok_or(SignatureParseError::MissingTimestamp)?,
            v1_signature: v1_signature.ok_or(SignatureParseError::MissingV1Signature)?,
        })
    }
}

/// Raw webhook event envelope as received from the gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CheckoutWebhookEvent {
    /// Unique event identifier.
    pub id: String,

    /// Event type, e.g. `checkout.completed`.
    #[serde(rename = "type")]
    pub event_type: String,

    /// Unix timestamp when the event was created.
    pub created: i64,

    pub data: CheckoutEventData,
}

/// Event payload container.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CheckoutEventData {
    pub object: serde_json::Value,
}

/// Checkout session object embedded in webhook payloads.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CheckoutSessionObject {
    /// Gateway-side session handle.
    pub id: String,

    /// Session status (open, complete, expired).
    pub status: String,

    /// Payment status (paid, unpaid).
    pub payment_status: Option<String>,

    /// Metadata echoed back from session creation.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}
