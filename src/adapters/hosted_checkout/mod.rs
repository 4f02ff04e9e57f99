//! Hosted-checkout gateway adapter.

mod adapter;
mod webhook_types;

pub use adapter::{HostedCheckoutAdapter, HostedCheckoutConfig};
pub use webhook_types::{CheckoutWebhookEvent, SignatureHeader, SignatureParseError};
