//! Payment gateway configuration

use serde::Deserialize;

use crate::domain::payment::MacProtocol;

use super::error::ValidationError;
use super::server::Environment;

/// Hosted-fields gateway configuration (XPay)
#[derive(Debug, Clone, Deserialize)]
pub struct XPayConfig {
    /// Merchant alias assigned by the gateway
    pub alias: String,

    /// Shared MAC secret
    pub mac_secret: String,

    /// MAC protocol preset name (`gen1` or `gen2`)
    #[serde(default = "default_protocol")]
    pub protocol: String,

    /// Gateway base URL
    #[serde(default = "default_xpay_base_url")]
    pub base_url: String,

    /// URL the gateway redirects the payer to after the hosted flow
    pub result_url: String,
}

impl XPayConfig {
    /// Resolve the configured protocol preset.
    pub fn mac_protocol(&self) -> Result<MacProtocol, ValidationError> {
        MacProtocol::parse(&self.protocol)
            .ok_or_else(|| ValidationError::UnknownMacProtocol(self.protocol.clone()))
    }

    /// Validate XPay configuration
    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        if self.alias.is_empty() {
            return Err(ValidationError::MissingRequired("XPAY_ALIAS"));
        }
        if self.mac_secret.is_empty() {
            return Err(ValidationError::MissingRequired("XPAY_MAC_SECRET"));
        }
        self.mac_protocol()?;
        if *environment == Environment::Production && !self.base_url.starts_with("https://") {
            return Err(ValidationError::GatewayUrlMustBeHttps);
        }
        Ok(())
    }
}

/// Hosted-checkout gateway configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutConfig {
    /// API key (ck_live_... or ck_test_...)
    pub api_key: String,

    /// Webhook signing secret (whsec_...)
    pub webhook_secret: String,

    /// Gateway base URL
    #[serde(default = "default_checkout_base_url")]
    pub base_url: String,

    /// URL the gateway sends the payer back to after checkout
    pub return_url: String,
}

impl CheckoutConfig {
    /// Check if using gateway test mode
    pub fn is_test_mode(&self) -> bool {
        self.api_key.starts_with("ck_test_")
    }

    /// Validate checkout configuration
    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        if self.api_key.is_empty() {
            return Err(ValidationError::MissingRequired("CHECKOUT_API_KEY"));
        }
        if self.webhook_secret.is_empty() {
            return Err(ValidationError::MissingRequired("CHECKOUT_WEBHOOK_SECRET"));
        }
        if !self.api_key.starts_with("ck_") {
            return Err(ValidationError::InvalidCheckoutApiKey);
        }
        if !self.webhook_secret.starts_with("whsec_") {
            return Err(ValidationError::InvalidCheckoutWebhookSecret);
        }
        if *environment == Environment::Production && !self.base_url.starts_with("https://") {
            return Err(ValidationError::GatewayUrlMustBeHttps);
        }
        Ok(())
    }
}

fn default_protocol() -> String {
    "gen2".to_string()
}

fn default_xpay_base_url() -> String {
    "https://ecommerce.nexi.it".to_string()
}

fn default_checkout_base_url() -> String {
    "https://api.checkout.example.com".to_string()
}
