//! Hosted-fields gateway adapter (XPay).
//!
//! The merchant-signed, multi-step flow:
//!
//! 1. session initialization: the browser loads the gateway's hosted fields
//!    with parameters signed over `alias` and `timeStamp` only
//! 2. payment submission: server-to-server call signed over the full
//!    parameter set including the payment token (`xpayNonce`)
//! 3. optional strong-customer-authentication redirect when the gateway
//!    answers with a challenge URL instead of a final result
//!
//! Both MAC orderings are presets of the shared codec, selected at
//! construction time. All configuration is injected here; nothing reads the
//! process environment mid-request.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use crate::domain::foundation::Timestamp;
use crate::domain::payment::{CallbackParams, MacCodec, PaymentError, PaymentSession};
use crate::ports::{FieldsGatewayClient, GatewayPaymentOutcome};

/// Parameters the booking UI posts to the gateway's hosted-fields script.
#[derive(Debug, Clone)]
pub struct XPayInitRequest {
    /// Gateway endpoint to load the hosted fields from.
    pub endpoint_url: String,
    /// Ordered form parameters, digest included under `mac`.
    pub params: Vec<(String, String)>,
}

#[derive(Debug, Deserialize)]
struct XPayPaymentResponse {
    esito: String,
    #[serde(rename = "codiceEsito")]
    status_code: Option<String>,
    #[serde(rename = "codAut")]
    authorization_code: Option<String>,
    #[serde(rename = "urlChallenge")]
    challenge_url: Option<String>,
    errore: Option<String>,
}

/// Hosted-fields gateway adapter.
pub struct XPayAdapter {
    alias: String,
    base_url: String,
    result_url: String,
    codec: MacCodec,
    http_client: reqwest::Client,
}

impl XPayAdapter {
    pub fn new(
        alias: impl Into<String>,
        base_url: impl Into<String>,
        result_url: impl Into<String>,
        codec: MacCodec,
    ) -> Self {
        Self {
            alias: alias.into(),
            base_url: base_url.into(),
            result_url: result_url.into(),
            codec,
            http_client: reqwest::Client::new(),
        }
    }

    /// Builds the signed hosted-fields initialization request.
    ///
    /// The init digest covers `alias` and `timeStamp` only; the remaining
    /// parameters are carried unsigned and echoed back in the callback.
    pub fn build_session_request(&self, session: &PaymentSession) -> XPayInitRequest {
        let timestamp = Timestamp::now().as_unix_millis().to_string();
        let mac = self
            .codec
            .sign(&[("alias", self.alias.as_str()), ("timeStamp", &timestamp)]);

        let params = vec![
            ("alias".to_string(), self.alias.clone()),
            (
                "codTrans".to_string(),
                session.gateway_transaction_id.as_str().to_string(),
            ),
            ("importo".to_string(), session.amount.as_decimal_string()),
            ("divisa".to_string(), session.currency.as_str().to_string()),
            ("timeStamp".to_string(), timestamp),
            ("url".to_string(), self.result_url.clone()),
            ("mac".to_string(), mac),
        ];

        XPayInitRequest {
            endpoint_url: format!("{}/api/hosted-fields/init", self.base_url),
            params,
        }
    }

    /// The signed parameter set for the payment submission step.
    ///
    /// Ordering follows the configured protocol preset; the digest covers
    /// the full set including the payment token.
    fn payment_params(&self, session: &PaymentSession, xpay_nonce: &str) -> Vec<(String, String)> {
        let timestamp = Timestamp::now().as_unix_millis().to_string();
        let values: BTreeMap<&str, String> = [
            ("alias", self.alias.clone()),
            (
                "codTrans",
                session.gateway_transaction_id.as_str().to_string(),
            ),
            ("importo", session.amount.as_decimal_string()),
            ("divisa", session.currency.as_str().to_string()),
            ("xpayNonce", xpay_nonce.to_string()),
            ("timeStamp", timestamp),
        ]
        .into_iter()
        .collect();

        let ordered: Vec<(&str, &str)> = self
            .codec
            .protocol()
            .payment_fields()
            .iter()
            .map(|&field| (field, values.get(field).map(String::as_str).unwrap_or("")))
            .collect();
        let mac = self.codec.sign(&ordered);

        let mut params: Vec<(String, String)> = ordered
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        params.push(("mac".to_string(), mac));
        params
    }

    fn interpret(payment: XPayPaymentResponse) -> GatewayPaymentOutcome {
        if let Some(url) = payment.challenge_url {
            return GatewayPaymentOutcome::ChallengeRequired { url };
        }

        let response_code = payment
            .status_code
            .clone()
            .unwrap_or_else(|| payment.esito.clone());

        let success = payment.esito.eq_ignore_ascii_case("OK")
            && payment.status_code.as_deref().map_or(true, |c| c == "0");
        if success {
            GatewayPaymentOutcome::Authorized {
                response_code,
                authorization_code: payment.authorization_code,
            }
        } else {
            if let Some(error) = payment.errore {
                warn!(error = %error, "gateway declined payment");
            }
            GatewayPaymentOutcome::Declined { response_code }
        }
    }

    /// Normalizes a form-decoded callback body.
    pub fn parse_callback(
        &self,
        form: BTreeMap<String, String>,
    ) -> Result<CallbackParams, PaymentError> {
        CallbackParams::from_form(form).map_err(PaymentError::from)
    }
}

#[async_trait]
impl FieldsGatewayClient for XPayAdapter {
    async fn submit_payment(
        &self,
        session: &PaymentSession,
        payment_token: &str,
    ) -> Result<GatewayPaymentOutcome, PaymentError> {
        let url = format!("{}/api/hosted-fields/payment", self.base_url);
        let params = self.payment_params(session, payment_token);

        let response = self
            .http_client
            .post(&url)
            .form(&params)
            .send()
            .await
            .map_err(|e| PaymentError::gateway_unavailable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "payment submission rejected by gateway");
            return Err(PaymentError::gateway_unavailable(format!(
                "Gateway returned {}",
                status
            )));
        }

        let payment: XPayPaymentResponse = response
            .json()
            .await
            .map_err(|e| PaymentError::gateway_unavailable(format!("Malformed response: {}", e)))?;

        Ok(Self::interpret(payment))
    }
}
