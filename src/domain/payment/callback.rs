//! Typed callback parameters from the hosted-fields gateway.
//!
//! Callbacks arrive as form-encoded key/value bodies. They are normalized
//! into [`CallbackParams`] exactly once at the boundary, with required-field
//! validation, instead of threading an untyped map through business logic.

use std::collections::BTreeMap;

use crate::domain::foundation::{DomainError, ErrorCode, MinorUnits};
use crate::domain::payment::mac::MacProtocol;

/// Primary result code value the gateway sends on success.
const RESULT_OK: &str = "OK";

/// Secondary status code value that must agree on success, where present.
const STATUS_OK: &str = "0";

/// Normalized parameters of one gateway callback.
///
/// The full raw body is retained alongside the typed fields so the audit
/// trail can capture forged or malformed attempts verbatim.
#[derive(Debug, Clone)]
pub struct CallbackParams {
    /// Transaction identifier (`codTrans`).
    pub transaction_id: String,
    /// Primary result code (`esito`).
    pub result: String,
    /// Amount as the gateway's decimal string (`importo`).
    pub amount: String,
    /// Currency code (`divisa`).
    pub currency: String,
    /// Supplied digest (`mac`), lowercase hex.
    pub mac: String,
    /// Authorization code (`codAut`), present on authorized payments.
    pub authorization_code: Option<String>,
    /// Secondary status code (`codiceEsito`), defined by Gen2 terminals.
    pub status_code: Option<String>,
    /// Gateway-side timestamp (`timeStamp`).
    pub timestamp: Option<String>,
    raw: BTreeMap<String, String>,
}

impl CallbackParams {
    /// Normalizes a form-decoded body, validating required fields.
    pub fn from_form(form: BTreeMap<String, String>) -> Result<Self, DomainError> {
        let required = |key: &str| -> Result<String, DomainError> {
            form.get(key)
                .filter(|v| !v.trim().is_empty())
                .cloned()
                .ok_or_else(|| {
                    DomainError::validation(key, format!("Missing required callback field '{}'", key))
                })
        };
        let optional = |key: &str| form.get(key).filter(|v| !v.is_empty()).cloned();

        Ok(Self {
            transaction_id: required("codTrans")?,
            result: required("esito")?,
            amount: required("importo")?,
            currency: required("divisa")?,
            mac: required("mac")?,
            authorization_code: optional("codAut"),
            status_code: optional("codiceEsito"),
            timestamp: optional("timeStamp"),
            raw: form,
        })
    }

    /// Gateway-reported success.
    ///
    /// The primary result code must be `OK` and, where the protocol defines
    /// one, the secondary status code must be `0`. Partial agreement is
    /// treated as failure.
    pub fn gateway_success(&self) -> bool {
        let primary = self.result.eq_ignore_ascii_case(RESULT_OK);
        let secondary = match &self.status_code {
            Some(code) => code == STATUS_OK,
            None => true,
        };
        primary && secondary
    }

    /// Structured failure code for `error_message` on failed sessions.
    pub fn failure_code(&self) -> String {
        match &self.status_code {
            Some(code) if code != STATUS_OK => format!("gateway_status_{}", code),
            _ => format!("gateway_result_{}", self.result.to_ascii_lowercase()),
        }
    }

    /// Parses `importo` into minor units.
    pub fn amount_minor(&self) -> Result<MinorUnits, DomainError> {
        MinorUnits::parse_decimal(&self.amount).map_err(|e| {
            DomainError::new(ErrorCode::ValidationFailed, e.to_string())
                .with_detail("field", "importo")
        })
    }

    /// Looks up a field by its wire name, typed fields first.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.raw.get(key).map(String::as_str)
    }

    /// The signing pairs for this callback in the protocol's canonical order.
    ///
    /// Fields the protocol orders but the callback omits contribute an empty
    /// value, keeping the signing string deterministic.
    pub fn mac_pairs(&self, protocol: MacProtocol) -> Vec<(&str, &str)> {
        protocol
            .callback_fields()
            .iter()
            .map(|&field| (field, self.get(field).unwrap_or("")))
            .collect()
    }

    /// The raw key/value capture for the audit trail. Nothing is stripped,
    /// including the supplied digest: audits retain the body verbatim.
    pub fn raw(&self) -> &BTreeMap<String, String> {
        &self.raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn valid_form() -> BTreeMap<String, String> {
        form(&[
            ("codTrans", "PAY-1700000000000-a1b2c3d4"),
            ("esito", "OK"),
            ("importo", "500.00"),
            ("divisa", "EUR"),
            ("mac", "deadbeef"),
            ("codAut", "AUTH42"),
        ])
    }

    #[test]
    fn from_form_extracts_typed_fields() {
        let params = CallbackParams::from_form(valid_form()).unwrap();
        assert_eq!(params.transaction_id, "PAY-1700000000000-a1b2c3d4");
        assert_eq!(params.result, "OK");
        assert_eq!(params.authorization_code.as_deref(), Some("AUTH42"));
        assert!(params.status_code.is_none());
    }

    #[test]
    fn from_form_rejects_missing_required_field() {
        let mut body = valid_form();
        body.remove("importo");
        let err = CallbackParams::from_form(body).unwrap_err();
        assert_eq!(err.code, crate::domain::foundation::ErrorCode::ValidationFailed);
        assert_eq!(err.details.get("field").map(String::as_str), Some("importo"));
    }

    #[test]
    fn from_form_rejects_blank_required_field() {
        let mut body = valid_form();
        body.insert("codTrans".to_string(), "  ".to_string());
        assert!(CallbackParams::from_form(body).is_err());
    }

    #[test]
    fn success_requires_primary_code() {
        let mut body = valid_form();
        body.insert("esito".to_string(), "KO".to_string());
        let params = CallbackParams::from_form(body).unwrap();
        assert!(!params.gateway_success());
    }

    #[test]
    fn success_requires_secondary_agreement() {
        let mut body = valid_form();
        body.insert("codiceEsito".to_string(), "101".to_string());
        let params = CallbackParams::from_form(body).unwrap();
        // esito=OK but codiceEsito!=0: partial agreement is failure.
        assert!(!params.gateway_success());

        let mut body = valid_form();
        body.insert("codiceEsito".to_string(), "0".to_string());
        let params = CallbackParams::from_form(body).unwrap();
        assert!(params.gateway_success());
    }

    #[test]
    fn failure_code_prefers_secondary_status() {
        let mut body = valid_form();
        body.insert("esito".to_string(), "KO".to_string());
        body.insert("codiceEsito".to_string(), "101".to_string());
        let params = CallbackParams::from_form(body).unwrap();
        assert_eq!(params.failure_code(), "gateway_status_101");

        let mut body = valid_form();
        body.insert("esito".to_string(), "ANNULLO".to_string());
        let params = CallbackParams::from_form(body).unwrap();
        assert_eq!(params.failure_code(), "gateway_result_annullo");
    }

    #[test]
    fn amount_minor_parses_decimal_string() {
        let params = CallbackParams::from_form(valid_form()).unwrap();
        assert_eq!(params.amount_minor().unwrap(), MinorUnits::new(50000));
    }

    #[test]
    fn mac_pairs_follow_protocol_ordering() {
        let params = CallbackParams::from_form(valid_form()).unwrap();
        let pairs = params.mac_pairs(MacProtocol::Gen1);
        let keys: Vec<&str> = pairs.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec!["codTrans", "esito", "importo", "divisa", "codAut"]);
        assert_eq!(pairs[4].1, "AUTH42");
    }

    #[test]
    fn mac_pairs_use_empty_value_for_absent_fields() {
        let mut body = valid_form();
        body.remove("codAut");
        let params = CallbackParams::from_form(body).unwrap();
        let pairs = params.mac_pairs(MacProtocol::Gen1);
        assert_eq!(pairs[4], ("codAut", ""));
    }

    #[test]
    fn raw_body_is_retained_for_audit() {
        let mut body = valid_form();
        body.insert("unexpected".to_string(), "extra".to_string());
        let params = CallbackParams::from_form(body).unwrap();
        assert_eq!(params.raw().get("unexpected").map(String::as_str), Some("extra"));
        assert_eq!(params.raw().get("mac").map(String::as_str), Some("deadbeef"));
    }
}
