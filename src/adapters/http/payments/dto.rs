//! HTTP DTOs for the payment endpoints.
//!
//! These types define the JSON boundary between the booking UI and the
//! application layer. Amounts cross the wire in minor units.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::application::handlers::payment::{PaymentFlow, ProcessPaymentResult};
use crate::domain::foundation::{MinorUnits, Timestamp};
use crate::domain::pricing::{BookingDetails, BookingExtra, InsuranceTier};

/// Request to open a payment session for a booking.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenSessionRequest {
    /// Booking identifier (UUID).
    pub booking_id: String,
    /// Pricing inputs, re-validated server side.
    pub booking_details: BookingDetailsRequest,
    /// Client-submitted total in minor units.
    pub total_amount: i64,
    /// ISO 4217 alphabetic code.
    pub currency: String,
    pub payer_email: String,
    #[serde(default)]
    pub payer_name: Option<String>,
    pub flow: FlowRequest,
}

/// Which gateway flow the client wants to drive.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowRequest {
    HostedFields,
    HostedCheckout,
}

impl From<FlowRequest> for PaymentFlow {
    fn from(flow: FlowRequest) -> Self {
        match flow {
            FlowRequest::HostedFields => PaymentFlow::HostedFields,
            FlowRequest::HostedCheckout => PaymentFlow::HostedCheckout,
        }
    }
}

/// Pricing inputs as submitted by the booking UI.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingDetailsRequest {
    pub pickup_at: DateTime<Utc>,
    pub dropoff_at: DateTime<Utc>,
    /// Base daily rate in minor units.
    pub daily_rate: i64,
    pub insurance_tier: InsuranceTier,
    #[serde(default)]
    pub deposit_waiver: bool,
    #[serde(default)]
    pub extras: Vec<ExtraRequest>,
}

/// An itemized extra on the booking.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtraRequest {
    pub code: String,
    /// Price per unit in minor units.
    pub unit_amount: i64,
    pub quantity: u32,
}

impl From<BookingDetailsRequest> for BookingDetails {
    fn from(request: BookingDetailsRequest) -> Self {
        BookingDetails {
            pickup_at: Timestamp::from_datetime(request.pickup_at),
            dropoff_at: Timestamp::from_datetime(request.dropoff_at),
            daily_rate: MinorUnits::new(request.daily_rate),
            insurance_tier: request.insurance_tier,
            deposit_waiver: request.deposit_waiver,
            extras: request
                .extras
                .into_iter()
                .map(|e| BookingExtra {
                    code: e.code,
                    unit_amount: MinorUnits::new(e.unit_amount),
                    quantity: e.quantity,
                })
                .collect(),
        }
    }
}

/// Request to submit the tokenized hosted-fields payment.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessPaymentRequest {
    pub transaction_id: String,
    /// One-time token minted by the gateway's hosted fields.
    pub payment_token: String,
}

/// One gateway form parameter, order preserved.
#[derive(Debug, Clone, Serialize)]
pub struct GatewayParamResponse {
    pub name: String,
    pub value: String,
}

/// Response to an open-session request; shape depends on the flow.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged, rename_all_fields = "camelCase")]
pub enum OpenSessionResponse {
    HostedFields {
        transaction_id: String,
        endpoint_url: String,
        gateway_params: Vec<GatewayParamResponse>,
    },
    HostedCheckout {
        transaction_id: String,
        redirect_url: String,
    },
}

/// Response to a payment submission.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessPaymentResponse {
    /// `completed`, `failed`, `challenge_required` or `already_final`.
    pub outcome: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorization_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub challenge_url: Option<String>,
}

impl From<ProcessPaymentResult> for ProcessPaymentResponse {
    fn from(result: ProcessPaymentResult) -> Self {
        match result {
            ProcessPaymentResult::Completed { authorization_code } => Self {
                outcome: "completed".to_string(),
                authorization_code,
                response_code: None,
                challenge_url: None,
            },
            ProcessPaymentResult::Failed { response_code } => Self {
                outcome: "failed".to_string(),
                authorization_code: None,
                response_code: Some(response_code),
                challenge_url: None,
            },
            ProcessPaymentResult::ChallengeRequired { url } => Self {
                outcome: "challenge_required".to_string(),
                authorization_code: None,
                response_code: None,
                challenge_url: Some(url),
            },
            ProcessPaymentResult::AlreadyFinal => Self {
                outcome: "already_final".to_string(),
                authorization_code: None,
                response_code: None,
                challenge_url: None,
            },
        }
    }
}

/// Standard error response for API errors.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub error_code: String,
    /// Human-readable error message.
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_session_request_deserializes() {
        let json = r#"{
            "bookingId": "7b09ae15-8a93-49f9-a2b2-0f1c71b3a2af",
            "bookingDetails": {
                "pickupAt": "2026-09-01T09:00:00Z",
                "dropoffAt": "2026-09-06T09:00:00Z",
                "dailyRate": 10000,
                "insuranceTier": "standard",
                "extras": [{"code": "child_seat", "unitAmount": 2500, "quantity": 1}]
            },
            "totalAmount": 57500,
            "currency": "EUR",
            "payerEmail": "payer@example.com",
            "flow": "hosted_fields"
        }"#;
        let request: OpenSessionRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.total_amount, 57500);
        assert_eq!(request.booking_details.extras.len(), 1);
        assert!(matches!(request.flow, FlowRequest::HostedFields));
        assert!(!request.booking_details.deposit_waiver);
        assert!(request.payer_name.is_none());
    }

    #[test]
    fn booking_details_request_maps_to_domain() {
        let request = BookingDetailsRequest {
            pickup_at: Utc::now(),
            dropoff_at: Utc::now() + chrono::Duration::days(3),
            daily_rate: 8000,
            insurance_tier: InsuranceTier::Premium,
            deposit_waiver: true,
            extras: vec![ExtraRequest {
                code: "gps".to_string(),
                unit_amount: 1000,
                quantity: 2,
            }],
        };

        let details = BookingDetails::from(request);
        assert_eq!(details.daily_rate.value(), 8000);
        assert_eq!(details.extras[0].line_total().value(), 2000);
        assert!(details.deposit_waiver);
    }

    #[test]
    fn hosted_fields_response_serializes_camel_case() {
        let response = OpenSessionResponse::HostedFields {
            transaction_id: "PAY-1700000000000-ab12cd34".to_string(),
            endpoint_url: "https://gateway.example.test/api/hosted-fields/init".to_string(),
            gateway_params: vec![GatewayParamResponse {
                name: "alias".to_string(),
                value: "ALIAS_WEB_00001".to_string(),
            }],
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains(r#""transactionId":"PAY-1700000000000-ab12cd34""#));
        assert!(json.contains(r#""endpointUrl""#));
        assert!(json.contains(r#""gatewayParams""#));
        assert!(!json.contains("transaction_id"));
    }

    #[test]
    fn hosted_checkout_response_serializes_camel_case() {
        let response = OpenSessionResponse::HostedCheckout {
            transaction_id: "PAY-1700000000000-ab12cd34".to_string(),
            redirect_url: "https://checkout.example.test/s/cs_1".to_string(),
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains(r#""transactionId""#));
        assert!(json.contains(r#""redirectUrl":"https://checkout.example.test/s/cs_1""#));
        assert!(!json.contains("redirect_url"));
    }

    #[test]
    fn process_response_omits_absent_fields() {
        let response = ProcessPaymentResponse::from(ProcessPaymentResult::Completed {
            authorization_code: Some("AUTH42".to_string()),
        });
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains(r#""outcome":"completed""#));
        assert!(json.contains("AUTH42"));
        assert!(!json.contains("responseCode"));
        assert!(!json.contains("challengeUrl"));
    }

    #[test]
    fn challenge_response_carries_url() {
        let response = ProcessPaymentResponse::from(ProcessPaymentResult::ChallengeRequired {
            url: "https://acs.example.test/challenge".to_string(),
        });
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("challenge_required"));
        assert!(json.contains("acs.example.test"));
    }
}
