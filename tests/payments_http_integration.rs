//! Integration tests for the payment HTTP endpoints.
//!
//! These exercise the HTTP layer wiring end to end against mock ports:
//! open a session, submit a payment, and confirm the gateway's callback
//! and webhook paths drive the session and booking to their final state.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::extract::{Form, Json, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use hmac::{Hmac, Mac};
use secrecy::SecretString;
use serde_json::json;
use sha2::Sha256;
use uuid::Uuid;

use booking_payments::adapters::hosted_checkout::{HostedCheckoutAdapter, HostedCheckoutConfig};
use booking_payments::adapters::http::payments::dto::{
    BookingDetailsRequest, FlowRequest, OpenSessionRequest, ProcessPaymentRequest,
};
use booking_payments::adapters::http::payments::handlers::{
    checkout_webhook, open_session, process_payment, xpay_callback, PaymentsAppState,
};
use booking_payments::adapters::xpay::XPayAdapter;
use booking_payments::domain::booking::{BookingPaymentMirror, BookingPaymentStatus};
use booking_payments::domain::foundation::{
    BookingId, DomainError, ErrorCode, GatewayTransactionId, Timestamp,
};
use booking_payments::domain::payment::{
    CallbackProcessor, MacCodec, MacProtocol, PaymentError, PaymentSession, PaymentStatus,
    TransactionRegistry,
};
use booking_payments::domain::pricing::{InsuranceTier, PriceValidator};
use booking_payments::ports::{
    AuditAction, AuditLog, AuditLogEntry, BookingRepository, CheckoutGatewayClient,
    CreateCheckoutSession, FieldsGatewayClient, FinalizeOutcome, GatewayPaymentOutcome,
    InsertResult, PaymentSessionRepository, RemoteCheckoutSession, SessionFinalization,
};

const MAC_SECRET: &str = "segreto";
const WEBHOOK_SECRET: &str = "whsec_test_secret";

// =============================================================================
// Test Infrastructure
// =============================================================================

struct MockSessionRepository {
    sessions: Mutex<Vec<PaymentSession>>,
    bookings: Arc<MockBookingRepository>,
}

impl MockSessionRepository {
    fn new(bookings: Arc<MockBookingRepository>) -> Self {
        Self {
            sessions: Mutex::new(Vec::new()),
            bookings,
        }
    }

    fn all(&self) -> Vec<PaymentSession> {
        self.sessions.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentSessionRepository for MockSessionRepository {
    async fn insert(&self, session: &PaymentSession) -> Result<InsertResult, DomainError> {
        let mut sessions = self.sessions.lock().unwrap();
        let conflict = sessions
            .iter()
            .any(|s| s.booking_id == session.booking_id && s.status.is_active());
        if conflict {
            return Ok(InsertResult::Conflict);
        }
        sessions.push(session.clone());
        Ok(InsertResult::Inserted)
    }

    async fn find_active_for_booking(
        &self,
        booking_id: &BookingId,
    ) -> Result<Option<PaymentSession>, DomainError> {
        Ok(self
            .sessions
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.booking_id == *booking_id && s.status.is_active())
            .cloned())
    }

    async fn find_by_transaction_id(
        &self,
        transaction_id: &GatewayTransactionId,
    ) -> Result<Option<PaymentSession>, DomainError> {
        Ok(self
            .sessions
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.gateway_transaction_id == *transaction_id)
            .cloned())
    }

    async fn mark_pending(
        &self,
        transaction_id: &GatewayTransactionId,
        now: Timestamp,
    ) -> Result<(), DomainError> {
        let mut sessions = self.sessions.lock().unwrap();
        let session = sessions
            .iter_mut()
            .find(|s| s.gateway_transaction_id == *transaction_id)
            .ok_or_else(|| DomainError::new(ErrorCode::SessionNotFound, "no such session"))?;
        session.mark_pending(now)?;
        Ok(())
    }

    async fn finalize(
        &self,
        finalization: &SessionFinalization,
    ) -> Result<FinalizeOutcome, DomainError> {
        let mut sessions = self.sessions.lock().unwrap();
        let session = sessions
            .iter_mut()
            .find(|s| s.gateway_transaction_id == finalization.transaction_id)
            .ok_or_else(|| DomainError::new(ErrorCode::SessionNotFound, "no such session"))?;

        if session.status.is_terminal() {
            return Ok(FinalizeOutcome::AlreadyTerminal);
        }

        session.status = finalization.status;
        session.gateway_response_code = finalization.gateway_response_code.clone();
        session.authorization_code = finalization.authorization_code.clone();
        session.mac_verification = finalization.mac_verification;
        session.completed_at = finalization.completed_at;
        session.error_message = finalization.error_message.clone();
        session.updated_at = Timestamp::now();

        self.bookings
            .apply_mirror_sync(&session.booking_id, &finalization.booking_mirror)?;
        Ok(FinalizeOutcome::Applied)
    }
}

struct MockBookingRepository {
    bookings: Mutex<HashMap<BookingId, Option<BookingPaymentMirror>>>,
}

impl MockBookingRepository {
    fn with_booking(booking_id: BookingId) -> Self {
        let mut bookings = HashMap::new();
        bookings.insert(booking_id, None);
        Self {
            bookings: Mutex::new(bookings),
        }
    }

    fn apply_mirror_sync(
        &self,
        booking_id: &BookingId,
        mirror: &BookingPaymentMirror,
    ) -> Result<(), DomainError> {
        let mut bookings = self.bookings.lock().unwrap();
        match bookings.get_mut(booking_id) {
            Some(slot) => {
                *slot = Some(mirror.clone());
                Ok(())
            }
            None => Err(DomainError::new(
                ErrorCode::BookingNotFound,
                format!("booking {} not found", booking_id),
            )),
        }
    }

    fn mirror_for(&self, booking_id: &BookingId) -> Option<BookingPaymentMirror> {
        self.bookings
            .lock()
            .unwrap()
            .get(booking_id)
            .cloned()
            .flatten()
    }
}

#[async_trait]
impl BookingRepository for MockBookingRepository {
    async fn exists(&self, booking_id: &BookingId) -> Result<bool, DomainError> {
        Ok(self.bookings.lock().unwrap().contains_key(booking_id))
    }

    async fn apply_payment_mirror(
        &self,
        booking_id: &BookingId,
        mirror: &BookingPaymentMirror,
    ) -> Result<(), DomainError> {
        self.apply_mirror_sync(booking_id, mirror)
    }
}

struct MockAuditLog {
    entries: Mutex<Vec<AuditLogEntry>>,
}

impl MockAuditLog {
    fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    fn actions(&self) -> Vec<AuditAction> {
        self.entries.lock().unwrap().iter().map(|e| e.action).collect()
    }
}

#[async_trait]
impl AuditLog for MockAuditLog {
    async fn append(&self, entry: AuditLogEntry) -> Result<(), DomainError> {
        self.entries.lock().unwrap().push(entry);
        Ok(())
    }
}

struct MockCheckoutGateway;

#[async_trait]
impl CheckoutGatewayClient for MockCheckoutGateway {
    async fn create_session(
        &self,
        request: &CreateCheckoutSession,
    ) -> Result<RemoteCheckoutSession, PaymentError> {
        Ok(RemoteCheckoutSession {
            handle: format!("cs_{}", request.transaction_id.as_str()),
            redirect_url: format!(
                "https://checkout.example.test/pay/{}",
                request.transaction_id.as_str()
            ),
        })
    }
}

struct MockFieldsGateway;

#[async_trait]
impl FieldsGatewayClient for MockFieldsGateway {
    async fn submit_payment(
        &self,
        _session: &PaymentSession,
        _payment_token: &str,
    ) -> Result<GatewayPaymentOutcome, PaymentError> {
        Ok(GatewayPaymentOutcome::Authorized {
            response_code: "0".to_string(),
            authorization_code: Some("AUTH42".to_string()),
        })
    }
}

// =============================================================================
// Fixtures
// =============================================================================

struct Fixture {
    state: PaymentsAppState,
    sessions: Arc<MockSessionRepository>,
    bookings: Arc<MockBookingRepository>,
    audit: Arc<MockAuditLog>,
    booking_id: BookingId,
}

fn codec() -> MacCodec {
    MacCodec::new(MacProtocol::Gen2, SecretString::new(MAC_SECRET.to_string()))
}

fn fixture() -> Fixture {
    let booking_id = BookingId::from_uuid(Uuid::new_v4());
    let bookings = Arc::new(MockBookingRepository::with_booking(booking_id));
    let sessions = Arc::new(MockSessionRepository::new(bookings.clone()));
    let audit = Arc::new(MockAuditLog::new());

    let registry = Arc::new(TransactionRegistry::new(
        sessions.clone(),
        bookings.clone(),
        audit.clone(),
        PriceValidator::default(),
    ));
    let processor = Arc::new(CallbackProcessor::new(
        sessions.clone(),
        audit.clone(),
        codec(),
    ));
    let xpay = Arc::new(XPayAdapter::new(
        "ALIAS_WEB_00001",
        "https://gateway.example.test",
        "https://rentals.example.com/payment/result",
        codec(),
    ));
    let hosted_checkout = Arc::new(HostedCheckoutAdapter::new(HostedCheckoutConfig::new(
        "ck_test_key",
        WEBHOOK_SECRET,
    )));

    let state = PaymentsAppState {
        registry,
        sessions: sessions.clone(),
        audit: audit.clone(),
        processor,
        xpay,
        fields_gateway: Arc::new(MockFieldsGateway),
        checkout: Arc::new(MockCheckoutGateway),
        hosted_checkout,
        checkout_return_url: "https://rentals.example.com/payment/return".to_string(),
    };

    Fixture {
        state,
        sessions,
        bookings,
        audit,
        booking_id,
    }
}

fn open_request(booking_id: BookingId, amount: i64, flow: FlowRequest) -> OpenSessionRequest {
    let pickup = chrono::Utc::now();
    OpenSessionRequest {
        booking_id: booking_id.to_string(),
        booking_details: BookingDetailsRequest {
            pickup_at: pickup,
            dropoff_at: pickup + chrono::Duration::days(5),
            daily_rate: 10000,
            insurance_tier: InsuranceTier::Basic,
            deposit_waiver: false,
            extras: vec![],
        },
        total_amount: amount,
        currency: "EUR".to_string(),
        payer_email: "payer@example.com".to_string(),
        payer_name: Some("Test Payer".to_string()),
        flow,
    }
}

fn callback_form(transaction_id: &GatewayTransactionId, esito: &str) -> BTreeMap<String, String> {
    let mut form = BTreeMap::new();
    form.insert("codTrans".to_string(), transaction_id.as_str().to_string());
    form.insert("esito".to_string(), esito.to_string());
    form.insert("importo".to_string(), "500.00".to_string());
    form.insert("divisa".to_string(), "EUR".to_string());
    form.insert("codiceEsito".to_string(), "0".to_string());
    form.insert("timeStamp".to_string(), "1700000000000".to_string());
    let pairs = vec![
        ("codTrans", transaction_id.as_str()),
        ("esito", esito),
        ("importo", "500.00"),
        ("divisa", "EUR"),
        ("codiceEsito", "0"),
        ("timeStamp", "1700000000000"),
    ];
    form.insert("mac".to_string(), codec().sign(&pairs));
    form
}

fn signed_webhook(
    booking_id: BookingId,
    transaction_id: &GatewayTransactionId,
) -> (HeaderMap, Vec<u8>) {
    let payload = serde_json::to_vec(&json!({
        "id": "evt_123",
        "type": "checkout.completed",
        "created": chrono::Utc::now().timestamp(),
        "data": {
            "object": {
                "id": format!("cs_{}", transaction_id.as_str()),
                "status": "complete",
                "payment_status": "paid",
                "metadata": {
                    "booking_id": booking_id.to_string(),
                    "transaction_id": transaction_id.as_str(),
                }
            }
        }
    }))
    .unwrap();

    let timestamp = chrono::Utc::now().timestamp();
    let signed_payload = format!("{}.{}", timestamp, String::from_utf8_lossy(&payload));
    let mut mac = Hmac::<Sha256>::new_from_slice(WEBHOOK_SECRET.as_bytes()).unwrap();
    mac.update(signed_payload.as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());

    let mut headers = HeaderMap::new();
    headers.insert(
        "Checkout-Signature",
        HeaderValue::from_str(&format!("t={},v1={}", timestamp, signature)).unwrap(),
    );
    (headers, payload)
}

async fn opened_transaction(f: &Fixture, flow: FlowRequest) -> GatewayTransactionId {
    let response = open_session(
        State(f.state.clone()),
        Json(open_request(f.booking_id, 50000, flow)),
    )
    .await
    .map(IntoResponse::into_response)
    .unwrap_or_else(IntoResponse::into_response);
    assert_eq!(response.status(), StatusCode::CREATED);
    f.sessions.all()[0].gateway_transaction_id.clone()
}

// =============================================================================
// Hosted-fields flow
// =============================================================================

#[tokio::test]
async fn hosted_fields_flow_completes_via_payment_submission() {
    let f = fixture();
    let transaction_id = opened_transaction(&f, FlowRequest::HostedFields).await;

    let response = process_payment(
        State(f.state.clone()),
        Json(ProcessPaymentRequest {
            transaction_id: transaction_id.as_str().to_string(),
            payment_token: "nonce-abc".to_string(),
        }),
    )
    .await
    .unwrap()
    .into_response();
    assert_eq!(response.status(), StatusCode::OK);

    let session = f.sessions.all().into_iter().next().unwrap();
    assert_eq!(session.status, PaymentStatus::Completed);
    assert_eq!(session.authorization_code.as_deref(), Some("AUTH42"));
    let mirror = f.bookings.mirror_for(&f.booking_id).unwrap();
    assert_eq!(mirror.payment_status, BookingPaymentStatus::Confirmed);
    assert_eq!(
        f.audit.actions(),
        vec![AuditAction::Init, AuditAction::Process]
    );
}

#[tokio::test]
async fn callback_completes_session_and_redelivery_is_idempotent() {
    let f = fixture();
    let transaction_id = opened_transaction(&f, FlowRequest::HostedFields).await;

    let form = callback_form(&transaction_id, "OK");
    let first = xpay_callback(State(f.state.clone()), Form(form.clone()))
        .await
        .unwrap()
        .into_response();
    assert_eq!(first.status(), StatusCode::OK);

    // The gateway redelivers; same reply, no second transition.
    let second = xpay_callback(State(f.state.clone()), Form(form))
        .await
        .unwrap()
        .into_response();
    assert_eq!(second.status(), StatusCode::OK);

    let session = f.sessions.all().into_iter().next().unwrap();
    assert_eq!(session.status, PaymentStatus::Completed);
    assert_eq!(
        f.audit.actions(),
        vec![
            AuditAction::Init,
            AuditAction::Callback,
            AuditAction::Callback
        ]
    );
}

#[tokio::test]
async fn amount_mismatch_is_rejected_with_no_session() {
    let f = fixture();
    let response = open_session(
        State(f.state.clone()),
        Json(open_request(f.booking_id, 48000, FlowRequest::HostedFields)),
    )
    .await
    .map(IntoResponse::into_response)
    .unwrap_or_else(IntoResponse::into_response);

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(f.sessions.all().is_empty());
    assert!(f.audit.actions().is_empty());
}

#[tokio::test]
async fn second_open_for_same_booking_conflicts() {
    let f = fixture();
    opened_transaction(&f, FlowRequest::HostedFields).await;

    let response = open_session(
        State(f.state.clone()),
        Json(open_request(f.booking_id, 50000, FlowRequest::HostedFields)),
    )
    .await
    .map(IntoResponse::into_response)
    .unwrap_or_else(IntoResponse::into_response);

    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(f.sessions.all().len(), 1);
}

// =============================================================================
// Hosted-checkout flow
// =============================================================================

#[tokio::test]
async fn hosted_checkout_flow_completes_via_signed_webhook() {
    let f = fixture();
    let transaction_id = opened_transaction(&f, FlowRequest::HostedCheckout).await;

    // Payer was handed to the gateway at open time.
    assert_eq!(f.sessions.all()[0].status, PaymentStatus::Pending);

    let (headers, payload) = signed_webhook(f.booking_id, &transaction_id);
    let response = checkout_webhook(
        State(f.state.clone()),
        headers,
        axum::body::Bytes::from(payload),
    )
    .await
    .unwrap()
    .into_response();
    assert_eq!(response.status(), StatusCode::OK);

    let session = f.sessions.all().into_iter().next().unwrap();
    assert_eq!(session.status, PaymentStatus::Completed);
    let mirror = f.bookings.mirror_for(&f.booking_id).unwrap();
    assert_eq!(mirror.payment_status, BookingPaymentStatus::Confirmed);
    assert_eq!(
        f.audit.actions(),
        vec![AuditAction::Init, AuditAction::Webhook]
    );
}

#[tokio::test]
async fn webhook_with_wrong_signature_is_rejected() {
    let f = fixture();
    let transaction_id = opened_transaction(&f, FlowRequest::HostedCheckout).await;

    let (_, payload) = signed_webhook(f.booking_id, &transaction_id);
    let mut headers = HeaderMap::new();
    headers.insert(
        "Checkout-Signature",
        HeaderValue::from_str(&format!(
            "t={},v1={}",
            chrono::Utc::now().timestamp(),
            "00".repeat(32)
        ))
        .unwrap(),
    );

    let response = checkout_webhook(
        State(f.state.clone()),
        headers,
        axum::body::Bytes::from(payload),
    )
    .await
    .map(IntoResponse::into_response)
    .unwrap_or_else(IntoResponse::into_response);

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    // Session untouched.
    assert_eq!(f.sessions.all()[0].status, PaymentStatus::Pending);
}
