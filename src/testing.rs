//! In-memory mock ports shared by unit tests.
//!
//! These mirror the storage semantics the real adapters provide: the
//! session mock enforces one active session per booking on insert and a
//! status precondition on finalize, so concurrency-sensitive tests exercise
//! the same arbitration rules as PostgreSQL.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::booking::BookingPaymentMirror;
use crate::domain::foundation::{
    BookingId, DomainError, ErrorCode, GatewayTransactionId, Timestamp,
};
use crate::domain::payment::{PaymentError, PaymentSession};
use crate::ports::{
    AuditLog, AuditLogEntry, BookingRepository, CheckoutGatewayClient, CreateCheckoutSession,
    FieldsGatewayClient, FinalizeOutcome, GatewayPaymentOutcome, InsertResult,
    PaymentSessionRepository, RemoteCheckoutSession, SessionFinalization,
};

/// In-memory session repository with storage-equivalent arbitration.
pub struct MockSessionRepository {
    sessions: Mutex<Vec<PaymentSession>>,
    /// Linked booking store, so finalize applies the booking mirror in the
    /// same logical operation like the real adapter does.
    bookings: Option<std::sync::Arc<MockBookingRepository>>,
}

impl MockSessionRepository {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(Vec::new()),
            bookings: None,
        }
    }

    /// Links a booking store for transactional finalize semantics.
    pub fn with_bookings(bookings: std::sync::Arc<MockBookingRepository>) -> Self {
        Self {
            sessions: Mutex::new(Vec::new()),
            bookings: Some(bookings),
        }
    }

    /// Snapshot of every stored session.
    pub fn all(&self) -> Vec<PaymentSession> {
        self.sessions.lock().unwrap().clone()
    }

    /// Seeds a pre-existing session.
    pub fn seed(&self, session: PaymentSession) {
        self.sessions.lock().unwrap().push(session);
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

        // Status precondition: terminal sessions are never re-mutated.
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

        if let Some(bookings) = &self.bookings {
            bookings.apply_mirror_sync(&session.booking_id, &finalization.booking_mirror)?;
        }
        Ok(FinalizeOutcome::Applied)
    }
}

/// In-memory booking repository.
pub struct MockBookingRepository {
    bookings: Mutex<HashMap<BookingId, Option<BookingPaymentMirror>>>,
}

impl MockBookingRepository {
    pub fn new() -> Self {
        Self {
            bookings: Mutex::new(HashMap::new()),
        }
    }

    /// Creates a repository containing one booking without payment state.
    pub fn with_booking(booking_id: BookingId) -> Self {
        let repo = Self::new();
        repo.bookings.lock().unwrap().insert(booking_id, None);
        repo
    }

    /// Synchronous mirror write used by the linked session mock.
    pub fn apply_mirror_sync(
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

    /// The last mirror applied to a booking, if any.
    pub fn mirror_for(&self, booking_id: &BookingId) -> Option<BookingPaymentMirror> {
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
}

/// In-memory append-only audit log.
pub struct MockAuditLog {
    entries: Mutex<Vec<AuditLogEntry>>,
}

impl MockAuditLog {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    pub fn entries(&self) -> Vec<AuditLogEntry> {
        self.entries.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuditLog for MockAuditLog {
    async fn append(&self, entry: AuditLogEntry) -> Result<(), DomainError> {
        self.entries.lock().unwrap().push(entry);
        Ok(())
    }
}

/// Checkout gateway client returning canned responses.
pub struct MockCheckoutGateway {
    fail: bool,
}

impl MockCheckoutGateway {
    pub fn new() -> Self {
        Self { fail: false }
    }

    /// A client whose gateway is unreachable.
    pub fn unavailable() -> Self {
        Self { fail: true }
    }
}

#[async_trait]
impl CheckoutGatewayClient for MockCheckoutGateway {
    async fn create_session(
        &self,
        request: &CreateCheckoutSession,
    ) -> Result<RemoteCheckoutSession, PaymentError> {
        if self.fail {
            return Err(PaymentError::gateway_unavailable("connection refused"));
        }
        Ok(RemoteCheckoutSession {
            handle: format!("cs_{}", request.transaction_id.as_str()),
            redirect_url: format!(
                "https://checkout.example.test/pay/{}",
                request.transaction_id.as_str()
            ),
        })
    }
}

/// Hosted-fields gateway client returning a canned outcome.
pub struct MockFieldsGateway {
    outcome: Option<GatewayPaymentOutcome>,
}

impl MockFieldsGateway {
    pub fn authorizing(authorization_code: &str) -> Self {
        Self {
            outcome: Some(GatewayPaymentOutcome::Authorized {
                response_code: "0".to_string(),
                authorization_code: Some(authorization_code.to_string()),
            }),
        }
    }

    pub fn declining(response_code: &str) -> Self {
        Self {
            outcome: Some(GatewayPaymentOutcome::Declined {
                response_code: response_code.to_string(),
            }),
        }
    }

    pub fn challenging(url: &str) -> Self {
        Self {
            outcome: Some(GatewayPaymentOutcome::ChallengeRequired {
                url: url.to_string(),
            }),
        }
    }

    /// A client whose gateway is unreachable.
    pub fn unavailable() -> Self {
        Self { outcome: None }
    }
}

#[async_trait]
impl FieldsGatewayClient for MockFieldsGateway {
    async fn submit_payment(
        &self,
        _session: &PaymentSession,
        _payment_token: &str,
    ) -> Result<GatewayPaymentOutcome, PaymentError> {
        match &self.outcome {
            Some(outcome) => Ok(outcome.clone()),
            None => Err(PaymentError::gateway_unavailable("connection refused")),
        }
    }
}
