//! Ports - contracts between the domain and the outside world.
//!
//! Adapters implement these traits; domain services and application
//! handlers depend only on the traits.

mod audit_log;
mod booking_repository;
mod checkout_gateway;
mod fields_gateway;
mod payment_session_repository;

pub use audit_log::{AuditAction, AuditLog, AuditLogEntry};
pub use booking_repository::BookingRepository;
pub use checkout_gateway::{CheckoutGatewayClient, CreateCheckoutSession, RemoteCheckoutSession};
pub use fields_gateway::{FieldsGatewayClient, GatewayPaymentOutcome};
pub use payment_session_repository::{
    FinalizeOutcome, InsertResult, PaymentSessionRepository, SessionFinalization,
};
