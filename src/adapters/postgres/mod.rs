//! PostgreSQL adapters implementing the storage ports.

mod audit_log;
mod booking_repository;
mod payment_session_repository;

pub use audit_log::PostgresAuditLog;
pub use booking_repository::PostgresBookingRepository;
pub use payment_session_repository::PostgresPaymentSessionRepository;
