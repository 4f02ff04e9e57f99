//! Foundation types shared across the domain layer.
//!
//! Value objects (ids, timestamps, money) and the common error vocabulary.
//! Nothing in this module performs I/O.

mod errors;
mod ids;
mod money;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{BookingId, GatewayTransactionId, PaymentSessionId};
pub use money::{Currency, MinorUnits};
pub use timestamp::Timestamp;
