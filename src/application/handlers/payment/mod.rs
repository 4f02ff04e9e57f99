//! Payment application handlers.

mod open_session;
mod process_payment;

pub use open_session::{
    OpenSessionCommand, OpenSessionHandler, OpenSessionResult, PaymentFlow,
};
pub use process_payment::{ProcessPaymentCommand, ProcessPaymentHandler, ProcessPaymentResult};
