//! Payment domain - sessions, MAC codec, registry and callback processing.

pub mod callback;
pub mod errors;
pub mod mac;
pub mod processor;
pub mod registry;
pub mod session;

pub use callback::CallbackParams;
pub use errors::PaymentError;
pub use mac::{MacCodec, MacProtocol};
pub use processor::{CallbackDisposition, CallbackOutcome, CallbackProcessor, CheckoutNotification};
pub use registry::{OpenSessionRequest, TransactionRegistry};
pub use session::{MacVerification, PaymentSession, PaymentStatus};
