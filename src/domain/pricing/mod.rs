//! Authoritative server-side pricing.

mod quote;
mod validator;

pub use quote::{BookingDetails, BookingExtra, InsuranceTier, RateTable};
pub use validator::{PriceValidator, AMOUNT_TOLERANCE_MINOR};
