//! Adapters - implementations of the ports plus the inbound HTTP surface.

pub mod hosted_checkout;
pub mod http;
pub mod postgres;
pub mod xpay;
