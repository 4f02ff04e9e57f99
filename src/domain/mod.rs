//! Domain layer - pure business logic with no I/O.

pub mod booking;
pub mod foundation;
pub mod payment;
pub mod pricing;
