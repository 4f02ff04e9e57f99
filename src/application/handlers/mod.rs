//! Application handlers, grouped by domain area.

pub mod payment;
