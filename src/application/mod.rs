//! Application layer - use-case handlers orchestrating domain services,
//! ports, and gateway adapters.

pub mod handlers;
