//! Payment orchestration core for the car-rental booking flow.
//!
//! Hexagonal layout: `domain` holds the pure logic, `ports` the trait
//! contracts, `adapters` the PostgreSQL, gateway and HTTP edges, and
//! `application` the request handlers wiring them together.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

#[cfg(test)]
pub(crate) mod testing;
