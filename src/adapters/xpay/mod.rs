//! Hosted-fields gateway adapter.

mod adapter;

pub use adapter::{XPayAdapter, XPayInitRequest};
