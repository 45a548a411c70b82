//! Shared domain types and the error taxonomy used across the keyturn crates.

pub mod error;
pub mod types;
