//! Delivery channels for security alerts.

pub mod email;
pub mod log;
