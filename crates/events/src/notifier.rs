use async_trait::async_trait;

use crate::delivery::email::EmailError;

/// Error type for notification delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error(transparent)]
    Email(#[from] EmailError),

    /// The channel could not accept the message.
    #[error("Notifier unavailable: {0}")]
    Unavailable(String),
}

/// Delivers a human-readable message to a destination address.
///
/// Delivery semantics (retry, queuing) belong to the implementation.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, to: &str, message: &str) -> Result<(), NotifyError>;
}
