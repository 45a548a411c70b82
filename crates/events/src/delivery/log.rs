use async_trait::async_trait;

use crate::notifier::{NotifyError, Notifier};

/// Notifier that only records the alert in the log. Used when SMTP is not
/// configured.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, to: &str, message: &str) -> Result<(), NotifyError> {
        tracing::warn!(to, message, "Security alert (log delivery)");
        Ok(())
    }
}
