//! Fire-and-forget alert queue.
//!
//! [`AlertDispatcher::submit`] never blocks and never fails from the caller's
//! point of view. A single background task drains the queue and hands each
//! [`Alert`] to the configured [`Notifier`]; delivery errors end up in the log
//! and nowhere else. The task exits once every dispatcher clone is dropped and
//! the queue is empty.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::notifier::Notifier;

/// A security alert waiting to be delivered.
#[derive(Debug, Clone)]
pub struct Alert {
    /// Destination address.
    pub to: String,
    /// Human-readable message body.
    pub message: String,
    /// Subject of the affected session, for the log only.
    pub user_id: String,
    pub raised_at: DateTime<Utc>,
}

impl Alert {
    pub fn new(
        to: impl Into<String>,
        message: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            to: to.into(),
            message: message.into(),
            user_id: user_id.into(),
            raised_at: Utc::now(),
        }
    }
}

/// Sending half of the alert queue. Cheap to clone.
#[derive(Clone)]
pub struct AlertDispatcher {
    sender: mpsc::UnboundedSender<Alert>,
}

impl AlertDispatcher {
    /// Start the delivery task and return the dispatcher feeding it.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(notifier: Arc<dyn Notifier>) -> (Self, JoinHandle<()>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let handle = tokio::spawn(Self::run(notifier, receiver));
        (Self { sender }, handle)
    }

    /// Queue an alert for delivery. Returns immediately.
    pub fn submit(&self, alert: Alert) {
        if let Err(e) = self.sender.send(alert) {
            tracing::error!(
                user_id = %e.0.user_id,
                "Alert delivery task has stopped, dropping alert"
            );
        }
    }

    async fn run(notifier: Arc<dyn Notifier>, mut receiver: mpsc::UnboundedReceiver<Alert>) {
        while let Some(alert) = receiver.recv().await {
            match notifier.send(&alert.to, &alert.message).await {
                Ok(()) => {
                    tracing::debug!(to = %alert.to, user_id = %alert.user_id, "Alert delivered");
                }
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        to = %alert.to,
                        user_id = %alert.user_id,
                        raised_at = %alert.raised_at,
                        "Failed to deliver security alert"
                    );
                }
            }
        }
        tracing::info!("Alert queue closed, delivery task shutting down");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
