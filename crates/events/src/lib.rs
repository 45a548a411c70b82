//! Security alert delivery.
//!
//! - [`Notifier`] -- the delivery seam: send a message to a destination.
//! - [`delivery`] -- concrete notifiers (SMTP email, log-only).
//! - [`AlertDispatcher`] -- queue drained by a background task, so the
//!   request path never waits for a delivery and never sees its outcome.

pub mod delivery;
pub mod dispatcher;
pub mod notifier;

pub use delivery::email::{EmailConfig, EmailDelivery};
pub use delivery::log::LogNotifier;
pub use dispatcher::{Alert, AlertDispatcher};
pub use notifier::{NotifyError, Notifier};
