//! Notification and navigation collaborators
//!
//! The result view never renders anything itself. User-facing messages go to
//! a [`Notifier`] and the "back to submission" signal goes to a
//! [`Navigator`]; both are fire and forget.

use crate::types::{Event, Notification, NotificationLevel};
use tokio::sync::broadcast;

/// Presents transient success/error messages to the user
pub trait Notifier: Send + Sync {
    /// Show a success message
    fn notify_success(&self, message: &str);

    /// Show an error message
    fn notify_error(&self, message: &str);
}

/// Receives the single navigation signal of a confirmed reset
pub trait Navigator: Send + Sync {
    /// Leave the result view and return to the job submission view
    fn return_to_submission(&self);
}

impl<F> Navigator for F
where
    F: Fn() + Send + Sync,
{
    fn return_to_submission(&self) {
        self()
    }
}

/// Default notifier: publishes messages as [`Event::Notification`]
#[derive(Clone, Debug)]
pub struct EventNotifier {
    event_tx: broadcast::Sender<Event>,
}

impl EventNotifier {
    /// Create a notifier that sends on `event_tx`
    pub fn new(event_tx: broadcast::Sender<Event>) -> Self {
        Self { event_tx }
    }

    fn publish(&self, level: NotificationLevel, message: &str) {
        // No subscribers is fine, nobody is looking
        self.event_tx
            .send(Event::Notification(Notification {
                level,
                message: message.to_string(),
            }))
            .ok();
    }
}

impl Notifier for EventNotifier {
    fn notify_success(&self, message: &str) {
        tracing::info!(text = message, "notification");
        self.publish(NotificationLevel::Success, message);
    }

    fn notify_error(&self, message: &str) {
        tracing::warn!(text = message, "error notification");
        self.publish(NotificationLevel::Error, message);
    }
}
