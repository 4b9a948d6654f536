//! Outbound content notifications
//!
//! The engine emits a [`ContentEvent`] after a change is stored and never
//! waits on, or fails because of, its delivery.

pub mod dispatcher;
pub mod types;

use futures::channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};

pub use types::ContentEvent;

#[derive(Debug)]
pub enum NotifyError {
    /// The receiving side is gone
    Disconnected,
    /// Any other delivery failure
    Delivery(String),
}

impl std::fmt::Display for NotifyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotifyError::Disconnected => write!(f, "Notification receiver disconnected"),
            NotifyError::Delivery(msg) => write!(f, "Notification delivery failed: {}", msg),
        }
    }
}

impl std::error::Error for NotifyError {}

/// Sink for content events.
pub trait Notifier: Send + Sync {
    fn notify(&self, event: &ContentEvent) -> Result<(), NotifyError>;
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _event: &ContentEvent) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Writes events to the log as JSON.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, event: &ContentEvent) -> Result<(), NotifyError> {
        let body =
            serde_json::to_string(event).map_err(|e| NotifyError::Delivery(e.to_string()))?;
        log::info!(
            "Notification {} for user {}: {}",
            event.as_str(),
            event.recipient_id(),
            body
        );
        Ok(())
    }
}

/// Queues events on an unbounded channel; the caller owns the receiver.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: UnboundedSender<ContentEvent>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, UnboundedReceiver<ContentEvent>) {
        let (tx, rx) = unbounded();
        (Self { tx }, rx)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, event: &ContentEvent) -> Result<(), NotifyError> {
        self.tx
            .unbounded_send(event.clone())
            .map_err(|_| NotifyError::Disconnected)
    }
}

/// Hand `event` to `notifier`, logging and swallowing any failure.
pub fn dispatch(notifier: &dyn Notifier, event: ContentEvent) {
    if let Err(e) = notifier.notify(&event) {
        log::warn!("Dropped {} notification: {}", event.as_str(), e);
    }
}
