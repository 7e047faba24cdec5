//! Message handlers
//!
//! Receives what the session loop dispatches. Pings never reach the handler;
//! the loop answers them itself.

use crate::protocol::{Message, NotificationActionPayload, NotificationPayload};

/// Callbacks invoked by [`Connection::run`](crate::network::Connection::run)
pub trait MessageHandler {
    /// A notification arrived
    fn on_notification(&mut self, message: &Message, notification: &NotificationPayload);

    /// The server echoed or forwarded a notification action
    fn on_notification_action(&mut self, message: &Message, action: &NotificationActionPayload) {
        tracing::debug!(
            "Notification action {:?} for {} ({})",
            action.key,
            action.id,
            message.id.as_deref().unwrap_or("-")
        );
    }

    /// A known type that has no business arriving mid-session (conn, ack, pong)
    fn on_unexpected(&mut self, message: &Message) {
        tracing::warn!("Unexpected {} message mid-session", message.kind());
    }

    /// A message with an unrecognized type tag
    fn on_unknown(&mut self, message: &Message) {
        tracing::info!("Received {} message", message.kind());
    }
}

/// Adapts a pair of closures to [`MessageHandler`]
///
/// Everything that is not a notification goes to the second closure.
pub struct Callbacks<N, U> {
    on_notification: N,
    on_other: U,
}

impl<N, U> Callbacks<N, U>
where
    N: FnMut(&Message),
    U: FnMut(&Message),
{
    pub fn new(on_notification: N, on_other: U) -> Self {
        Self {
            on_notification,
            on_other,
        }
    }
}

impl<N, U> MessageHandler for Callbacks<N, U>
where
    N: FnMut(&Message),
    U: FnMut(&Message),
{
    fn on_notification(&mut self, message: &Message, _notification: &NotificationPayload) {
        (self.on_notification)(message)
    }

    fn on_notification_action(&mut self, message: &Message, _action: &NotificationActionPayload) {
        (self.on_other)(message)
    }

    fn on_unexpected(&mut self, message: &Message) {
        (self.on_other)(message)
    }

    fn on_unknown(&mut self, message: &Message) {
        (self.on_other)(message)
    }
}
