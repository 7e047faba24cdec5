//! Liveness responder
//!
//! Answers `ping` with `pong`. The pong reuses the ping's envelope `id`
//! verbatim; correlation is by identifier, never by timestamp.

use crate::protocol::{Message, MessageBody};

/// Builds pongs on behalf of one device
#[derive(Debug, Clone)]
pub struct LivenessResponder {
    device: String,
}

impl LivenessResponder {
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
        }
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    /// Pong for `ping`, or `None` if the message is not a ping
    pub fn on_ping(&self, ping: &Message) -> Option<Message> {
        pong_for(ping, &self.device)
    }
}

/// Pong answering `ping` from `device`
pub fn pong_for(ping: &Message, device: &str) -> Option<Message> {
    match ping.body {
        MessageBody::Ping(_) => Some(Message::pong(ping.id.clone(), device)),
        _ => None,
    }
}
