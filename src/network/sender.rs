//! Frame sender
//!
//! Cloneable write half of a connection. Each frame is written and flushed
//! under one lock, so frames from different threads never interleave.

use std::io::{BufWriter, Write};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::Result;
use crate::protocol::{write_frame, Message, NotificationActionPayload};

/// Serialized writer shared by the session loop and the application
pub struct FrameSender<W: Write> {
    writer: Arc<Mutex<BufWriter<W>>>,
}

impl<W: Write> Clone for FrameSender<W> {
    fn clone(&self) -> Self {
        Self {
            writer: Arc::clone(&self.writer),
        }
    }
}

impl<W: Write> FrameSender<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Arc::new(Mutex::new(BufWriter::new(writer))),
        }
    }

    /// Serialize and send one message
    pub fn send(&self, message: &Message) -> Result<()> {
        let bytes = message.to_bytes()?;
        tracing::trace!("Sending {} ({} bytes)", message.kind(), bytes.len());
        self.send_raw(&bytes)
    }

    /// Send an already serialized payload as one frame
    pub fn send_raw(&self, payload: &[u8]) -> Result<()> {
        let mut writer = self.writer.lock();
        write_frame(&mut *writer, payload)
    }

    /// Ask the device to run an action on one of its notifications
    pub fn send_action(&self, action: NotificationActionPayload) -> Result<()> {
        tracing::debug!("Sending {} action for notification {}", action.kind, action.id);
        self.send(&Message::notification_action(action))
    }
}
