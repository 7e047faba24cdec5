//! Protocol Module
//!
//! Defines the wire protocol spoken with the relay server.
//!
//! ## Frame Format
//! ```text
//! ┌──────────────┬─────────────────────────────┐
//! │ Len (4, BE)  │   UTF-8 JSON message        │
//! └──────────────┴─────────────────────────────┘
//! ```
//!
//! ## Message Envelope
//! ```text
//! {"type": "...", "id": "<uuid>", "timestamp": <secs>, "payload": {...}}
//! ```
//!
//! ### Types
//! - conn:                client → server, device descriptor
//! - ack:                 server → client, status ok/error
//! - ping / pong:         liveness, correlated by envelope `id`
//! - notification:        server → client
//! - notification_action: client → server, targets a notification `id`

mod codec;
mod message;
mod payload;

pub use codec::{
    decode_frame, encode_frame, read_frame, read_frame_limited, write_frame, FrameReader,
    HEADER_SIZE, MAX_FRAME_SIZE,
};
pub use message::{new_id, unix_now, Message, MessageBody, MessageType};
pub use payload::{
    action_type, AckPayload, AckStatus, DeviceInfo, HeartbeatPayload, NotificationActionEntry,
    NotificationActionPayload, NotificationPayload,
};

use std::io::Write;

use crate::error::Result;

/// Serialize a message and write it as one frame
pub fn write_message<W: Write>(writer: &mut W, message: &Message) -> Result<()> {
    let bytes = message.to_bytes()?;
    write_frame(writer, &bytes)
}
