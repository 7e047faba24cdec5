//! Session handshake
//!
//! One-shot conn → ack exchange:
//!
//! ```text
//!   Idle ──send conn──▶ AwaitingAck ──ack ok──────▶ Connected
//!                            │
//!                            └──anything else──▶ Rejected
//! ```
//!
//! There are no retries and no timer here; the ack wait is bounded by the
//! transport's read deadline.

use std::fmt;
use std::io::{Read, Write};

use crate::error::{RelayError, Result};
use crate::protocol::{write_message, AckStatus, DeviceInfo, FrameReader, Message, MessageBody};

/// Why a handshake did not reach `Connected`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeFailure {
    /// Stream closed, failed or timed out before any frame arrived
    NoResponse,

    /// First frame was not an ack (carries the received type)
    UnexpectedType(String),

    /// Server answered `status: error` (carries its reason)
    Rejected(String),

    /// Ack status was neither `ok` nor `error` (carries the received status)
    UnrecognizedStatus(String),
}

impl HandshakeFailure {
    /// Human-readable reason
    pub fn reason(&self) -> &str {
        match self {
            HandshakeFailure::NoResponse => "no response",
            HandshakeFailure::UnexpectedType(_) => "unexpected message type",
            HandshakeFailure::Rejected(reason) => reason,
            HandshakeFailure::UnrecognizedStatus(_) => "unrecognized status",
        }
    }
}

impl fmt::Display for HandshakeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandshakeFailure::UnexpectedType(kind) => write!(f, "{} ({})", self.reason(), kind),
            HandshakeFailure::UnrecognizedStatus(status) => {
                write!(f, "{} ({:?})", self.reason(), status)
            }
            _ => f.write_str(self.reason()),
        }
    }
}

/// Classified handshake outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeResult {
    Succeeded { ref_id: String },
    Failed(HandshakeFailure),
}

impl HandshakeResult {
    pub fn is_success(&self) -> bool {
        matches!(self, HandshakeResult::Succeeded { .. })
    }

    /// Convert into a `Result`, failing with [`RelayError::Handshake`]
    pub fn into_result(self) -> Result<String> {
        match self {
            HandshakeResult::Succeeded { ref_id } => Ok(ref_id),
            HandshakeResult::Failed(failure) => Err(RelayError::Handshake(failure)),
        }
    }
}

/// Handshake states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    Idle,
    AwaitingAck,
    Connected,
    Rejected,
}

/// Handshake state machine, independent of any transport
#[derive(Debug)]
pub struct Handshake {
    state: HandshakeState,
}

impl Default for Handshake {
    fn default() -> Self {
        Self::new()
    }
}

impl Handshake {
    pub fn new() -> Self {
        Self {
            state: HandshakeState::Idle,
        }
    }

    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// Build the conn message and move to `AwaitingAck`
    pub fn start(&mut self, device: &DeviceInfo) -> Result<Message> {
        if self.state != HandshakeState::Idle {
            return Err(RelayError::InvalidState(format!(
                "handshake already started (state {:?})",
                self.state
            )));
        }
        self.state = HandshakeState::AwaitingAck;
        Ok(Message::conn(device.clone()))
    }

    /// Classify the single response (`None` when nothing arrived)
    pub fn on_response(&mut self, response: Option<&Message>) -> HandshakeResult {
        let result = classify(response);
        self.state = if result.is_success() {
            HandshakeState::Connected
        } else {
            HandshakeState::Rejected
        };
        result
    }
}

/// Map the first received message onto a handshake result
pub fn classify(response: Option<&Message>) -> HandshakeResult {
    let message = match response {
        Some(m) => m,
        None => return HandshakeResult::Failed(HandshakeFailure::NoResponse),
    };

    let ack = match &message.body {
        MessageBody::Ack(ack) => ack,
        other => {
            return HandshakeResult::Failed(HandshakeFailure::UnexpectedType(
                other.kind().to_string(),
            ))
        }
    };

    match ack.status() {
        AckStatus::Ok => HandshakeResult::Succeeded {
            ref_id: ack.ref_id.clone().unwrap_or_default(),
        },
        AckStatus::Error => HandshakeResult::Failed(HandshakeFailure::Rejected(
            ack.reason.clone().unwrap_or_else(|| "Unknown error".to_string()),
        )),
        AckStatus::Other(status) => {
            HandshakeResult::Failed(HandshakeFailure::UnrecognizedStatus(status))
        }
    }
}

/// Receive the handshake response
///
/// Closure, transport failure and deadline expiry all count as no response.
/// A frame that arrives but does not parse is a decode error.
pub fn receive_response<R: Read>(reader: &mut FrameReader<R>) -> Result<Option<Message>> {
    match reader.read_frame() {
        Ok(Some(frame)) => Message::from_slice(&frame).map(Some),
        Ok(None) => {
            tracing::debug!("Stream closed while awaiting ack");
            Ok(None)
        }
        Err(e @ (RelayError::Io(_) | RelayError::Timeout)) => {
            tracing::warn!("No ack received: {}", e);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Perform the whole handshake over a reader/writer pair
///
/// Send failures are returned as errors; everything after the send is
/// folded into the [`HandshakeResult`].
pub fn perform<R: Read, W: Write>(
    reader: &mut FrameReader<R>,
    writer: &mut W,
    device: &DeviceInfo,
) -> Result<HandshakeResult> {
    exchange(reader, device, |conn| write_message(writer, conn))
}

/// Send conn through `send`, then receive and classify the answer
pub(crate) fn exchange<R, F>(
    reader: &mut FrameReader<R>,
    device: &DeviceInfo,
    send: F,
) -> Result<HandshakeResult>
where
    R: Read,
    F: FnOnce(&Message) -> Result<()>,
{
    let mut handshake = Handshake::new();
    let conn = handshake.start(device)?;

    tracing::debug!("Sending conn as {:?}", device.device_name);
    send(&conn)?;

    let response = receive_response(reader)?;
    Ok(handshake.on_response(response.as_ref()))
}
