//! Connection Handler
//!
//! Drives one session over a connected transport: handshake, then the
//! read/dispatch loop until the peer closes, a stop is requested or a fatal
//! error occurs. Reconnecting is the supervisor's business.

use std::net::TcpStream;
use std::time::Duration;

use crate::config::Config;
use crate::error::{RelayError, Result};
use crate::protocol::{DeviceInfo, FrameReader, Message, MessageBody};
use crate::session::{exchange, HandshakeResult, LivenessResponder, MessageHandler};

use super::sender::FrameSender;
use super::stop::StopSignal;
use super::transport::{self, Transport};

/// Why a session ended without error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The server closed the stream
    PeerClosed,

    /// The stop signal was raised
    Stopped,
}

/// What happened during a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub end: SessionEnd,

    /// `ref_id` from the server's ack, if the handshake completed
    pub ref_id: Option<String>,

    /// Frames received after the handshake
    pub frames_received: u64,

    pub pings_answered: u64,
}

/// A single client session
pub struct Connection<T: Transport = TcpStream> {
    /// Buffered frame reader over the read handle
    reader: FrameReader<T>,

    /// Lock-serialized write handle, shared with the application
    sender: FrameSender<T>,

    device: DeviceInfo,

    liveness: LivenessResponder,

    handshake_timeout: Option<Duration>,

    read_timeout: Option<Duration>,

    /// Set once the server has acked our conn
    ref_id: Option<String>,

    handshake_attempted: bool,

    stop: StopSignal,

    /// Peer address for logging
    peer_addr: String,
}

impl Connection<TcpStream> {
    /// Connect to the configured server
    pub fn connect(config: &Config) -> Result<Self> {
        let stream = transport::connect(config)?;
        Self::new(stream, config)
    }
}

impl<T: Transport> Connection<T> {
    /// Wrap an already connected transport
    pub fn new(stream: T, config: &Config) -> Result<Self> {
        let peer_addr = stream.peer_label();

        stream.set_write_timeout(config.write_timeout())?;

        // Clone stream for separate read/write handles
        let read_stream = stream.try_clone()?;
        let write_stream = stream;

        Ok(Self {
            reader: FrameReader::with_max_frame_size(read_stream, config.max_frame_size),
            sender: FrameSender::new(write_stream),
            device: config.device.clone(),
            liveness: LivenessResponder::new(config.device.device_name.clone()),
            handshake_timeout: config.handshake_timeout(),
            read_timeout: config.read_timeout(),
            ref_id: None,
            handshake_attempted: false,
            stop: StopSignal::new(),
            peer_addr,
        })
    }

    /// Share an externally owned stop signal
    pub fn with_stop_signal(mut self, stop: StopSignal) -> Self {
        self.stop = stop;
        self
    }

    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    /// A handle for sending from other threads (e.g. notification actions)
    pub fn sender(&self) -> FrameSender<T> {
        self.sender.clone()
    }

    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }

    /// True once the handshake has succeeded
    pub fn is_established(&self) -> bool {
        self.ref_id.is_some()
    }

    /// Send conn and classify the server's answer
    ///
    /// May only be called once per connection.
    pub fn handshake(&mut self) -> Result<HandshakeResult> {
        if self.handshake_attempted {
            return Err(RelayError::InvalidState(
                "handshake already performed on this connection".to_string(),
            ));
        }
        self.handshake_attempted = true;

        // The ack wait has its own deadline
        self.reader.get_ref().set_read_timeout(self.handshake_timeout)?;

        tracing::debug!("Starting handshake with {}", self.peer_addr);
        let sender = &self.sender;
        let result = exchange(&mut self.reader, &self.device, |conn| sender.send(conn))?;

        match &result {
            HandshakeResult::Succeeded { ref_id } => {
                tracing::info!("Connected to {} (ref {})", self.peer_addr, ref_id);
                self.ref_id = Some(ref_id.clone());
                self.reader.get_ref().set_read_timeout(self.read_timeout)?;
            }
            HandshakeResult::Failed(failure) => {
                tracing::warn!("Handshake with {} failed: {}", self.peer_addr, failure);
            }
        }

        Ok(result)
    }

    /// Run the session (blocking until it ends)
    ///
    /// Performs the handshake unless [`handshake`](Self::handshake) already
    /// succeeded. Returns `Ok` when the peer closes the stream or a stop is
    /// requested.
    /// Handshake failure, transport failure, a malformed frame or a failed
    /// send end the session with an error.
    pub fn run<H: MessageHandler>(&mut self, handler: &mut H) -> Result<SessionSummary> {
        let mut summary = SessionSummary {
            end: SessionEnd::Stopped,
            ref_id: None,
            frames_received: 0,
            pings_answered: 0,
        };

        if self.stop.is_stopped() {
            return Ok(summary);
        }

        // The caller may already have shaken hands to start senders first
        if !self.is_established() {
            if let HandshakeResult::Failed(failure) = self.handshake()? {
                return Err(RelayError::Handshake(failure));
            }
        }
        summary.ref_id = self.ref_id.clone();

        loop {
            if self.stop.is_stopped() {
                tracing::debug!("Stopping session with {}", self.peer_addr);
                summary.end = SessionEnd::Stopped;
                break;
            }

            let frame = match self.reader.read_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    tracing::info!("Server {} closed the connection", self.peer_addr);
                    summary.end = SessionEnd::PeerClosed;
                    break;
                }
                Err(RelayError::Timeout) => {
                    // A quiet poll interval says nothing about peer health
                    tracing::trace!(
                        "No traffic from {} this interval ({} bytes buffered)",
                        self.peer_addr,
                        self.reader.buffered()
                    );
                    continue;
                }
                Err(e) => {
                    tracing::warn!("Error reading from {}: {}", self.peer_addr, e);
                    return Err(e);
                }
            };

            summary.frames_received += 1;

            let message = Message::from_slice(&frame).map_err(|e| {
                tracing::warn!("Malformed frame from {}: {}", self.peer_addr, e);
                e
            })?;

            tracing::trace!("Received {} from {}", message.kind(), self.peer_addr);

            if self.dispatch(&message, handler)? {
                summary.pings_answered += 1;
            }
        }

        Ok(summary)
    }

    /// Route one message; returns true if it was a ping that got answered
    fn dispatch<H: MessageHandler>(&self, message: &Message, handler: &mut H) -> Result<bool> {
        match &message.body {
            MessageBody::Ping(_) => {
                if let Some(pong) = self.liveness.on_ping(message) {
                    self.sender.send(&pong)?;
                    tracing::debug!(
                        "Responded to ping {} from {}",
                        message.id.as_deref().unwrap_or("-"),
                        self.peer_addr
                    );
                    return Ok(true);
                }
            }
            MessageBody::Notification(notification) => {
                handler.on_notification(message, notification);
            }
            MessageBody::NotificationAction(action) => {
                handler.on_notification_action(message, action);
            }
            MessageBody::Conn(_) | MessageBody::Ack(_) | MessageBody::Pong(_) => {
                handler.on_unexpected(message);
            }
            MessageBody::Unknown { .. } => {
                handler.on_unknown(message);
            }
        }
        Ok(false)
    }
}
