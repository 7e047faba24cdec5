//! Supervisor
//!
//! Owns the reconnect policy. Each attempt is one [`Connection`] run from
//! connect to termination; between attempts the supervisor backs off
//! exponentially. A session that got past the handshake resets the attempt
//! counter, and the reconnect after it still waits `initial_backoff`. A
//! server rejecting our conn is final.

use crate::config::Config;
use crate::error::{RelayError, Result};
use crate::session::{HandshakeFailure, MessageHandler};

use super::connection::{Connection, SessionEnd};
use super::stop::StopSignal;
use super::transport::Transport;

/// How supervision ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupervisorOutcome {
    /// The stop signal was raised
    Stopped,

    /// `max_attempts` consecutive attempts failed
    AttemptsExhausted {
        attempts: u32,
        last_error: Option<String>,
    },
}

/// Reconnecting wrapper around [`Connection`]
pub struct Supervisor {
    config: Config,
    stop: StopSignal,
}

impl Supervisor {
    /// Create a supervisor, validating the config up front
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            stop: StopSignal::new(),
        })
    }

    /// Signal shared with every connection this supervisor opens
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    /// Supervise TCP sessions to the configured server (blocking)
    pub fn run<H: MessageHandler>(&self, handler: &mut H) -> Result<SupervisorOutcome> {
        self.run_with(handler, Connection::connect)
    }

    /// Supervise sessions opened by `connect`
    pub fn run_with<T, H, F>(&self, handler: &mut H, mut connect: F) -> Result<SupervisorOutcome>
    where
        T: Transport,
        H: MessageHandler,
        F: FnMut(&Config) -> Result<Connection<T>>,
    {
        let policy = self.config.retry;
        let mut attempt: u32 = 0;
        let mut last_error: Option<String> = None;
        // Set after an established session so the next connect is paced
        let mut resumed = false;

        loop {
            attempt += 1;
            if let Some(max) = policy.max_attempts {
                if attempt > max {
                    tracing::error!("Giving up after {} attempts", max);
                    return Ok(SupervisorOutcome::AttemptsExhausted {
                        attempts: max,
                        last_error,
                    });
                }
            }

            let mut backoff = policy.backoff_for(attempt);
            if resumed {
                backoff = backoff.max(policy.initial_backoff);
                resumed = false;
            }
            if !backoff.is_zero() {
                tracing::info!("Reconnecting in {:?} (attempt {})", backoff, attempt);
                if self.stop.wait_timeout(backoff) {
                    return Ok(SupervisorOutcome::Stopped);
                }
            }
            if self.stop.is_stopped() {
                return Ok(SupervisorOutcome::Stopped);
            }

            let mut connection = match connect(&self.config) {
                Ok(c) => c.with_stop_signal(self.stop.clone()),
                Err(e) => {
                    tracing::warn!("Connect to {} failed: {}", self.config.server_addr, e);
                    last_error = Some(e.to_string());
                    continue;
                }
            };

            let result = connection.run(handler);
            if connection.is_established() {
                attempt = 0;
                resumed = true;
            }

            match result {
                Ok(summary) => match summary.end {
                    SessionEnd::Stopped => return Ok(SupervisorOutcome::Stopped),
                    SessionEnd::PeerClosed => {
                        tracing::info!(
                            "Session ended by peer after {} frames ({} pings answered)",
                            summary.frames_received,
                            summary.pings_answered
                        );
                        last_error = Some("connection closed by peer".to_string());
                    }
                },
                Err(RelayError::Handshake(HandshakeFailure::Rejected(reason))) => {
                    tracing::error!("Server rejected connection: {}", reason);
                    return Err(RelayError::Handshake(HandshakeFailure::Rejected(reason)));
                }
                Err(e) => {
                    tracing::warn!("Session with {} failed: {}", connection.peer_addr(), e);
                    last_error = Some(e.to_string());
                }
            }
        }
    }
}
