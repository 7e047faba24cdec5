//! Configuration for relaylink
//!
//! Centralized configuration with sensible defaults.

use std::time::Duration;

use crate::error::{RelayError, Result};
use crate::protocol::{DeviceInfo, MAX_FRAME_SIZE};

/// Main configuration for a relay client
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// Relay server address (host:port)
    pub server_addr: String,

    /// TCP connect timeout (milliseconds)
    pub connect_timeout_ms: u64,

    /// How long to wait for the ack after sending conn (milliseconds)
    pub handshake_timeout_ms: u64,

    /// Steady-state read poll interval (milliseconds, 0 = block forever)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds, 0 = block forever)
    pub write_timeout_ms: u64,

    /// Largest inbound frame accepted (bytes)
    pub max_frame_size: usize,

    // -------------------------------------------------------------------------
    // Device Configuration
    // -------------------------------------------------------------------------
    /// Descriptor sent in the conn message
    pub device: DeviceInfo,

    // -------------------------------------------------------------------------
    // Reconnect Configuration
    // -------------------------------------------------------------------------
    /// Reconnect policy used by the supervisor
    pub retry: RetryPolicy,
}

/// Reconnect policy for [`Supervisor`](crate::network::Supervisor)
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total connection attempts, `None` for unlimited
    pub max_attempts: Option<u32>,

    /// Delay before the first reconnect
    pub initial_backoff: Duration,

    /// Upper bound for the doubling backoff
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: None,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Backoff before attempt number `attempt` (1-based, attempt 1 has none)
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let shift = (attempt - 2).min(16);
        self.initial_backoff
            .saturating_mul(1u32 << shift)
            .min(self.max_backoff)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_addr: "127.0.0.1:9999".to_string(),
            connect_timeout_ms: 5000,
            handshake_timeout_ms: 10_000,
            read_timeout_ms: 5000,
            write_timeout_ms: 5000,
            max_frame_size: MAX_FRAME_SIZE,
            device: DeviceInfo::default(),
            retry: RetryPolicy::default(),
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check the settings that would otherwise fail deep inside a session
    pub fn validate(&self) -> Result<()> {
        if self.server_addr.trim().is_empty() {
            return Err(RelayError::Config("server address is empty".to_string()));
        }
        if self.device.device_name.trim().is_empty() {
            return Err(RelayError::Config("device name is empty".to_string()));
        }
        if self.max_frame_size == 0 {
            return Err(RelayError::Config("max frame size must be positive".to_string()));
        }
        if self.retry.max_attempts == Some(0) {
            return Err(RelayError::Config("max attempts must be at least 1".to_string()));
        }
        if self.retry.initial_backoff > self.retry.max_backoff {
            return Err(RelayError::Config(format!(
                "initial backoff {:?} exceeds max backoff {:?}",
                self.retry.initial_backoff, self.retry.max_backoff
            )));
        }
        Ok(())
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        millis(self.connect_timeout_ms)
    }

    pub fn handshake_timeout(&self) -> Option<Duration> {
        millis(self.handshake_timeout_ms)
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        millis(self.read_timeout_ms)
    }

    pub fn write_timeout(&self) -> Option<Duration> {
        millis(self.write_timeout_ms)
    }
}

fn millis(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the relay server address
    pub fn server_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.server_addr = addr.into();
        self
    }

    /// Set the connect timeout (in milliseconds)
    pub fn connect_timeout_ms(mut self, ms: u64) -> Self {
        self.config.connect_timeout_ms = ms;
        self
    }

    /// Set the ack wait (in milliseconds)
    pub fn handshake_timeout_ms(mut self, ms: u64) -> Self {
        self.config.handshake_timeout_ms = ms;
        self
    }

    /// Set the steady-state read poll interval (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    /// Set the inbound frame size cap (in bytes)
    pub fn max_frame_size(mut self, bytes: usize) -> Self {
        self.config.max_frame_size = bytes;
        self
    }

    /// Replace the whole device descriptor
    pub fn device(mut self, device: DeviceInfo) -> Self {
        self.config.device = device;
        self
    }

    /// Set the device name announced in conn and pong
    pub fn device_name(mut self, name: impl Into<String>) -> Self {
        self.config.device.device_name = name.into();
        self
    }

    /// Set the opaque auth token sent in conn
    pub fn auth_token(mut self, token: impl Into<String>) -> Self {
        self.config.device.auth_token = token.into();
        self
    }

    /// Set the declared capability list
    pub fn supports<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.device.supports = capabilities.into_iter().map(Into::into).collect();
        self
    }

    /// Set the reconnect policy
    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.config.retry = policy;
        self
    }

    /// Limit the supervisor to `attempts` connection attempts
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.retry.max_attempts = Some(attempts);
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
