//! Transport
//!
//! The byte stream a session runs over. Reads and writes use separate
//! handles cloned from the same connection.

use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::config::Config;
use crate::error::{RelayError, Result};

/// A connected, cloneable byte stream with deadlines
pub trait Transport: Read + Write + Send + Sized + 'static {
    /// Another handle to the same connection
    fn try_clone(&self) -> io::Result<Self>;

    fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()>;

    fn set_write_timeout(&self, timeout: Option<Duration>) -> io::Result<()>;

    /// Peer description for logging
    fn peer_label(&self) -> String;
}

impl Transport for TcpStream {
    fn try_clone(&self) -> io::Result<Self> {
        TcpStream::try_clone(self)
    }

    fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        TcpStream::set_read_timeout(self, timeout)
    }

    fn set_write_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        TcpStream::set_write_timeout(self, timeout)
    }

    fn peer_label(&self) -> String {
        self.peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string())
    }
}

/// Open a TCP connection to the configured relay server
///
/// Tries every resolved address in turn and returns the last error if none
/// accepts.
pub fn connect(config: &Config) -> Result<TcpStream> {
    let addrs: Vec<_> = config
        .server_addr
        .to_socket_addrs()
        .map_err(|e| RelayError::Config(format!("cannot resolve {}: {}", config.server_addr, e)))?
        .collect();

    if addrs.is_empty() {
        return Err(RelayError::Config(format!(
            "{} resolved to no addresses",
            config.server_addr
        )));
    }

    let mut last_err = None;
    for addr in &addrs {
        tracing::debug!("Connecting to {}", addr);
        let attempt = match config.connect_timeout() {
            Some(timeout) => TcpStream::connect_timeout(addr, timeout),
            None => TcpStream::connect(addr),
        };
        match attempt {
            Ok(stream) => {
                // Frames are small and latency matters more than batching
                stream.set_nodelay(true)?;
                return Ok(stream);
            }
            Err(e) => {
                tracing::debug!("Connect to {} failed: {}", addr, e);
                last_err = Some(e);
            }
        }
    }

    Err(last_err.map(RelayError::from_io).unwrap_or_else(|| {
        RelayError::Config(format!("no usable address for {}", config.server_addr))
    }))
}
