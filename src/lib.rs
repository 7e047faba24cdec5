//! # relaylink
//!
//! Client for the Relay notification protocol:
//! - Length-prefixed JSON frames over TCP
//! - conn/ack handshake establishing a session
//! - ping/pong liveness answered in order
//! - Notification dispatch and notification actions back to the device
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Supervisor                             │
//! │                 (reconnect + backoff)                        │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                      Connection                              │
//! │        handshake, then read → decode → dispatch              │
//! └──────────┬──────────────────┬───────────────────┬───────────┘
//!            │                  │                   │
//!            ▼                  ▼                   ▼
//!   ┌─────────────────┐ ┌───────────────┐  ┌─────────────────┐
//!   │  Frame Codec    │ │ Message Model │  │ Liveness / Ack  │
//!   │ (u32 BE + JSON) │ │ (typed enum)  │  │   (session)     │
//!   └─────────────────┘ └───────────────┘  └─────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod session;
pub mod network;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{RelayError, Result};
pub use config::{Config, RetryPolicy};
pub use network::{Connection, Supervisor};
pub use protocol::{DeviceInfo, Message, MessageBody};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of relaylink
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
