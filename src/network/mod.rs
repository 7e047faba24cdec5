//! Network Module
//!
//! TCP client session handling.
//!
//! ## Architecture
//! - One blocking read/dispatch loop per connection
//! - Writes serialized through a shared `FrameSender`
//! - Supervisor reconnects with exponential backoff

mod connection;
mod sender;
mod stop;
mod supervisor;
mod transport;

pub use connection::{Connection, SessionEnd, SessionSummary};
pub use sender::FrameSender;
pub use stop::StopSignal;
pub use supervisor::{Supervisor, SupervisorOutcome};
pub use transport::{connect, Transport};
