//! Session Module
//!
//! Protocol state that sits between the codec and the network loop:
//! the conn/ack handshake, the ping/pong responder and the handler trait
//! that receives dispatched messages.

mod handler;
mod handshake;
mod liveness;

pub use handler::{Callbacks, MessageHandler};
pub use handshake::{
    classify, perform, receive_response, Handshake, HandshakeFailure, HandshakeResult,
    HandshakeState,
};
pub use liveness::{pong_for, LivenessResponder};

pub(crate) use handshake::exchange;
