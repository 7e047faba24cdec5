//! Handshake Tests
//!
//! Each scenario feeds a canned server response and checks both the conn we
//! sent and how the response was classified.

#[path = "../common/mod.rs"]
mod common;

use std::io::{self, Cursor};

use common::ScriptedReader;
use relaylink::protocol::{read_frame, write_frame, DeviceInfo, FrameReader, Message, MessageBody};
use relaylink::session::{
    classify, perform, Handshake, HandshakeFailure, HandshakeResult, HandshakeState,
};
use relaylink::RelayError;
use serde_json::{json, Value};

fn device() -> DeviceInfo {
    DeviceInfo {
        device_name: "Test-Client".to_string(),
        auth_token: "tok1".to_string(),
        ..DeviceInfo::default()
    }
}

fn server_frames(responses: &[Value]) -> Cursor<Vec<u8>> {
    let mut wire = Vec::new();
    for response in responses {
        write_frame(&mut wire, &serde_json::to_vec(response).unwrap()).unwrap();
    }
    Cursor::new(wire)
}

/// Run a handshake against canned responses; returns the result and the conn sent
fn run(responses: &[Value]) -> (HandshakeResult, Message) {
    let mut reader = FrameReader::new(server_frames(responses));
    let mut sent = Vec::new();

    let result = perform(&mut reader, &mut sent, &device()).unwrap();

    let frame = read_frame(&mut Cursor::new(sent)).unwrap().unwrap();
    (result, Message::from_slice(&frame).unwrap())
}

// =============================================================================
// Classification Tests
// =============================================================================

#[test]
fn test_ack_ok_succeeds_with_ref_id() {
    let (result, conn) = run(&[json!({
        "type": "ack", "id": "a1", "timestamp": 1, "payload": {"status": "ok", "ref_id": "r1"}
    })]);

    assert_eq!(result, HandshakeResult::Succeeded { ref_id: "r1".to_string() });

    match conn.body {
        MessageBody::Conn(info) => {
            assert_eq!(info.device_name, "Test-Client");
            assert_eq!(info.auth_token, "tok1");
        }
        other => panic!("Expected conn, got {:?}", other),
    }
    assert!(conn.id.is_some());
}

#[test]
fn test_ack_error_fails_with_reason() {
    let (result, _) = run(&[json!({
        "type": "ack", "payload": {"status": "error", "reason": "invalid token"}
    })]);

    assert_eq!(
        result,
        HandshakeResult::Failed(HandshakeFailure::Rejected("invalid token".to_string()))
    );
}

#[test]
fn test_ack_unknown_status_fails() {
    let (result, _) = run(&[json!({"type": "ack", "payload": {"status": "maybe"}})]);
    match result {
        HandshakeResult::Failed(failure) => {
            assert_eq!(failure, HandshakeFailure::UnrecognizedStatus("maybe".to_string()));
            assert_eq!(failure.reason(), "unrecognized status");
        }
        other => panic!("Expected failure, got {:?}", other),
    }

    let (missing, _) = run(&[json!({"type": "ack", "payload": {}})]);
    assert_eq!(
        missing,
        HandshakeResult::Failed(HandshakeFailure::UnrecognizedStatus(String::new()))
    );

    let (null, _) = run(&[json!({"type": "ack", "payload": {"status": null}})]);
    assert_eq!(
        null,
        HandshakeResult::Failed(HandshakeFailure::UnrecognizedStatus(String::new()))
    );

    let (number, _) = run(&[json!({"type": "ack", "payload": {"status": 1}})]);
    assert_eq!(
        number,
        HandshakeResult::Failed(HandshakeFailure::UnrecognizedStatus("1".to_string()))
    );
}

#[test]
fn test_non_ack_fails() {
    let (result, _) = run(&[json!({"type": "ping", "id": "p1", "payload": {}})]);
    match result {
        HandshakeResult::Failed(failure) => {
            assert_eq!(failure, HandshakeFailure::UnexpectedType("ping".to_string()));
            assert_eq!(failure.reason(), "unexpected message type");
        }
        other => panic!("Expected failure, got {:?}", other),
    }
}

#[test]
fn test_no_response_fails() {
    let (result, _) = run(&[]);
    match result {
        HandshakeResult::Failed(failure) => {
            assert_eq!(failure, HandshakeFailure::NoResponse);
            assert_eq!(failure.reason(), "no response");
        }
        other => panic!("Expected failure, got {:?}", other),
    }
}

#[test]
fn test_classification_is_deterministic() {
    let scenarios = vec![
        vec![],
        vec![json!({"type": "notification", "payload": {}})],
        vec![json!({"type": "ack", "payload": {"status": "ok", "ref_id": "r1"}})],
        vec![json!({"type": "ack", "payload": {"status": "error", "reason": "no"}})],
        vec![json!({"type": "ack", "payload": {"status": "???"}})],
    ];

    for scenario in &scenarios {
        let first = run(scenario).0;
        for _ in 0..5 {
            assert_eq!(run(scenario).0, first);
        }
    }
}

#[test]
fn test_only_first_frame_is_consulted() {
    let (result, _) = run(&[
        json!({"type": "ping", "id": "p1", "payload": {}}),
        json!({"type": "ack", "payload": {"status": "ok", "ref_id": "r1"}}),
    ]);
    assert!(!result.is_success());
}

// =============================================================================
// Transport Condition Tests
// =============================================================================

#[test]
fn test_deadline_expiry_is_no_response() {
    let mut reader = FrameReader::new(ScriptedReader::new(vec![Err(io::Error::new(
        io::ErrorKind::WouldBlock,
        "deadline",
    ))]));
    let mut sent = Vec::new();

    let result = perform(&mut reader, &mut sent, &device()).unwrap();
    assert_eq!(result, HandshakeResult::Failed(HandshakeFailure::NoResponse));
}

#[test]
fn test_reset_is_no_response() {
    let mut reader = FrameReader::new(ScriptedReader::new(vec![Err(io::Error::new(
        io::ErrorKind::ConnectionReset,
        "reset",
    ))]));
    let mut sent = Vec::new();

    let result = perform(&mut reader, &mut sent, &device()).unwrap();
    assert_eq!(result, HandshakeResult::Failed(HandshakeFailure::NoResponse));
}

#[test]
fn test_malformed_ack_is_decode_error() {
    let mut wire = Vec::new();
    write_frame(&mut wire, b"{not json").unwrap();
    let mut reader = FrameReader::new(Cursor::new(wire));
    let mut sent = Vec::new();

    let err = perform(&mut reader, &mut sent, &device()).unwrap_err();
    assert!(matches!(err, RelayError::Decode(_)));
}

#[test]
fn test_send_failure_is_error() {
    struct BrokenPipe;
    impl io::Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    let mut reader = FrameReader::new(server_frames(&[]));
    let err = perform(&mut reader, &mut BrokenPipe, &device()).unwrap_err();
    assert!(matches!(err, RelayError::Io(_)));
}

// =============================================================================
// State Machine Tests
// =============================================================================

#[test]
fn test_state_transitions() {
    let mut handshake = Handshake::new();
    assert_eq!(handshake.state(), HandshakeState::Idle);

    let conn = handshake.start(&device()).unwrap();
    assert_eq!(conn.kind(), "conn");
    assert_eq!(handshake.state(), HandshakeState::AwaitingAck);

    // A second conn on the same handshake is refused
    assert!(matches!(handshake.start(&device()), Err(RelayError::InvalidState(_))));

    let ack = Message::new(MessageBody::Ack(relaylink::protocol::AckPayload::ok("r9")));
    assert!(handshake.on_response(Some(&ack)).is_success());
    assert_eq!(handshake.state(), HandshakeState::Connected);

    let mut rejected = Handshake::new();
    rejected.start(&device()).unwrap();
    rejected.on_response(None);
    assert_eq!(rejected.state(), HandshakeState::Rejected);
}

#[test]
fn test_into_result() {
    assert_eq!(classify(None).into_result().unwrap_err().to_string(), "Handshake failed: no response");

    let ack = Message::new(MessageBody::Ack(relaylink::protocol::AckPayload::ok("r1")));
    assert_eq!(classify(Some(&ack)).into_result().unwrap(), "r1");
}
