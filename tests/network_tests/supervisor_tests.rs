//! Supervisor Tests
//!
//! Reconnect policy: backoff, attempt limits and which failures are final.

#[path = "../common/mod.rs"]
mod common;

use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use common::{accept_handshake, ack_error, ack_ok, notification, send_json, test_config};
use relaylink::config::RetryPolicy;
use relaylink::network::{Supervisor, SupervisorOutcome};
use relaylink::protocol::{Message, NotificationPayload};
use relaylink::session::{HandshakeFailure, MessageHandler};
use relaylink::{Config, RelayError};

#[derive(Default)]
struct Counter {
    notifications: usize,
}

impl MessageHandler for Counter {
    fn on_notification(&mut self, _message: &Message, _notification: &NotificationPayload) {
        self.notifications += 1;
    }
}

fn fast_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts: Some(max_attempts),
        initial_backoff: Duration::from_millis(10),
        max_backoff: Duration::from_millis(40),
    }
}

/// An address nothing is listening on
fn dead_addr() -> std::net::SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}

#[test]
fn test_reconnects_after_peer_closes() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let server = thread::spawn(move || {
        for session in 0..2 {
            let (mut stream, _) = listener.accept().unwrap();
            accept_handshake(&mut stream, &ack_ok(&format!("r{}", session)));
            send_json(&mut stream, &notification(&format!("n{}", session)));
        }
    });

    let config = Config {
        handshake_timeout_ms: 200,
        retry: fast_retry(2),
        ..test_config(addr)
    };
    let supervisor = Supervisor::new(config).unwrap();
    let mut counter = Counter::default();

    let outcome = supervisor.run(&mut counter).unwrap();
    server.join().unwrap();

    assert!(matches!(outcome, SupervisorOutcome::AttemptsExhausted { attempts: 2, .. }));
    assert_eq!(counter.notifications, 2);
}

#[test]
fn test_reconnect_after_session_is_paced() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let sessions = Arc::new(AtomicUsize::new(0));

    // Accepts, acks and hangs up, forever
    let counted = Arc::clone(&sessions);
    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { break };
            counted.fetch_add(1, Ordering::SeqCst);
            accept_handshake(&mut stream, &ack_ok("r"));
        }
    });

    let config = Config {
        retry: RetryPolicy {
            max_attempts: Some(3),
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(100),
        },
        ..test_config(addr)
    };
    let supervisor = Supervisor::new(config).unwrap();

    let stop = supervisor.stop_signal();
    thread::spawn(move || {
        thread::sleep(Duration::from_millis(550));
        stop.stop();
    });

    let outcome = supervisor.run(&mut Counter::default()).unwrap();
    assert_eq!(outcome, SupervisorOutcome::Stopped);

    // One session up front, then at most one per initial backoff
    let opened = sessions.load(Ordering::SeqCst);
    assert!(opened >= 2, "only {} sessions opened", opened);
    assert!(opened <= 8, "{} sessions opened in 550ms", opened);
}

#[test]
fn test_gives_up_after_max_attempts() {
    let config = Config {
        retry: fast_retry(3),
        ..test_config(dead_addr())
    };
    let supervisor = Supervisor::new(config).unwrap();

    match supervisor.run(&mut Counter::default()).unwrap() {
        SupervisorOutcome::AttemptsExhausted { attempts, last_error } => {
            assert_eq!(attempts, 3);
            assert!(last_error.is_some());
        }
        other => panic!("Expected exhaustion, got {:?}", other),
    }
}

#[test]
fn test_rejection_is_not_retried() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let server = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        accept_handshake(&mut stream, &ack_error("invalid token"));
        // A retry would show up as a second connection
        listener.set_nonblocking(true).unwrap();
        thread::sleep(Duration::from_millis(200));
        listener.accept().is_ok()
    });

    let config = Config {
        retry: fast_retry(5),
        ..test_config(addr)
    };
    let supervisor = Supervisor::new(config).unwrap();
    let err = supervisor.run(&mut Counter::default()).unwrap_err();

    assert!(matches!(err, RelayError::Handshake(HandshakeFailure::Rejected(_))));
    assert!(!server.join().unwrap(), "supervisor reconnected after rejection");
}

#[test]
fn test_stop_interrupts_backoff() {
    let config = Config {
        retry: RetryPolicy {
            max_attempts: None,
            initial_backoff: Duration::from_secs(30),
            max_backoff: Duration::from_secs(30),
        },
        ..test_config(dead_addr())
    };
    let supervisor = Supervisor::new(config).unwrap();

    let stop = supervisor.stop_signal();
    thread::spawn(move || {
        thread::sleep(Duration::from_millis(100));
        stop.stop();
    });

    let started = Instant::now();
    let outcome = supervisor.run(&mut Counter::default()).unwrap();

    assert_eq!(outcome, SupervisorOutcome::Stopped);
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[test]
fn test_invalid_config_rejected() {
    let config = Config::builder().max_attempts(0).build();
    assert!(matches!(Supervisor::new(config), Err(RelayError::Config(_))));
}
