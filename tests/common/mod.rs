//! Shared helpers: a loopback fake relay server and raw frame I/O.

#![allow(dead_code)]

use std::io::{self, Read};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use relaylink::protocol::{read_frame, write_frame, Message};
use relaylink::Config;
use serde_json::{json, Value};

/// Spawn a server that accepts one connection and runs `script` on it
pub fn spawn_server<F, T>(script: F) -> (SocketAddr, JoinHandle<T>)
where
    F: FnOnce(TcpStream) -> T + Send + 'static,
    T: Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        stream.set_read_timeout(Some(Duration::from_secs(10))).unwrap();
        script(stream)
    });
    (addr, handle)
}

/// Config pointing at `addr` with test-sized timeouts
pub fn test_config(addr: SocketAddr) -> Config {
    Config::builder()
        .server_addr(addr.to_string())
        .device_name("Test-Client")
        .auth_token("tok1")
        .connect_timeout_ms(2000)
        .handshake_timeout_ms(2000)
        .read_timeout_ms(50)
        .write_timeout_ms(2000)
        .build()
}

/// Read one frame and parse it as JSON
pub fn recv_json(stream: &mut TcpStream) -> Option<Value> {
    let frame = read_frame(stream).unwrap()?;
    Some(serde_json::from_slice(&frame).unwrap())
}

/// Read one frame and parse it as a typed message
pub fn recv_message(stream: &mut TcpStream) -> Option<Message> {
    let frame = read_frame(stream).unwrap()?;
    Some(Message::from_slice(&frame).unwrap())
}

pub fn send_json(stream: &mut TcpStream, value: &Value) {
    let bytes = serde_json::to_vec(value).unwrap();
    write_frame(stream, &bytes).unwrap();
}

pub fn ack_ok(ref_id: &str) -> Value {
    json!({"type": "ack", "id": "a1", "timestamp": 1700000000, "payload": {"status": "ok", "ref_id": ref_id}})
}

pub fn ack_error(reason: &str) -> Value {
    json!({"type": "ack", "id": "a1", "timestamp": 1700000000, "payload": {"status": "error", "reason": reason}})
}

pub fn ping(id: &str) -> Value {
    json!({"type": "ping", "id": id, "timestamp": 1700000000, "payload": {"device": "Relay-Server"}})
}

pub fn notification(id: &str) -> Value {
    json!({
        "type": "notification",
        "id": format!("env-{}", id),
        "timestamp": 1700000000,
        "payload": {
            "id": id,
            "app": "Messages",
            "title": "Alice",
            "body": "Lunch?",
            "package": "com.example.messages",
            "can_reply": true,
            "actions": [{"key": "reply", "type": "REPLY"}]
        }
    })
}

/// Accept the client's conn and answer with `ack`
pub fn accept_handshake(stream: &mut TcpStream, ack: &Value) -> Value {
    let conn = recv_json(stream).expect("client sent nothing");
    assert_eq!(conn["type"], "conn");
    send_json(stream, ack);
    conn
}

/// A `Read` that hands out at most `chunk` bytes per call
pub struct ChunkedReader {
    data: Vec<u8>,
    pos: usize,
    chunk: usize,
}

impl ChunkedReader {
    pub fn new(data: Vec<u8>, chunk: usize) -> Self {
        Self { data, pos: 0, chunk }
    }
}

impl Read for ChunkedReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.chunk.min(buf.len()).min(self.data.len() - self.pos);
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

/// A `Read` that replays a script of chunks and errors
pub struct ScriptedReader {
    steps: std::collections::VecDeque<io::Result<Vec<u8>>>,
}

impl ScriptedReader {
    pub fn new(steps: Vec<io::Result<Vec<u8>>>) -> Self {
        Self {
            steps: steps.into(),
        }
    }
}

impl Read for ScriptedReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.steps.pop_front() {
            None => Ok(0),
            Some(Err(e)) => Err(e),
            Some(Ok(bytes)) => {
                assert!(bytes.len() <= buf.len(), "scripted chunk larger than read buffer");
                buf[..bytes.len()].copy_from_slice(&bytes);
                Ok(bytes.len())
            }
        }
    }
}
