//! Message definitions
//!
//! The JSON envelope shared by every message and the typed body selected by
//! its `type` tag.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{RelayError, Result};
use super::payload::{
    null_as_default, AckPayload, DeviceInfo, HeartbeatPayload, NotificationActionPayload,
    NotificationPayload,
};

/// Message type tags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Conn,
    Ack,
    Ping,
    Pong,
    Notification,
    NotificationAction,
    Unknown,
}

impl MessageType {
    /// Wire tag, `None` for unknown
    pub fn as_str(&self) -> Option<&'static str> {
        match self {
            MessageType::Conn => Some("conn"),
            MessageType::Ack => Some("ack"),
            MessageType::Ping => Some("ping"),
            MessageType::Pong => Some("pong"),
            MessageType::Notification => Some("notification"),
            MessageType::NotificationAction => Some("notification_action"),
            MessageType::Unknown => None,
        }
    }

    fn from_tag(tag: &str) -> Self {
        match tag {
            "conn" => MessageType::Conn,
            "ack" => MessageType::Ack,
            "ping" => MessageType::Ping,
            "pong" => MessageType::Pong,
            "notification" => MessageType::Notification,
            "notification_action" => MessageType::NotificationAction,
            _ => MessageType::Unknown,
        }
    }
}

/// Typed message body
#[derive(Debug, Clone, PartialEq)]
pub enum MessageBody {
    Conn(DeviceInfo),
    Ack(AckPayload),
    Ping(HeartbeatPayload),
    Pong(HeartbeatPayload),
    Notification(NotificationPayload),
    NotificationAction(NotificationActionPayload),

    /// Unrecognized tag, kept as-is for forward compatibility
    Unknown {
        kind: String,
        payload: Map<String, Value>,
    },
}

impl MessageBody {
    pub fn message_type(&self) -> MessageType {
        match self {
            MessageBody::Conn(_) => MessageType::Conn,
            MessageBody::Ack(_) => MessageType::Ack,
            MessageBody::Ping(_) => MessageType::Ping,
            MessageBody::Pong(_) => MessageType::Pong,
            MessageBody::Notification(_) => MessageType::Notification,
            MessageBody::NotificationAction(_) => MessageType::NotificationAction,
            MessageBody::Unknown { .. } => MessageType::Unknown,
        }
    }

    /// The `type` string as it appears on the wire
    pub fn kind(&self) -> &str {
        match self {
            MessageBody::Unknown { kind, .. } => kind.as_str(),
            other => other.message_type().as_str().unwrap_or_default(),
        }
    }
}

/// A protocol message
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// Correlation identifier; generated at serialization when absent
    pub id: Option<String>,

    /// Seconds since epoch at construction
    pub timestamp: i64,

    pub body: MessageBody,
}

/// Raw envelope as it appears on the wire
#[derive(Serialize, Deserialize)]
struct Envelope {
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    timestamp: i64,

    #[serde(default)]
    payload: Value,
}

impl Message {
    /// Create a message with a fresh identifier and the current time
    pub fn new(body: MessageBody) -> Self {
        Self {
            id: Some(new_id()),
            timestamp: unix_now(),
            body,
        }
    }

    /// Create a message carrying a caller-chosen identifier
    pub fn with_id(id: impl Into<String>, body: MessageBody) -> Self {
        Self {
            id: Some(id.into()),
            timestamp: unix_now(),
            body,
        }
    }

    pub fn conn(device: DeviceInfo) -> Self {
        Self::new(MessageBody::Conn(device))
    }

    /// A pong; `id` should be the ping's identifier
    pub fn pong(id: Option<String>, device: impl Into<String>) -> Self {
        Self {
            id,
            timestamp: unix_now(),
            body: MessageBody::Pong(HeartbeatPayload::from_device(device)),
        }
    }

    pub fn notification_action(action: NotificationActionPayload) -> Self {
        Self::new(MessageBody::NotificationAction(action))
    }

    pub fn message_type(&self) -> MessageType {
        self.body.message_type()
    }

    pub fn kind(&self) -> &str {
        self.body.kind()
    }

    // =========================================================================
    // Serialization
    // =========================================================================

    /// Render as UTF-8 JSON
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let payload = match &self.body {
            MessageBody::Conn(p) => serde_json::to_value(p),
            MessageBody::Ack(p) => serde_json::to_value(p),
            MessageBody::Ping(p) | MessageBody::Pong(p) => serde_json::to_value(p),
            MessageBody::Notification(p) => serde_json::to_value(p),
            MessageBody::NotificationAction(p) => serde_json::to_value(p),
            MessageBody::Unknown { payload, .. } => Ok(Value::Object(payload.clone())),
        }
        .map_err(|e| RelayError::Decode(format!("cannot render payload: {}", e)))?;

        let envelope = Envelope {
            kind: self.kind().to_string(),
            id: Some(self.id.clone().unwrap_or_else(new_id)),
            timestamp: self.timestamp,
            payload,
        };

        serde_json::to_vec(&envelope)
            .map_err(|e| RelayError::Decode(format!("cannot render message: {}", e)))
    }

    /// Parse UTF-8 JSON into a message
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| RelayError::Decode(format!("payload is not valid UTF-8: {}", e)))?;

        let value: Value = serde_json::from_str(text)?;
        if !value.is_object() {
            return Err(RelayError::Decode(format!(
                "expected a JSON object, got {}",
                json_kind(&value)
            )));
        }

        let envelope: Envelope = serde_json::from_value(value)?;
        let payload = match envelope.payload {
            Value::Null => Value::Object(Map::new()),
            obj @ Value::Object(_) => obj,
            other => {
                return Err(RelayError::Decode(format!(
                    "payload must be an object, got {}",
                    json_kind(&other)
                )))
            }
        };

        let body = match MessageType::from_tag(&envelope.kind) {
            MessageType::Conn => MessageBody::Conn(serde_json::from_value(payload)?),
            MessageType::Ack => MessageBody::Ack(serde_json::from_value(payload)?),
            MessageType::Ping => MessageBody::Ping(serde_json::from_value(payload)?),
            MessageType::Pong => MessageBody::Pong(serde_json::from_value(payload)?),
            MessageType::Notification => {
                MessageBody::Notification(serde_json::from_value(payload)?)
            }
            MessageType::NotificationAction => {
                MessageBody::NotificationAction(serde_json::from_value(payload)?)
            }
            MessageType::Unknown => MessageBody::Unknown {
                kind: envelope.kind,
                payload: match payload {
                    Value::Object(map) => map,
                    _ => Map::new(),
                },
            },
        };

        Ok(Self {
            id: envelope.id,
            timestamp: envelope.timestamp,
            body,
        })
    }
}

/// Random 128-bit identifier in string form
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Current wall-clock time in seconds since epoch
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
