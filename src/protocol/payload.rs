//! Payload definitions
//!
//! One record per message type. Every field has a default so a payload with
//! missing keys still deserializes; unknown keys are ignored. An explicit
//! `null` reads the same as a missing key.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Well-known `notification_action` types
pub mod action_type {
    /// Reply through the notification's remote input
    pub const REMOTE_INPUT: &str = "remote_input";

    /// Trigger a plain notification action button
    pub const ACTION: &str = "action";

    /// Dismiss the notification
    pub const DISMISS: &str = "notification_dismiss";
}

/// Deserialize `null` as the field's default
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Any JSON value as a status string; non-strings keep their JSON text
fn status_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(status) => status,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

// =============================================================================
// Connection
// =============================================================================

/// Device descriptor carried by `conn`
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceInfo {
    pub device_name: String,
    pub platform: String,
    pub version: String,

    /// Declared capabilities, e.g. `notification`, `ping`
    pub supports: Vec<String>,

    /// Opaque token, passed through untouched
    pub auth_token: String,
}

impl Default for DeviceInfo {
    fn default() -> Self {
        Self {
            device_name: "Relay-Listener".to_string(),
            platform: std::env::consts::OS.to_string(),
            version: crate::VERSION.to_string(),
            supports: vec!["notification".to_string(), "ping".to_string()],
            auth_token: String::new(),
        }
    }
}

// Keeps the token out of logs
impl fmt::Debug for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceInfo")
            .field("device_name", &self.device_name)
            .field("platform", &self.platform)
            .field("version", &self.version)
            .field("supports", &self.supports)
            .field("auth_token", &if self.auth_token.is_empty() { "" } else { "***" })
            .finish()
    }
}

/// Ack status values
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AckStatus {
    Ok,
    Error,
    /// Any other value, including a missing status
    Other(String),
}

/// Payload of `ack`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AckPayload {
    /// Raw status; see [`AckPayload::status`]
    #[serde(deserialize_with = "status_text")]
    pub status: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ref_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl AckPayload {
    /// Create an accepting ack
    pub fn ok(ref_id: impl Into<String>) -> Self {
        Self {
            status: "ok".to_string(),
            ref_id: Some(ref_id.into()),
            reason: None,
        }
    }

    /// Create a rejecting ack
    pub fn error(reason: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            ref_id: None,
            reason: Some(reason.into()),
        }
    }

    pub fn status(&self) -> AckStatus {
        match self.status.as_str() {
            "ok" => AckStatus::Ok,
            "error" => AckStatus::Error,
            other => AckStatus::Other(other.to_string()),
        }
    }
}

// =============================================================================
// Liveness
// =============================================================================

/// Payload of both `ping` and `pong`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeartbeatPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
}

impl HeartbeatPayload {
    pub fn from_device(device: impl Into<String>) -> Self {
        Self {
            device: Some(device.into()),
        }
    }
}

// =============================================================================
// Notifications
// =============================================================================

/// One action offered by a notification
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationActionEntry {
    #[serde(deserialize_with = "null_as_default")]
    pub key: String,

    #[serde(rename = "type", deserialize_with = "null_as_default")]
    pub kind: String,

    /// Button label, when the device sends one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Payload of `notification`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationPayload {
    /// Device-side notification identifier
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub app: String,
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(deserialize_with = "null_as_default")]
    pub body: String,
    #[serde(deserialize_with = "null_as_default")]
    pub package: String,

    /// When the notification was posted (seconds since epoch)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,

    #[serde(deserialize_with = "null_as_default")]
    pub can_reply: bool,

    #[serde(deserialize_with = "null_as_default")]
    pub actions: Vec<NotificationActionEntry>,
}

impl NotificationPayload {
    /// Look up an offered action by key
    pub fn action(&self, key: &str) -> Option<&NotificationActionEntry> {
        self.actions.iter().find(|a| a.key == key)
    }

    /// Build the request that triggers one of this notification's actions
    pub fn trigger(&self, entry: &NotificationActionEntry) -> NotificationActionPayload {
        NotificationActionPayload::new(&self.id, &entry.key, &entry.kind)
    }
}

/// Payload of `notification_action`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationActionPayload {
    /// Target notification's payload `id`
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,

    /// Action key; absent for dismissals
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    #[serde(rename = "type", deserialize_with = "null_as_default")]
    pub kind: String,

    /// Reply text for remote input actions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl NotificationActionPayload {
    pub fn new(id: impl Into<String>, key: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            key: Some(key.into()),
            kind: kind.into(),
            body: None,
        }
    }

    /// Trigger a plain action button
    pub fn trigger(id: impl Into<String>, key: impl Into<String>) -> Self {
        Self::new(id, key, action_type::ACTION)
    }

    /// Answer through a remote input action
    pub fn reply(id: impl Into<String>, key: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            body: Some(body.into()),
            ..Self::new(id, key, action_type::REMOTE_INPUT)
        }
    }

    /// Dismiss the notification on the device
    pub fn dismiss(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            key: None,
            kind: action_type::DISMISS.to_string(),
            body: None,
        }
    }
}
