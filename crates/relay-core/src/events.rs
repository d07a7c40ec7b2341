//! Event envelope delivered to connected clients.
//!
//! Every frame the hub writes has the same shape:
//!
//! ```json
//! {"type": "user.updated", "data": {...}, "timestamp": "2026-01-01T00:00:00Z"}
//! ```
//!
//! `data` is an opaque JSON object. The hub never looks inside it; producers
//! decide what goes there and clients decide what it means.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Schema-less payload carried by a [`Message`].
pub type Payload = Map<String, Value>;

/// Numeric identifier of an authenticated user.
pub type UserId = i64;

/// Event tags understood by clients.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    /// Sent once to a client right after it is admitted.
    #[serde(rename = "connection.established")]
    ConnectionEstablished,
    /// A user account was created.
    #[serde(rename = "user.created")]
    UserCreated,
    /// A user account was modified.
    #[serde(rename = "user.updated")]
    UserUpdated,
    /// A user account was removed.
    #[serde(rename = "user.deleted")]
    UserDeleted,
    /// A user's role changed.
    #[serde(rename = "user.role.changed")]
    UserRoleChanged,
    /// A profile was edited.
    #[serde(rename = "profile.updated")]
    ProfileUpdated,
    /// A password was changed.
    #[serde(rename = "password.changed")]
    PasswordChanged,
    /// Operator-issued alert.
    #[serde(rename = "system.alert")]
    SystemAlert,
    /// Health status of the backend changed.
    #[serde(rename = "health.status.changed")]
    HealthStatusChanged,
}

impl EventType {
    /// All known tags, in declaration order.
    pub const ALL: [Self; 9] = [
        Self::ConnectionEstablished,
        Self::UserCreated,
        Self::UserUpdated,
        Self::UserDeleted,
        Self::UserRoleChanged,
        Self::ProfileUpdated,
        Self::PasswordChanged,
        Self::SystemAlert,
        Self::HealthStatusChanged,
    ];

    /// Wire tag for this event.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ConnectionEstablished => "connection.established",
            Self::UserCreated => "user.created",
            Self::UserUpdated => "user.updated",
            Self::UserDeleted => "user.deleted",
            Self::UserRoleChanged => "user.role.changed",
            Self::ProfileUpdated => "profile.updated",
            Self::PasswordChanged => "password.changed",
            Self::SystemAlert => "system.alert",
            Self::HealthStatusChanged => "health.status.changed",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable event envelope.
///
/// Fields are private so a message cannot be altered after dispatch; one
/// instance is shared by `Arc` across every recipient of a broadcast.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "type")]
    event_type: EventType,
    data: Payload,
    timestamp: DateTime<Utc>,
}

impl Message {
    /// Build a message stamped with the current time.
    pub fn new(event_type: EventType, data: Payload) -> Self {
        Self {
            event_type,
            data,
            timestamp: Utc::now(),
        }
    }

    /// The greeting queued for a freshly admitted client.
    pub fn connection_established(client_id: &str, user_id: UserId, role: &str) -> Self {
        let mut data = Payload::new();
        let _ = data.insert("clientId".into(), Value::from(client_id));
        let _ = data.insert("userId".into(), Value::from(user_id));
        let _ = data.insert("role".into(), Value::from(role));
        Self::new(EventType::ConnectionEstablished, data)
    }

    /// Event tag.
    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    /// Opaque payload.
    pub fn data(&self) -> &Payload {
        &self.data
    }

    /// Dispatch time.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Serialize to the JSON text written on the wire.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
