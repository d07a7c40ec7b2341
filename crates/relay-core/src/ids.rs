//! Branded client identifier.
//!
//! A [`ClientId`] names one admitted connection. It is distinct from the
//! numeric user ID: a single user may hold many connections at once, and the
//! hub keys its registry by connection, never by user.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for one admitted connection.
///
/// Freshly generated IDs are UUID v7 (time-ordered), so registry dumps and
/// log lines sort by admission time.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(String);

impl ClientId {
    /// Create a new random ID (UUID v7).
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Return the inner string as a slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume self and return the inner `String`.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for ClientId {
    type Target = str;
    fn deref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ClientId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ClientId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ClientId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<ClientId> for String {
    fn from(id: ClientId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_is_uuid_v7() {
        let id = ClientId::new();
        let parsed = Uuid::parse_str(id.as_str()).expect("should be valid UUID");
        assert_eq!(parsed.get_version(), Some(uuid::Version::SortRand));
    }

    #[test]
    fn ids_are_unique() {
        assert_ne!(ClientId::new(), ClientId::new());
    }

    #[test]
    fn fresh_ids_sort_by_creation() {
        let a = ClientId::new();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let b = ClientId::new();
        assert!(a < b);
    }

    #[test]
    fn deref_and_display() {
        let id = ClientId::from("conn-7");
        let s: &str = &id;
        assert_eq!(s, "conn-7");
        assert_eq!(format!("{id}"), "conn-7");
    }

    #[test]
    fn serializes_as_plain_string() {
        let id = ClientId::from("c1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"c1\"");
        let back: ClientId = serde_json::from_str("\"c1\"").unwrap();
        assert_eq!(back, id);
    }
}
