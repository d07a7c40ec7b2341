//! Admission settings for the bundled static-token resolver.

use std::collections::HashMap;

use relay_core::UserId;
use serde::{Deserialize, Serialize};

/// Identity a static token resolves to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenIdentity {
    /// Authenticated user.
    pub user_id: UserId,
    /// Role of that user.
    pub role: String,
}

/// Token table and management gate.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthSettings {
    /// Token → identity table.
    pub tokens: HashMap<String, TokenIdentity>,
    /// Role allowed to issue system alerts.
    pub admin_role: String,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            tokens: HashMap::new(),
            admin_role: "admin".to_string(),
        }
    }
}
