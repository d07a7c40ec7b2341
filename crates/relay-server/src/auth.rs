//! Identity resolution for admission and management requests.
//!
//! The hub trusts whatever identity it is handed. Turning a credential into
//! that identity happens here, behind [`IdentityResolver`], before a client
//! exists.

use std::collections::HashMap;

use async_trait::async_trait;
use axum::http::{HeaderMap, header};
use relay_core::{AdmissionError, UserId};
use relay_settings::AuthSettings;

/// A verified `(user, role)` pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    /// Authenticated user.
    pub user_id: UserId,
    /// Authenticated role.
    pub role: String,
}

impl Identity {
    /// Build an identity.
    pub fn new(user_id: UserId, role: impl Into<String>) -> Self {
        Self {
            user_id,
            role: role.into(),
        }
    }
}

/// Resolves an opaque credential to an [`Identity`].
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Resolve `token`, or explain why it cannot be admitted.
    async fn resolve(&self, token: &str) -> Result<Identity, AdmissionError>;
}

/// Resolver backed by a fixed token table.
#[derive(Clone, Debug, Default)]
pub struct StaticTokenResolver {
    tokens: HashMap<String, Identity>,
}

impl StaticTokenResolver {
    /// Build from `(token, identity)` pairs.
    pub fn new(tokens: impl IntoIterator<Item = (String, Identity)>) -> Self {
        Self {
            tokens: tokens.into_iter().collect(),
        }
    }

    /// Build from the `auth.tokens` settings table.
    pub fn from_settings(settings: &AuthSettings) -> Self {
        Self::new(settings.tokens.iter().map(|(token, entry)| {
            (token.clone(), Identity::new(entry.user_id, entry.role.clone()))
        }))
    }

    /// Number of known tokens.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[async_trait]
impl IdentityResolver for StaticTokenResolver {
    async fn resolve(&self, token: &str) -> Result<Identity, AdmissionError> {
        if token.is_empty() {
            return Err(AdmissionError::MissingToken);
        }
        self.tokens
            .get(token)
            .cloned()
            .ok_or(AdmissionError::InvalidToken)
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}
