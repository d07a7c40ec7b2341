//! Error taxonomy for the relay hub.
//!
//! - [`HubError`]: operations refused by the hub itself (after shutdown)
//! - [`AdmissionError`]: identity resolution failed before a client existed
//! - [`TransportError`]: read/write failures local to one client
//! - [`RelayError`]: top-level enum wrapping all of the above
//!
//! Slow-consumer eviction has no variant: a full outbound queue shows up in
//! the broadcast report and the log, never as an error.

use thiserror::Error;

/// Errors returned by hub operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HubError {
    /// The hub has been shut down and accepts no more work.
    #[error("hub is closed")]
    Closed,
}

/// Errors raised while resolving a connecting client's identity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdmissionError {
    /// No credential was supplied with the connection request.
    #[error("missing credential")]
    MissingToken,
    /// The credential was supplied but did not resolve to an identity.
    #[error("invalid credential")]
    InvalidToken,
    /// The identity backend could not be reached.
    #[error("identity backend unavailable: {0}")]
    Unavailable(String),
}

/// Errors raised by a client's pumps while talking to its transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Writing a frame failed.
    #[error("write failed: {0}")]
    Write(String),
    /// Reading a frame failed.
    #[error("read failed: {0}")]
    Read(String),
    /// A deadline elapsed.
    #[error("{0} deadline elapsed")]
    Timeout(&'static str),
    /// The peer closed the connection.
    #[error("connection closed by peer")]
    Closed,
}

/// Top-level error type.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Hub refused the operation.
    #[error(transparent)]
    Hub(#[from] HubError),
    /// Admission failed.
    #[error(transparent)]
    Admission(#[from] AdmissionError),
    /// Transport failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// Serialization failed.
    #[error("serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result alias using [`RelayError`].
pub type Result<T> = std::result::Result<T, RelayError>;
