//! # relay-core
//!
//! Foundation types shared by the relay crates:
//!
//! - **Envelope**: [`Message`] and the closed set of [`EventType`] tags
//! - **Branded IDs**: [`ClientId`] for admitted connections
//! - **Errors**: hub, admission, and transport error enums via `thiserror`
//! - **Logging**: `tracing-subscriber` bootstrap for binaries

#![deny(unsafe_code)]

pub mod errors;
pub mod events;
pub mod ids;
pub mod logging;

pub use errors::{AdmissionError, HubError, RelayError, TransportError};
pub use events::{EventType, Message, Payload, UserId};
pub use ids::ClientId;
