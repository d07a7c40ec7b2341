//! # relay-server
//!
//! Real-time event hub served over axum WebSockets.
//!
//! - [`Hub`]: registry of live clients with all/user/role fan-out and
//!   slow-consumer eviction
//! - Per-client outbound and inbound pumps with write/read deadlines and
//!   keepalive pings
//! - HTTP surface: `GET /ws?token=` admission, `GET /stats`, `POST /alerts`,
//!   `GET /metrics`
//! - Graceful shutdown via `CancellationToken`

#![deny(unsafe_code)]

pub mod auth;
pub mod config;
pub mod metrics;
pub mod server;
pub mod shutdown;
pub mod websocket;

pub use auth::{Identity, IdentityResolver, StaticTokenResolver};
pub use config::{ClientConfig, ServerConfig};
pub use server::{ApiError, AppState, RelayServer};
pub use shutdown::ShutdownCoordinator;
pub use websocket::client::Client;
pub use websocket::hub::{BroadcastReport, Hub, HubStats};
