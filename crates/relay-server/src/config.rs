//! Server and per-client runtime configuration.
//!
//! These are the resolved, typed views of [`RelaySettings`] that the server
//! and the client pumps actually consume.

use std::time::Duration;

use relay_settings::RelaySettings;

/// Queue capacity and pump deadlines for every admitted client.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    /// Outbound queue capacity.
    pub send_buffer_size: usize,
    /// Deadline for writing one frame.
    pub write_wait: Duration,
    /// Read deadline, extended on every pong.
    pub pong_wait: Duration,
    /// Keepalive period after outbound inactivity.
    pub ping_period: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            send_buffer_size: 256,
            write_wait: Duration::from_secs(10),
            pong_wait: Duration::from_secs(60),
            ping_period: Duration::from_secs(54),
        }
    }
}

/// Configuration for the relay server.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Host to bind.
    pub host: String,
    /// Port to bind (`0` for auto-assign).
    pub port: u16,
    /// Largest inbound WebSocket message accepted, in bytes.
    pub max_message_size: usize,
    /// Role allowed to issue system alerts.
    pub admin_role: String,
    /// Per-client settings.
    pub client: ClientConfig,
}

impl ServerConfig {
    /// Resolve from loaded settings.
    pub fn from_settings(settings: &RelaySettings) -> Self {
        Self {
            host: settings.server.host.clone(),
            port: settings.server.port,
            max_message_size: settings.server.max_message_size,
            admin_role: settings.auth.admin_role.clone(),
            client: ClientConfig {
                send_buffer_size: settings.hub.send_buffer_size,
                write_wait: settings.hub.write_wait(),
                pong_wait: settings.hub.pong_wait(),
                ping_period: settings.hub.ping_period(),
            },
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            max_message_size: 64 * 1024,
            admin_role: "admin".into(),
            client: ClientConfig::default(),
        }
    }
}
