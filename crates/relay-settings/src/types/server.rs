//! Network, hub, and logging settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Listener settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Listen port (0 = OS-assigned).
    pub port: u16,
    /// Largest inbound frame accepted from a client, in bytes.
    pub max_message_size: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            max_message_size: 64 * 1024,
        }
    }
}

/// Per-client queue and pump timing settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HubSettings {
    /// Outbound queue capacity per client. A client whose queue is full
    /// when a broadcast reaches it is evicted.
    pub send_buffer_size: usize,
    /// Deadline for writing one frame, in milliseconds.
    pub write_wait_ms: u64,
    /// Read deadline, extended each time a pong arrives, in milliseconds.
    pub pong_wait_ms: u64,
    /// Keepalive ping period, in milliseconds. Must be shorter than
    /// `pong_wait_ms` so a healthy peer always answers in time.
    pub ping_period_ms: u64,
}

impl HubSettings {
    /// Write deadline.
    pub fn write_wait(&self) -> Duration {
        Duration::from_millis(self.write_wait_ms)
    }

    /// Read deadline.
    pub fn pong_wait(&self) -> Duration {
        Duration::from_millis(self.pong_wait_ms)
    }

    /// Keepalive period.
    pub fn ping_period(&self) -> Duration {
        Duration::from_millis(self.ping_period_ms)
    }
}

impl Default for HubSettings {
    fn default() -> Self {
        Self {
            send_buffer_size: 256,
            write_wait_ms: 10_000,
            pong_wait_ms: 60_000,
            ping_period_ms: 54_000,
        }
    }
}

/// Logging settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default level filter when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of compact text.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hub_defaults() {
        let hub = HubSettings::default();
        assert_eq!(hub.send_buffer_size, 256);
        assert_eq!(hub.write_wait(), Duration::from_secs(10));
        assert_eq!(hub.pong_wait(), Duration::from_secs(60));
        assert_eq!(hub.ping_period(), Duration::from_secs(54));
    }

    #[test]
    fn ping_period_is_nine_tenths_of_pong_wait() {
        let hub = HubSettings::default();
        assert_eq!(hub.ping_period_ms, hub.pong_wait_ms * 9 / 10);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let hub: HubSettings = serde_json::from_str(r#"{"sendBufferSize": 8}"#).unwrap();
        assert_eq!(hub.send_buffer_size, 8);
        assert_eq!(hub.write_wait_ms, 10_000);
    }

    #[test]
    fn server_field_names_are_camel_case() {
        let json = serde_json::to_value(ServerSettings::default()).unwrap();
        assert!(json.get("maxMessageSize").is_some());
        assert!(json.get("max_message_size").is_none());
    }
}
