//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase")]` and `#[serde(default)]`,
//! so a settings file only needs the keys it changes.

mod auth;
mod server;

pub use auth::*;
pub use server::*;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings type.
///
/// ```json
/// {
///   "server": { "port": 9090 },
///   "hub": { "sendBufferSize": 512 },
///   "auth": { "tokens": { "s3cret": { "userId": 1, "role": "admin" } } }
/// }
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RelaySettings {
    /// Listener settings.
    pub server: ServerSettings,
    /// Queue and pump timing.
    pub hub: HubSettings,
    /// Admission table.
    pub auth: AuthSettings,
    /// Logging.
    pub logging: LoggingSettings,
}

impl RelaySettings {
    /// Reject combinations the hub cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.hub.send_buffer_size == 0 {
            return Err(SettingsError::InvalidValue(
                "hub.sendBufferSize must be greater than 0".into(),
            ));
        }
        if self.hub.write_wait_ms == 0 {
            return Err(SettingsError::InvalidValue(
                "hub.writeWaitMs must be greater than 0".into(),
            ));
        }
        if self.hub.ping_period_ms == 0 || self.hub.ping_period_ms >= self.hub.pong_wait_ms {
            return Err(SettingsError::InvalidValue(format!(
                "hub.pingPeriodMs ({}) must be non-zero and below hub.pongWaitMs ({})",
                self.hub.ping_period_ms, self.hub.pong_wait_ms
            )));
        }
        if self.auth.admin_role.is_empty() {
            return Err(SettingsError::InvalidValue(
                "auth.adminRole must not be empty".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(RelaySettings::default().validate().is_ok());
    }

    #[test]
    fn zero_buffer_rejected() {
        let mut s = RelaySettings::default();
        s.hub.send_buffer_size = 0;
        let err = s.validate().unwrap_err();
        assert!(err.to_string().contains("sendBufferSize"));
    }

    #[test]
    fn ping_period_must_undercut_pong_wait() {
        let mut s = RelaySettings::default();
        s.hub.ping_period_ms = s.hub.pong_wait_ms;
        assert!(s.validate().is_err());
        s.hub.ping_period_ms = 0;
        assert!(s.validate().is_err());
    }

    #[test]
    fn empty_admin_role_rejected() {
        let mut s = RelaySettings::default();
        s.auth.admin_role.clear();
        assert!(s.validate().is_err());
    }

    #[test]
    fn empty_object_is_all_defaults() {
        let s: RelaySettings = serde_json::from_str("{}").unwrap();
        assert_eq!(s.server.port, 8080);
        assert_eq!(s.hub.send_buffer_size, 256);
        assert_eq!(s.logging.level, "info");
    }
}
