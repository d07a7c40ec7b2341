//! # relay-settings
//!
//! Configuration management with layered sources for the relay hub.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`RelaySettings::default()`]
//! 2. **Settings file**: `~/.relay/settings.json` or an explicit path
//! 3. **Environment variables**: `RELAY_*` overrides (highest priority)
//!
//! There is no global instance: the binary loads settings once and passes
//! the pieces each component needs.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    apply_env_overrides, deep_merge, load_settings, load_settings_from_path, settings_path,
};
pub use types::*;
