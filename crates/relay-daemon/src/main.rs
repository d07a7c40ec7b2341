//! # relay-daemon
//!
//! Relay hub binary: loads settings, installs logging and metrics, and
//! serves the hub until Ctrl-C.

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use relay_core::logging::{LogFormat, init_subscriber};
use relay_server::{RelayServer, ServerConfig, StaticTokenResolver};
use relay_settings::{RelaySettings, load_settings_from_path, settings_path};

/// Real-time event relay.
#[derive(Parser, Debug)]
#[command(name = "relay-daemon", about = "Real-time event relay server")]
struct Cli {
    /// Settings file (defaults to `~/.relay/settings.json`).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, 0 for auto-assign (overrides settings).
    #[arg(long)]
    port: Option<u16>,

    /// Log filter directive, e.g. `debug` or `relay_server=trace`.
    #[arg(long)]
    log_level: Option<String>,

    /// Emit JSON log lines.
    #[arg(long)]
    log_json: bool,
}

impl Cli {
    /// Layer command-line flags over loaded settings.
    fn apply(&self, settings: &mut RelaySettings) {
        if let Some(host) = &self.host {
            settings.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(level) = &self.log_level {
            settings.logging.level.clone_from(level);
        }
        if self.log_json {
            settings.logging.json = true;
        }
    }

    fn resolve_settings(&self) -> Result<RelaySettings> {
        let path = self.config.clone().unwrap_or_else(settings_path);
        let mut settings = load_settings_from_path(&path)
            .with_context(|| format!("failed to load settings from {}", path.display()))?;
        self.apply(&mut settings);
        settings.validate().context("invalid settings")?;
        Ok(settings)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = cli.resolve_settings()?;

    let format = if settings.logging.json {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };
    init_subscriber(&settings.logging.level, format);

    let metrics = relay_server::metrics::install_recorder()
        .context("failed to install metrics recorder")?;

    let resolver = StaticTokenResolver::from_settings(&settings.auth);
    if resolver.is_empty() {
        tracing::warn!("no tokens configured, every connection will be refused");
    }

    let server = RelayServer::new(ServerConfig::from_settings(&settings), Arc::new(resolver))
        .with_metrics(metrics);
    let (addr, handle) = server.listen().await.context("failed to bind listener")?;
    tracing::info!(
        tokens = settings.auth.tokens.len(),
        send_buffer = settings.hub.send_buffer_size,
        "relay listening on ws://{addr}/ws"
    );

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;

    tracing::info!("shutting down");
    server
        .shutdown()
        .graceful_shutdown(server.hub(), vec![handle], None)
        .await;
    Ok(())
}
