//! Prometheus metrics recorder and `/metrics` endpoint handler.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Install the Prometheus metrics recorder (global).
///
/// Returns the `PrometheusHandle` used to render the `/metrics` endpoint.
/// Call once at startup before any metrics are recorded; a second install
/// fails because a global recorder is already set.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    info!("prometheus metrics recorder installed");
    Ok(handle)
}

/// Render Prometheus text format from the installed recorder.
pub fn render(handle: &PrometheusHandle) -> String {
    handle.render()
}

// Metric name constants shared by the hub and the session code.

/// Clients admitted total (counter).
pub const RELAY_CONNECTIONS_TOTAL: &str = "relay_connections_total";
/// Clients currently registered (gauge).
pub const RELAY_CONNECTIONS_ACTIVE: &str = "relay_connections_active";
/// Clients disconnected total (counter).
pub const RELAY_DISCONNECTIONS_TOTAL: &str = "relay_disconnections_total";
/// Broadcasts dispatched total (counter, labels: scope).
pub const RELAY_BROADCASTS_TOTAL: &str = "relay_broadcasts_total";
/// Messages accepted into client queues total (counter).
pub const RELAY_MESSAGES_ENQUEUED_TOTAL: &str = "relay_messages_enqueued_total";
/// Slow consumers evicted total (counter).
pub const RELAY_EVICTIONS_TOTAL: &str = "relay_evictions_total";
/// Admissions rejected total (counter, labels: reason).
pub const RELAY_ADMISSIONS_REJECTED_TOTAL: &str = "relay_admissions_rejected_total";
/// Client connection lifetime seconds (histogram).
pub const RELAY_CONNECTION_DURATION_SECONDS: &str = "relay_connection_duration_seconds";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_without_global_install() {
        let handle = PrometheusBuilder::new().build_recorder().handle();
        let output = render(&handle);
        assert!(output.is_empty() || output.contains('#') || output.contains('\n'));
    }

    #[test]
    fn metric_constants_are_snake_case() {
        let names = [
            RELAY_CONNECTIONS_TOTAL,
            RELAY_CONNECTIONS_ACTIVE,
            RELAY_DISCONNECTIONS_TOTAL,
            RELAY_BROADCASTS_TOTAL,
            RELAY_MESSAGES_ENQUEUED_TOTAL,
            RELAY_EVICTIONS_TOTAL,
            RELAY_ADMISSIONS_REJECTED_TOTAL,
            RELAY_CONNECTION_DURATION_SECONDS,
        ];
        for name in names {
            assert!(
                name.chars().all(|c| c.is_ascii_lowercase() || c == '_'),
                "metric name '{name}' must be snake_case"
            );
            assert!(name.starts_with("relay_"));
        }
    }
}
