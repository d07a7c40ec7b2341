//! `RelayServer`: axum admission endpoint and management routes.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use metrics::counter;
use metrics_exporter_prometheus::PrometheusHandle;
use relay_core::{AdmissionError, HubError, Payload};
use serde::Deserialize;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::auth::{Identity, IdentityResolver, bearer_token};
use crate::config::ServerConfig;
use crate::metrics::{RELAY_ADMISSIONS_REJECTED_TOTAL, render};
use crate::shutdown::ShutdownCoordinator;
use crate::websocket::hub::{BroadcastReport, Hub, HubStats};
use crate::websocket::session::run_ws_session;

/// Errors surfaced to HTTP callers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Credential missing, invalid, or unverifiable.
    #[error(transparent)]
    Admission(#[from] AdmissionError),
    /// Authenticated, but the role may not perform the operation.
    #[error("role '{0}' may not issue system alerts")]
    Forbidden(String),
    /// The hub is shut down.
    #[error(transparent)]
    Hub(#[from] HubError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Admission(AdmissionError::MissingToken | AdmissionError::InvalidToken) => {
                StatusCode::UNAUTHORIZED
            }
            Self::Admission(AdmissionError::Unavailable(_)) | Self::Hub(HubError::Closed) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = serde_json::json!({ "error": self.to_string() });
        (status, Json(body)).into_response()
    }
}

/// Shared state accessible from axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Client registry.
    pub hub: Arc<Hub>,
    /// Credential resolver.
    pub resolver: Arc<dyn IdentityResolver>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Prometheus handle, when a recorder is installed.
    pub metrics: Option<PrometheusHandle>,
}

/// The relay server.
pub struct RelayServer {
    config: Arc<ServerConfig>,
    hub: Arc<Hub>,
    resolver: Arc<dyn IdentityResolver>,
    shutdown: Arc<ShutdownCoordinator>,
    metrics: Option<PrometheusHandle>,
}

impl RelayServer {
    /// Create a server with a fresh hub.
    pub fn new(config: ServerConfig, resolver: Arc<dyn IdentityResolver>) -> Self {
        Self {
            config: Arc::new(config),
            hub: Arc::new(Hub::new()),
            resolver,
            shutdown: Arc::new(ShutdownCoordinator::new()),
            metrics: None,
        }
    }

    /// Serve `/metrics` from `handle`.
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Build the axum router with all routes.
    pub fn router(&self) -> Router {
        let state = AppState {
            hub: Arc::clone(&self.hub),
            resolver: Arc::clone(&self.resolver),
            config: Arc::clone(&self.config),
            metrics: self.metrics.clone(),
        };

        Router::new()
            .route("/ws", get(ws_handler))
            .route("/stats", get(stats_handler))
            .route("/alerts", post(alert_handler))
            .route("/metrics", get(metrics_handler))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Bind and serve on a background task until shutdown.
    ///
    /// Returns the bound address (useful with port `0`) and the server task.
    pub async fn listen(&self) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
        let listener = TcpListener::bind((self.config.host.as_str(), self.config.port)).await?;
        let addr = listener.local_addr()?;
        let app = self.router();
        let token = self.shutdown.token();

        let handle = tokio::spawn(async move {
            if let Err(error) = axum::serve(listener, app)
                .with_graceful_shutdown(token.cancelled_owned())
                .await
            {
                error!(%error, "server stopped with error");
            }
        });
        info!(%addr, "relay listening");
        Ok((addr, handle))
    }

    /// The client registry.
    pub fn hub(&self) -> &Arc<Hub> {
        &self.hub
    }

    /// The shutdown coordinator.
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    /// The server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

#[derive(Debug, Deserialize)]
struct ConnectParams {
    token: Option<String>,
}

async fn admit(resolver: &dyn IdentityResolver, token: Option<&str>) -> Result<Identity, ApiError> {
    let token = token
        .filter(|t| !t.is_empty())
        .ok_or(AdmissionError::MissingToken)?;
    Ok(resolver.resolve(token).await?)
}

fn rejection_reason(error: &ApiError) -> &'static str {
    match error {
        ApiError::Admission(AdmissionError::MissingToken) => "missing_token",
        ApiError::Admission(AdmissionError::InvalidToken) => "invalid_token",
        ApiError::Admission(AdmissionError::Unavailable(_)) => "unavailable",
        ApiError::Forbidden(_) => "forbidden",
        ApiError::Hub(_) => "hub_closed",
    }
}

/// GET /ws?token=...
async fn ws_handler(
    State(state): State<AppState>,
    Query(params): Query<ConnectParams>,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let admitted = match admit(state.resolver.as_ref(), params.token.as_deref()).await {
        Ok(_) if state.hub.is_closed() => Err(ApiError::Hub(HubError::Closed)),
        other => other,
    };
    let identity = match admitted {
        Ok(identity) => identity,
        Err(error) => {
            warn!(%error, "admission rejected");
            counter!(RELAY_ADMISSIONS_REJECTED_TOTAL, "reason" => rejection_reason(&error))
                .increment(1);
            return error.into_response();
        }
    };
    let upgrade = match upgrade {
        Ok(upgrade) => upgrade,
        Err(rejection) => return rejection.into_response(),
    };

    let hub = Arc::clone(&state.hub);
    let client_config = state.config.client;
    upgrade
        .max_message_size(state.config.max_message_size)
        .on_upgrade(move |socket| run_ws_session(socket, identity, hub, client_config))
}

/// GET /stats
async fn stats_handler(State(state): State<AppState>) -> Json<HubStats> {
    Json(state.hub.stats())
}

/// POST /alerts (admin only)
async fn alert_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<Payload>,
) -> Result<Json<BroadcastReport>, ApiError> {
    let identity = admit(state.resolver.as_ref(), bearer_token(&headers)).await?;
    if identity.role != state.config.admin_role {
        warn!(user_id = identity.user_id, role = %identity.role, "alert refused");
        return Err(ApiError::Forbidden(identity.role));
    }
    let report = state.hub.broadcast_system_alert(payload)?;
    info!(
        user_id = identity.user_id,
        recipients = report.recipients,
        evicted = report.evicted,
        "system alert issued"
    );
    Ok(Json(report))
}

/// GET /metrics
async fn metrics_handler(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => render(handle).into_response(),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed").into_response(),
    }
}
