//! Graceful shutdown coordination via `CancellationToken`.

use std::time::Duration;

use tokio::task::{AbortHandle, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::websocket::hub::Hub;

/// Default timeout for graceful shutdown before giving up on tasks.
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Coordinates shutdown of the listener, the hub, and tracked tasks.
pub struct ShutdownCoordinator {
    token: CancellationToken,
}

impl ShutdownCoordinator {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// Get a clone of the cancellation token.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Initiate shutdown.
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    /// Whether a shutdown has been initiated.
    pub fn is_shutting_down(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Shut everything down.
    ///
    /// 1. Cancel the token (the listener stops accepting)
    /// 2. Close the hub, which closes every registered client
    /// 3. Wait up to `timeout` for the tracked tasks to finish
    /// 4. Abort any remaining tasks after timeout
    pub async fn graceful_shutdown(
        &self,
        hub: &Hub,
        handles: Vec<JoinHandle<()>>,
        timeout: Option<Duration>,
    ) {
        let timeout = timeout.unwrap_or(DEFAULT_SHUTDOWN_TIMEOUT);

        self.shutdown();
        let closed = hub.shutdown();
        info!(
            clients_closed = closed,
            task_count = handles.len(),
            timeout_secs = timeout.as_secs(),
            "waiting for tasks to complete"
        );

        let aborts: Vec<AbortHandle> = handles.iter().map(JoinHandle::abort_handle).collect();
        let drain = futures::future::join_all(handles);

        if tokio::time::timeout(timeout, drain).await.is_err() {
            warn!("shutdown timed out after {timeout:?}, aborting remaining tasks");
            for task in &aborts {
                task.abort();
            }
        }
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::websocket::client::Client;
    use relay_core::ClientId;
    use tokio::sync::oneshot;

    #[test]
    fn initial_state_not_shutting_down() {
        let coord = ShutdownCoordinator::default();
        assert!(!coord.is_shutting_down());
    }

    #[test]
    fn shutdown_is_idempotent_and_propagates() {
        let coord = ShutdownCoordinator::new();
        let token = coord.token();
        coord.shutdown();
        coord.shutdown();
        assert!(coord.is_shutting_down());
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn graceful_shutdown_closes_hub_and_awaits_tasks() {
        let coord = ShutdownCoordinator::new();
        let hub = Hub::new();
        let (client, _rx) = Client::new(ClientId::new(), 1, "user", 8);
        hub.register(&client).unwrap();

        let token = coord.token();
        let handle = tokio::spawn(async move {
            token.cancelled().await;
        });

        coord.graceful_shutdown(&hub, vec![handle], None).await;
        assert!(coord.is_shutting_down());
        assert!(hub.is_closed());
        assert!(client.is_closed());
        assert_eq!(hub.client_count(), 0);
    }

    #[tokio::test]
    async fn graceful_shutdown_aborts_stragglers() {
        let coord = ShutdownCoordinator::new();
        let hub = Hub::new();

        let (alive, dropped) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            let _alive = alive;
            tokio::time::sleep(Duration::from_secs(300)).await;
        });

        coord
            .graceful_shutdown(&hub, vec![handle], Some(Duration::from_millis(100)))
            .await;
        assert!(coord.is_shutting_down());
        // Aborting the task drops its sender.
        assert!(tokio::time::timeout(Duration::from_secs(5), dropped).await.unwrap().is_err());
    }
}
