//! Client lifecycle from admission through disconnect.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::ws::{Message as WsMessage, WebSocket};
use futures::{Sink, SinkExt, Stream, StreamExt, future};
use metrics::{counter, histogram};
use relay_core::{ClientId, Message};
use tokio::sync::mpsc;
use tracing::{info, instrument, warn};

use super::client::Client;
use super::frame::{CLOSE_GOING_AWAY, CloseReason, Frame};
use super::hub::Hub;
use super::pumps::{inbound_pump, outbound_pump};
use crate::auth::Identity;
use crate::config::ClientConfig;
use crate::metrics::{
    RELAY_CONNECTION_DURATION_SECONDS, RELAY_CONNECTIONS_TOTAL, RELAY_DISCONNECTIONS_TOTAL,
};

/// Serve an upgraded socket for an already-admitted identity.
pub async fn run_ws_session(socket: WebSocket, identity: Identity, hub: Arc<Hub>, config: ClientConfig) {
    let (client, queue) = Client::new(
        ClientId::new(),
        identity.user_id,
        identity.role,
        config.send_buffer_size,
    );
    let (ws_tx, ws_rx) = socket.split();
    let sink = ws_tx.with(|frame: Frame| future::ready(Ok::<_, axum::Error>(WsMessage::from(frame))));
    let stream = ws_rx.map(|item| item.map(Frame::from));
    run_client(client, queue, sink, stream, &hub, config).await;
}

/// Register `client`, run both pumps, and clean up once they stop.
///
/// The outbound pump runs on its own task; the inbound pump runs on the
/// caller's. If the hub is already closed the peer gets a going-away close
/// frame and nothing is registered.
#[instrument(skip_all, fields(client_id = %client.id(), user_id = client.user_id()))]
pub async fn run_client<S, R, E>(
    client: Arc<Client>,
    queue: mpsc::Receiver<Arc<Message>>,
    mut sink: S,
    stream: R,
    hub: &Hub,
    config: ClientConfig,
) where
    S: Sink<Frame> + Unpin + Send + 'static,
    S::Error: fmt::Display,
    R: Stream<Item = Result<Frame, E>> + Unpin,
    E: fmt::Display,
{
    if let Err(error) = hub.register(&client) {
        warn!(%error, "refusing client");
        let _ = client.close();
        let _ = sink
            .send(Frame::Close(Some(CloseReason::new(
                CLOSE_GOING_AWAY,
                "server shutting down",
            ))))
            .await;
        return;
    }

    let started = Instant::now();
    counter!(RELAY_CONNECTIONS_TOTAL).increment(1);

    let outbound = tokio::spawn(outbound_pump(sink, queue, Arc::clone(&client), config));
    let inbound_result = inbound_pump(stream, Arc::clone(&client), hub, config.pong_wait).await;
    let outbound_result = match outbound.await {
        Ok(result) => result,
        Err(error) => {
            warn!(%error, "outbound pump task failed");
            Ok(())
        }
    };

    match (&inbound_result, &outbound_result) {
        (Err(error), _) | (Ok(()), Err(error)) => info!(reason = %error, "client disconnected"),
        (Ok(()), Ok(())) => info!("client disconnected"),
    }
    counter!(RELAY_DISCONNECTIONS_TOTAL).increment(1);
    histogram!(RELAY_CONNECTION_DURATION_SECONDS).record(started.elapsed().as_secs_f64());
}
