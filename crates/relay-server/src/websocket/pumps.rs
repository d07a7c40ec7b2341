//! The two tasks that drive one client.
//!
//! The outbound pump owns the write half: it drains the client's queue,
//! sends keepalive pings after a period of outbound silence, and closes the
//! connection when it stops. The inbound pump owns the read half: it only
//! watches for liveness (pongs) and termination, then unregisters the client.
//!
//! A closed queue is drained before the outbound pump exits. Transport
//! failure on either side aborts the client, which stops the other pump
//! immediately.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures::{Sink, SinkExt, Stream, StreamExt};
use relay_core::{Message, TransportError};
use tokio::sync::mpsc;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, trace, warn};

use super::client::Client;
use super::frame::{CLOSE_NORMAL, CloseReason, Frame};
use super::hub::Hub;
use crate::config::ClientConfig;

/// Write one frame within `deadline`.
async fn write_frame<S>(sink: &mut S, frame: Frame, deadline: Duration) -> Result<(), TransportError>
where
    S: Sink<Frame> + Unpin,
    S::Error: fmt::Display,
{
    match time::timeout(deadline, sink.send(frame)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(error)) => Err(TransportError::Write(error.to_string())),
        Err(_) => Err(TransportError::Timeout("write")),
    }
}

/// Drain `queue` into `sink` until the queue ends, the client is aborted, or
/// a write fails.
///
/// Every write is bounded by `write_wait`. A ping is sent whenever
/// `ping_period` passes without an outbound frame. On exit the client is
/// aborted and, unless a write timed out, a close frame is attempted.
pub async fn outbound_pump<S>(
    mut sink: S,
    mut queue: mpsc::Receiver<Arc<Message>>,
    client: Arc<Client>,
    config: ClientConfig,
) -> Result<(), TransportError>
where
    S: Sink<Frame> + Unpin,
    S::Error: fmt::Display,
{
    let mut keepalive = time::interval_at(Instant::now() + config.ping_period, config.ping_period);
    keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let result = loop {
        tokio::select! {
            biased;
            () = client.aborted() => break Ok(()),
            next = queue.recv() => {
                let Some(message) = next else { break Ok(()) };
                let text = match message.to_json() {
                    Ok(text) => text,
                    Err(error) => {
                        warn!(
                            client_id = %client.id(),
                            event_type = %message.event_type(),
                            %error,
                            "failed to serialize message, skipping"
                        );
                        continue;
                    }
                };
                if let Err(error) = write_frame(&mut sink, Frame::Text(text), config.write_wait).await {
                    break Err(error);
                }
                keepalive.reset();
            }
            _ = keepalive.tick() => {
                trace!(client_id = %client.id(), "sending keepalive ping");
                if let Err(error) = write_frame(&mut sink, Frame::Ping(Vec::new()), config.write_wait).await {
                    break Err(error);
                }
            }
        }
    };

    if let Err(error) = &result {
        debug!(client_id = %client.id(), %error, "outbound pump stopped");
    }
    let _ = client.abort();

    // A peer that stalled one write will stall the goodbye too.
    if !matches!(result, Err(TransportError::Timeout(_))) {
        let goodbye = Frame::Close(Some(CloseReason::new(CLOSE_NORMAL, "")));
        let _ = write_frame(&mut sink, goodbye, config.write_wait).await;
        let _ = time::timeout(config.write_wait, sink.close()).await;
    }
    result
}

/// Watch `stream` for liveness until it ends, then unregister and abort the
/// client.
///
/// The read deadline starts at `pong_wait` and is pushed back only by pong
/// frames. Client payloads are read and discarded.
pub async fn inbound_pump<R, E>(
    mut stream: R,
    client: Arc<Client>,
    hub: &Hub,
    pong_wait: Duration,
) -> Result<(), TransportError>
where
    R: Stream<Item = Result<Frame, E>> + Unpin,
    E: fmt::Display,
{
    let deadline = time::sleep(pong_wait);
    tokio::pin!(deadline);

    let result = loop {
        tokio::select! {
            biased;
            () = client.aborted() => break Ok(()),
            () = &mut deadline => break Err(TransportError::Timeout("read")),
            next = stream.next() => match next {
                Some(Ok(Frame::Pong(_))) => {
                    trace!(client_id = %client.id(), "pong received");
                    deadline.as_mut().reset(Instant::now() + pong_wait);
                }
                Some(Ok(Frame::Close(reason))) => {
                    debug!(client_id = %client.id(), ?reason, "peer sent close frame");
                    break Err(TransportError::Closed);
                }
                Some(Ok(Frame::Ping(_))) => {}
                Some(Ok(Frame::Text(_) | Frame::Binary(_))) => {
                    trace!(client_id = %client.id(), "ignoring inbound payload");
                }
                Some(Err(error)) => break Err(TransportError::Read(error.to_string())),
                None => break Err(TransportError::Closed),
            },
        }
    };

    let _ = hub.unregister(&client);
    let _ = client.abort();
    result
}
