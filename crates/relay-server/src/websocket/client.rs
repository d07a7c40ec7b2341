//! Admitted client state.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use relay_core::{ClientId, Message, UserId};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

/// Outcome of a non-blocking enqueue.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Enqueue {
    /// Accepted into the outbound queue.
    Queued,
    /// Queue at capacity; the client is a slow consumer.
    Full,
    /// Queue already closed; the client is being torn down.
    Closed,
}

/// One admitted connection.
///
/// Identity is fixed at admission. The outbound queue sender lives behind a
/// mutex so [`Client::close`] can drop it, which makes any later enqueue
/// report [`Enqueue::Closed`] and lets the outbound pump drain what is left
/// before it observes the end of the queue. [`Client::abort`] also stops both
/// pumps at once, discarding anything still queued.
pub struct Client {
    id: ClientId,
    user_id: UserId,
    role: String,
    queue: Mutex<Option<mpsc::Sender<Arc<Message>>>>,
    closing: AtomicBool,
    shutdown: CancellationToken,
    connected_at: Instant,
    /// Messages refused because the queue was full or closed.
    dropped_messages: AtomicU64,
}

impl Client {
    /// Create a client with an outbound queue of `capacity` messages.
    ///
    /// Returns the client and the receiving half of its queue, which belongs
    /// to the outbound pump.
    pub fn new(
        id: ClientId,
        user_id: UserId,
        role: impl Into<String>,
        capacity: usize,
    ) -> (Arc<Self>, mpsc::Receiver<Arc<Message>>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let client = Arc::new(Self {
            id,
            user_id,
            role: role.into(),
            queue: Mutex::new(Some(tx)),
            closing: AtomicBool::new(false),
            shutdown: CancellationToken::new(),
            connected_at: Instant::now(),
            dropped_messages: AtomicU64::new(0),
        });
        (client, rx)
    }

    /// Unique client ID.
    pub fn id(&self) -> &ClientId {
        &self.id
    }

    /// Authenticated user.
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Authenticated role.
    pub fn role(&self) -> &str {
        &self.role
    }

    /// Try to enqueue without blocking.
    pub fn try_enqueue(&self, message: Arc<Message>) -> Enqueue {
        let outcome = match self.queue.lock().as_ref() {
            None => Enqueue::Closed,
            Some(tx) => match tx.try_send(message) {
                Ok(()) => return Enqueue::Queued,
                Err(TrySendError::Full(_)) => Enqueue::Full,
                Err(TrySendError::Closed(_)) => Enqueue::Closed,
            },
        };
        let _ = self.dropped_messages.fetch_add(1, Ordering::Relaxed);
        outcome
    }

    /// Close the outbound queue. Messages already queued are still written.
    ///
    /// Idempotent; returns `true` only for the call that performed the close.
    pub fn close(&self) -> bool {
        drop(self.queue.lock().take());
        !self.closing.swap(true, Ordering::AcqRel)
    }

    /// Close the queue and stop both pumps without draining.
    ///
    /// Returns `true` only if this call performed the close.
    pub fn abort(&self) -> bool {
        let first = self.close();
        self.shutdown.cancel();
        first
    }

    /// Whether [`Client::close`] or [`Client::abort`] has been called.
    pub fn is_closed(&self) -> bool {
        self.closing.load(Ordering::Acquire)
    }

    /// Resolves once the client is aborted.
    pub fn aborted(&self) -> WaitForCancellationFuture<'_> {
        self.shutdown.cancelled()
    }

    /// Messages refused so far.
    pub fn drop_count(&self) -> u64 {
        self.dropped_messages.load(Ordering::Relaxed)
    }

    /// Connection age.
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("id", &self.id)
            .field("user_id", &self.user_id)
            .field("role", &self.role)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}
