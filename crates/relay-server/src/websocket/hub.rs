//! Connection registry and targeted fan-out.
//!
//! One reader/writer lock guards the registry. Register, unregister, stats,
//! and every broadcast take it directly from the caller's context; there is
//! no hub task. Broadcasts hold the read lock while enqueueing, so they run
//! concurrently with each other and never suspend. Clients whose queue is
//! full are collected during the pass and evicted under the write lock right
//! after it.

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use metrics::{counter, gauge};
use parking_lot::RwLock;
use relay_core::{ClientId, EventType, HubError, Message, Payload, UserId};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::client::{Client, Enqueue};
use crate::metrics::{
    RELAY_BROADCASTS_TOTAL, RELAY_CONNECTIONS_ACTIVE, RELAY_EVICTIONS_TOTAL,
    RELAY_MESSAGES_ENQUEUED_TOTAL,
};

/// Registry snapshot.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HubStats {
    /// Registered clients.
    pub total_clients: usize,
    /// Registered clients per role. Sums to `total_clients`.
    pub clients_by_role: BTreeMap<String, usize>,
}

/// Outcome of one broadcast.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastReport {
    /// Clients matching the scope at enumeration time.
    pub recipients: usize,
    /// Clients whose queue accepted the message.
    pub delivered: usize,
    /// Clients evicted because their queue was full.
    pub evicted: usize,
    /// Clients already closing when the message reached them.
    pub skipped: usize,
}

/// Which registered clients a broadcast targets.
#[derive(Clone, Copy, Debug)]
enum Scope<'a> {
    All,
    User(UserId),
    Role(&'a str),
}

impl Scope<'_> {
    fn matches(self, client: &Client) -> bool {
        match self {
            Self::All => true,
            Self::User(user_id) => client.user_id() == user_id,
            Self::Role(role) => client.role() == role,
        }
    }

    fn kind(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::User(_) => "user",
            Self::Role(_) => "role",
        }
    }
}

impl fmt::Display for Scope<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::User(user_id) => write!(f, "user:{user_id}"),
            Self::Role(role) => write!(f, "role:{role}"),
        }
    }
}

#[derive(Default)]
struct Registry {
    clients: HashMap<ClientId, Arc<Client>>,
    closed: bool,
}

/// Registry of live clients.
#[derive(Default)]
pub struct Hub {
    registry: RwLock<Registry>,
}

impl Hub {
    /// Create an empty, open hub.
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit a client and queue its `connection.established` greeting.
    ///
    /// Registering a client that is already present, or one that has already
    /// been closed, is a no-op. Fails only after [`Hub::shutdown`].
    pub fn register(&self, client: &Arc<Client>) -> Result<(), HubError> {
        let total = {
            let mut registry = self.registry.write();
            if registry.closed {
                return Err(HubError::Closed);
            }
            if client.is_closed() {
                warn!(client_id = %client.id(), "client already closed, ignoring");
                return Ok(());
            }
            match registry.clients.entry(client.id().clone()) {
                Entry::Occupied(_) => {
                    warn!(client_id = %client.id(), "client already registered, ignoring");
                    return Ok(());
                }
                Entry::Vacant(slot) => {
                    let _ = slot.insert(Arc::clone(client));
                }
            }
            // Queued under the lock so no broadcast can overtake the greeting.
            let greeting = Message::connection_established(
                client.id().as_str(),
                client.user_id(),
                client.role(),
            );
            if client.try_enqueue(Arc::new(greeting)) != Enqueue::Queued {
                debug!(client_id = %client.id(), "greeting not queued");
            }
            registry.clients.len()
        };

        info!(
            client_id = %client.id(),
            user_id = client.user_id(),
            role = client.role(),
            total,
            "client registered"
        );
        gauge!(RELAY_CONNECTIONS_ACTIVE).set(total as f64);
        Ok(())
    }

    /// Remove a client and close its queue.
    ///
    /// The client's outbound pump writes whatever was already queued before
    /// closing the connection. Only the exact client instance that was
    /// registered is removed. Unregistering an absent client still closes it
    /// and is otherwise a no-op. Returns whether the client was present.
    pub fn unregister(&self, client: &Arc<Client>) -> bool {
        // Closed first, so a racing register of the same client is refused.
        let _ = client.close();
        self.detach(client)
    }

    fn detach(&self, client: &Arc<Client>) -> bool {
        let remaining = {
            let mut registry = self.registry.write();
            match registry.clients.get(client.id()) {
                Some(existing) if Arc::ptr_eq(existing, client) => {
                    let _ = registry.clients.remove(client.id());
                    Some(registry.clients.len())
                }
                _ => None,
            }
        };

        match remaining {
            Some(total) => {
                info!(
                    client_id = %client.id(),
                    user_id = client.user_id(),
                    total,
                    "client unregistered"
                );
                gauge!(RELAY_CONNECTIONS_ACTIVE).set(total as f64);
                true
            }
            None => false,
        }
    }

    /// Send to every registered client.
    pub fn broadcast_all(
        &self,
        event_type: EventType,
        payload: Payload,
    ) -> Result<BroadcastReport, HubError> {
        self.fan_out(Scope::All, Message::new(event_type, payload))
    }

    /// Send to every client of one user.
    pub fn broadcast_to_user(
        &self,
        user_id: UserId,
        event_type: EventType,
        payload: Payload,
    ) -> Result<BroadcastReport, HubError> {
        self.fan_out(Scope::User(user_id), Message::new(event_type, payload))
    }

    /// Send to every client holding `role` (exact match).
    pub fn broadcast_to_role(
        &self,
        role: &str,
        event_type: EventType,
        payload: Payload,
    ) -> Result<BroadcastReport, HubError> {
        self.fan_out(Scope::Role(role), Message::new(event_type, payload))
    }

    /// `system.alert` to everyone. The caller is responsible for checking
    /// that the issuer may send alerts.
    pub fn broadcast_system_alert(&self, payload: Payload) -> Result<BroadcastReport, HubError> {
        self.broadcast_all(EventType::SystemAlert, payload)
    }

    fn fan_out(&self, scope: Scope<'_>, message: Message) -> Result<BroadcastReport, HubError> {
        let event_type = message.event_type();
        let message = Arc::new(message);
        let mut report = BroadcastReport::default();
        let mut slow = Vec::new();

        {
            let registry = self.registry.read();
            if registry.closed {
                return Err(HubError::Closed);
            }
            for client in registry.clients.values().filter(|c| scope.matches(c)) {
                report.recipients += 1;
                match client.try_enqueue(Arc::clone(&message)) {
                    Enqueue::Queued => report.delivered += 1,
                    Enqueue::Full => slow.push(Arc::clone(client)),
                    Enqueue::Closed => report.skipped += 1,
                }
            }
        }

        for client in &slow {
            self.evict(client);
        }
        report.evicted = slow.len();

        counter!(RELAY_BROADCASTS_TOTAL, "scope" => scope.kind()).increment(1);
        counter!(RELAY_MESSAGES_ENQUEUED_TOTAL).increment(report.delivered as u64);
        debug!(
            event_type = %event_type,
            scope = %scope,
            recipients = report.recipients,
            delivered = report.delivered,
            evicted = report.evicted,
            "broadcast event"
        );
        Ok(report)
    }

    fn evict(&self, client: &Arc<Client>) {
        warn!(
            client_id = %client.id(),
            user_id = client.user_id(),
            role = client.role(),
            "outbound queue full, evicting slow consumer"
        );
        counter!(RELAY_EVICTIONS_TOTAL).increment(1);
        let _ = client.abort();
        let _ = self.detach(client);
    }

    /// Snapshot of the registry taken under a single lock acquisition.
    pub fn stats(&self) -> HubStats {
        let registry = self.registry.read();
        let mut clients_by_role = BTreeMap::new();
        for client in registry.clients.values() {
            *clients_by_role.entry(client.role().to_owned()).or_insert(0) += 1;
        }
        HubStats {
            total_clients: registry.clients.len(),
            clients_by_role,
        }
    }

    /// Number of registered clients.
    pub fn client_count(&self) -> usize {
        self.registry.read().clients.len()
    }

    /// Whether a client with this ID is registered.
    pub fn contains(&self, client_id: &ClientId) -> bool {
        self.registry.read().clients.contains_key(client_id)
    }

    /// Whether [`Hub::shutdown`] has been called.
    pub fn is_closed(&self) -> bool {
        self.registry.read().closed
    }

    /// Refuse further work and close every registered client.
    ///
    /// Each client's outbound pump drains its queue before disconnecting.
    /// Idempotent; returns how many clients this call closed.
    pub fn shutdown(&self) -> usize {
        let drained: Vec<Arc<Client>> = {
            let mut registry = self.registry.write();
            registry.closed = true;
            registry.clients.drain().map(|(_, client)| client).collect()
        };
        for client in &drained {
            let _ = client.close();
        }
        if !drained.is_empty() {
            info!(clients_closed = drained.len(), "hub shut down");
        }
        gauge!(RELAY_CONNECTIONS_ACTIVE).set(0.0);
        drained.len()
    }
}
