use std::collections::{HashMap, HashSet};
use tokio::sync::{mpsc, Mutex, MutexGuard};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::events::ServerEvent;
use crate::services::errors::registry_errors::RegistryError;

/// Close code sent to a channel that was superseded by a newer one.
pub const REPLACED_CLOSE_CODE: u16 = 4000;

/// What the socket writer task for one connection should do next.
#[derive(Debug, Clone)]
pub enum Outgoing {
    Event(ServerEvent),
    Close { code: u16, reason: String },
}

pub type OutgoingSender = mpsc::UnboundedSender<Outgoing>;
pub type OutgoingReceiver = mpsc::UnboundedReceiver<Outgoing>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOutcome {
    New,
    /// A previous channel for the same identity was closed.
    Replaced,
}

#[derive(Debug, Clone)]
pub struct Registration {
    pub connection_id: String,
    pub outcome: RegisterOutcome,
}

struct Connection {
    connection_id: String,
    tx: OutgoingSender,
    rooms: HashSet<String>,
}

/// Connections and room memberships, always mutated together under one lock.
#[derive(Default)]
pub(crate) struct RegistryState {
    connections: HashMap<String, Connection>,
    rooms: HashMap<String, HashSet<String>>,
}

impl RegistryState {
    fn push(&self, user_id: &str, outgoing: Outgoing) -> bool {
        match self.connections.get(user_id) {
            Some(connection) => connection.tx.send(outgoing).is_ok(),
            None => false,
        }
    }

    /// Drops a connection and every room membership it held.
    fn remove(&mut self, user_id: &str) -> Option<Connection> {
        let connection = self.connections.remove(user_id)?;
        for room_id in &connection.rooms {
            if let Some(members) = self.rooms.get_mut(room_id) {
                members.remove(user_id);
                if members.is_empty() {
                    self.rooms.remove(room_id);
                }
            }
        }
        Some(connection)
    }

    /// Sends to each target. Targets whose channel is gone are disconnected,
    /// and the new online count goes out to whoever remains.
    pub(crate) fn deliver(&mut self, targets: &[String], event: &ServerEvent) -> usize {
        let mut delivered = 0;
        let mut failed = Vec::new();
        for user_id in targets {
            if !self.connections.contains_key(user_id) {
                continue;
            }
            if self.push(user_id, Outgoing::Event(event.clone())) {
                delivered += 1;
            } else {
                failed.push(user_id.clone());
            }
        }
        if !failed.is_empty() {
            self.purge(failed);
        }
        delivered
    }

    fn purge(&mut self, mut failed: Vec<String>) {
        while !failed.is_empty() {
            for user_id in &failed {
                if self.remove(user_id).is_some() {
                    warn!(user_id = %user_id, "Delivery failed, dropping connection");
                }
            }
            failed = self.announce_count();
        }
    }

    /// Broadcasts `online_count` and returns identities whose send failed.
    fn announce_count(&self) -> Vec<String> {
        let event = ServerEvent::OnlineCount {
            count: self.connections.len(),
        };
        self.connections
            .iter()
            .filter(|(_, c)| c.tx.send(Outgoing::Event(event.clone())).is_err())
            .map(|(user_id, _)| user_id.clone())
            .collect()
    }

    fn broadcast_count(&mut self) {
        let failed = self.announce_count();
        self.purge(failed);
    }

    pub(crate) fn join(&mut self, user_id: &str, room_id: &str) -> bool {
        let Some(connection) = self.connections.get_mut(user_id) else {
            return false;
        };
        connection.rooms.insert(room_id.to_string());
        self.rooms
            .entry(room_id.to_string())
            .or_default()
            .insert(user_id.to_string());
        true
    }

    pub(crate) fn leave(&mut self, user_id: &str, room_id: &str) -> bool {
        if let Some(connection) = self.connections.get_mut(user_id) {
            connection.rooms.remove(room_id);
        }
        let Some(members) = self.rooms.get_mut(room_id) else {
            return false;
        };
        let removed = members.remove(user_id);
        if members.is_empty() {
            self.rooms.remove(room_id);
        }
        removed
    }

    pub(crate) fn members(&self, room_id: &str) -> Vec<String> {
        let mut members: Vec<String> = self
            .rooms
            .get(room_id)
            .map(|m| m.iter().cloned().collect())
            .unwrap_or_default();
        members.sort();
        members
    }

    pub(crate) fn rooms_of(&self, user_id: &str) -> Vec<String> {
        let mut rooms: Vec<String> = self
            .connections
            .get(user_id)
            .map(|c| c.rooms.iter().cloned().collect())
            .unwrap_or_default();
        rooms.sort();
        rooms
    }

    pub(crate) fn room_exists(&self, room_id: &str) -> bool {
        self.rooms.contains_key(room_id)
    }
}

/// Tracks which identities hold an open real-time channel.
#[derive(Default)]
pub struct ConnectionRegistry {
    state: Mutex<RegistryState>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) async fn state(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().await
    }

    /// Registers a channel for `user_id`. An existing channel for the same
    /// identity is closed and replaced; its room memberships carry over.
    pub async fn register(&self, user_id: &str, tx: OutgoingSender) -> Registration {
        let mut state = self.state.lock().await;
        let connection_id = Uuid::new_v4().to_string();

        let (outcome, rooms) = match state.connections.remove(user_id) {
            Some(previous) => {
                let _ = previous.tx.send(Outgoing::Close {
                    code: REPLACED_CLOSE_CODE,
                    reason: "replaced".to_string(),
                });
                info!(user_id = %user_id, old_connection = %previous.connection_id, "Replacing existing connection");
                (RegisterOutcome::Replaced, previous.rooms)
            }
            None => (RegisterOutcome::New, HashSet::new()),
        };

        state.connections.insert(
            user_id.to_string(),
            Connection {
                connection_id: connection_id.clone(),
                tx,
                rooms,
            },
        );
        info!(user_id = %user_id, connection_id = %connection_id, online = state.connections.len(), "Connection registered");
        state.broadcast_count();

        Registration {
            connection_id,
            outcome,
        }
    }

    /// Removes the channel for `user_id`, if any. Idempotent.
    pub async fn deregister(&self, user_id: &str) -> bool {
        let mut state = self.state.lock().await;
        if state.remove(user_id).is_none() {
            return false;
        }
        info!(user_id = %user_id, online = state.connections.len(), "Connection deregistered");
        state.broadcast_count();
        true
    }

    /// Like [`deregister`](Self::deregister), but only if `connection_id` is
    /// still the current channel. A replaced socket uses this on shutdown so it
    /// does not tear down its successor.
    pub async fn deregister_connection(&self, user_id: &str, connection_id: &str) -> bool {
        let mut state = self.state.lock().await;
        let is_current = state
            .connections
            .get(user_id)
            .map(|c| c.connection_id == connection_id)
            .unwrap_or(false);
        if !is_current {
            debug!(user_id = %user_id, connection_id = %connection_id, "Stale connection closed");
            return false;
        }
        state.remove(user_id);
        info!(user_id = %user_id, online = state.connections.len(), "Connection deregistered");
        state.broadcast_count();
        true
    }

    pub async fn is_online(&self, user_id: &str) -> bool {
        self.state.lock().await.connections.contains_key(user_id)
    }

    pub async fn online_count(&self) -> usize {
        self.state.lock().await.connections.len()
    }

    pub async fn online_users(&self) -> Vec<String> {
        let mut users: Vec<String> = self
            .state
            .lock()
            .await
            .connections
            .keys()
            .cloned()
            .collect();
        users.sort();
        users
    }

    /// Delivers one event. A failed send counts as a disconnect.
    pub async fn send(&self, user_id: &str, event: ServerEvent) -> Result<(), RegistryError> {
        let mut state = self.state.lock().await;
        if state.deliver(&[user_id.to_string()], &event) == 1 {
            Ok(())
        } else {
            Err(RegistryError::NotConnected(user_id.to_string()))
        }
    }

    /// Delivers to every connection; returns how many received it.
    pub async fn broadcast(&self, event: ServerEvent) -> usize {
        let mut state = self.state.lock().await;
        let targets: Vec<String> = state.connections.keys().cloned().collect();
        state.deliver(&targets, &event)
    }
}
