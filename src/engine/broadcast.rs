//! Room-based best-effort broadcast to connection outbound queues

use std::collections::{HashMap, HashSet};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, warn};

use super::messages::OutboundMessage;
use crate::common::types::{ConnectionId, Room};

#[derive(Default)]
struct HubState {
    connections: HashMap<ConnectionId, mpsc::Sender<OutboundMessage>>,
    rooms: HashMap<Room, HashSet<ConnectionId>>,
}

/// Connection sets keyed by room name
///
/// Publishing never waits on a consumer: a full queue drops the message for
/// that connection only.
#[derive(Default)]
pub struct RoomHub {
    state: RwLock<HubState>,
}

impl RoomHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a connection's outbound queue
    pub async fn register(&self, connection: ConnectionId, sender: mpsc::Sender<OutboundMessage>) {
        self.state.write().await.connections.insert(connection, sender);
    }

    /// Detach a connection and leave every room
    pub async fn remove_connection(&self, connection: ConnectionId) {
        let mut state = self.state.write().await;
        state.connections.remove(&connection);
        state.rooms.retain(|_, members| {
            members.remove(&connection);
            !members.is_empty()
        });
    }

    /// Returns false if the connection was already in the room
    pub async fn join(&self, connection: ConnectionId, room: Room) -> bool {
        self.state
            .write()
            .await
            .rooms
            .entry(room)
            .or_default()
            .insert(connection)
    }

    /// Returns false if the connection was not in the room
    pub async fn leave(&self, connection: ConnectionId, room: &Room) -> bool {
        let mut state = self.state.write().await;
        let Some(members) = state.rooms.get_mut(room) else {
            return false;
        };
        let removed = members.remove(&connection);
        if members.is_empty() {
            state.rooms.remove(room);
        }
        removed
    }

    /// Empty a room; returns how many members it had
    pub async fn leave_all(&self, room: &Room) -> usize {
        self.state
            .write()
            .await
            .rooms
            .remove(room)
            .map(|members| members.len())
            .unwrap_or(0)
    }

    pub async fn is_member(&self, connection: ConnectionId, room: &Room) -> bool {
        self.state
            .read()
            .await
            .rooms
            .get(room)
            .map(|m| m.contains(&connection))
            .unwrap_or(false)
    }

    pub async fn members(&self, room: &Room) -> Vec<ConnectionId> {
        let mut members: Vec<_> = self
            .state
            .read()
            .await
            .rooms
            .get(room)
            .map(|m| m.iter().copied().collect())
            .unwrap_or_default();
        members.sort();
        members
    }

    pub async fn connection_count(&self) -> usize {
        self.state.read().await.connections.len()
    }

    /// Deliver to every member of `room`; returns how many queues accepted it
    pub async fn publish(&self, room: &Room, message: OutboundMessage) -> usize {
        let state = self.state.read().await;
        let Some(members) = state.rooms.get(room) else {
            debug!("No members in {}, dropping {}", room, message.event_name());
            return 0;
        };

        let mut delivered = 0;
        for connection in members {
            if let Some(sender) = state.connections.get(connection) {
                if deliver(*connection, sender, message.clone()) {
                    delivered += 1;
                }
            }
        }
        debug!(
            "Published {} to {} ({}/{} delivered)",
            message.event_name(),
            room,
            delivered,
            members.len()
        );
        delivered
    }

    /// Deliver to a single connection regardless of rooms
    pub async fn send_to(&self, connection: ConnectionId, message: OutboundMessage) -> bool {
        let state = self.state.read().await;
        match state.connections.get(&connection) {
            Some(sender) => deliver(connection, sender, message),
            None => false,
        }
    }
}

fn deliver(
    connection: ConnectionId,
    sender: &mpsc::Sender<OutboundMessage>,
    message: OutboundMessage,
) -> bool {
    match sender.try_send(message) {
        Ok(()) => true,
        Err(TrySendError::Full(message)) => {
            warn!(
                "Outbound queue full for {}, dropping {}",
                connection,
                message.event_name()
            );
            false
        }
        Err(TrySendError::Closed(_)) => {
            debug!("Outbound queue closed for {}", connection);
            false
        }
    }
}
