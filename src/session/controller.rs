//! Per-connection lifecycle: join, move and disconnect handling

use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::ws::protocol::{ConnectionId, RawPosition, ServerMsg};

use super::registry::{Livery, SessionRegistry};

/// Capacity of the shared fan-out channel
const BROADCAST_CAPACITY: usize = 256;

/// Connection phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    /// Socket accepted, no join received yet
    Unjoined,
    /// Player registered
    Joined,
    /// Transport gone (terminal)
    Closed,
}

/// Server-side handle for one accepted connection
#[derive(Debug)]
pub struct Connection {
    pub id: ConnectionId,
    phase: ConnectionPhase,
}

impl Connection {
    pub fn phase(&self) -> ConnectionPhase {
        self.phase
    }
}

/// A message fanned out to every connection except its origin
#[derive(Debug, Clone)]
pub struct Broadcast {
    pub origin: ConnectionId,
    pub msg: ServerMsg,
}

impl Broadcast {
    /// Whether the connection `id` should receive this message
    pub fn is_for(&self, id: &ConnectionId) -> bool {
        &self.origin != id
    }
}

/// Binds connection events to registry operations and broadcasts
pub struct ConnectionController {
    registry: Arc<SessionRegistry>,
    broadcast_tx: broadcast::Sender<Broadcast>,
}

impl ConnectionController {
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        let (broadcast_tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            registry,
            broadcast_tx,
        }
    }

    /// Accept a new connection and assign its id
    pub fn open(&self) -> Connection {
        let connection = Connection {
            id: ConnectionId::generate(),
            phase: ConnectionPhase::Unjoined,
        };
        debug!(connection_id = %connection.id, "Connection opened");
        connection
    }

    /// Receive every broadcast; callers filter with [`Broadcast::is_for`]
    pub fn subscribe(&self) -> broadcast::Receiver<Broadcast> {
        self.broadcast_tx.subscribe()
    }

    /// Handle a join announcement.
    ///
    /// Returns the roster to deliver to the joining connection only; the
    /// `Joined` event goes to everyone else.
    pub fn handle_join(
        &self,
        connection: &mut Connection,
        name: Option<&str>,
        livery: Livery,
    ) -> Option<ServerMsg> {
        if connection.phase != ConnectionPhase::Unjoined {
            warn!(
                connection_id = %connection.id,
                phase = ?connection.phase,
                "Ignoring join outside of unjoined phase"
            );
            return None;
        }

        let player = self.registry.add_player(&connection.id, name, livery);
        connection.phase = ConnectionPhase::Joined;

        info!(
            connection_id = %connection.id,
            name = %player.name,
            player_count = self.registry.len(),
            "Player joined"
        );

        self.broadcast(&connection.id, ServerMsg::Joined { player });

        Some(ServerMsg::Roster {
            players: self.registry.all_players(),
        })
    }

    /// Handle a movement report; the validated position is what gets broadcast
    pub fn handle_move(&self, connection: &Connection, position: &RawPosition) {
        if connection.phase != ConnectionPhase::Joined {
            debug!(connection_id = %connection.id, "Dropping move from unjoined connection");
            return;
        }

        let Some(coords) = position.coords() else {
            debug!(connection_id = %connection.id, "Dropping move with non-array position");
            return;
        };

        match self.registry.update_position(&connection.id, &coords) {
            Some(player) => self.broadcast(
                &connection.id,
                ServerMsg::Moved {
                    id: player.id,
                    position: player.position,
                },
            ),
            None => {
                debug!(connection_id = %connection.id, "Dropping invalid move");
            }
        }
    }

    /// Handle transport close. Runs at most once per connection.
    pub fn handle_close(&self, connection: &mut Connection) {
        if connection.phase == ConnectionPhase::Closed {
            return;
        }
        let was_joined = connection.phase == ConnectionPhase::Joined;
        connection.phase = ConnectionPhase::Closed;

        // Entry must be gone before anyone hears about the departure
        let removed = self.registry.remove_player(&connection.id);

        if was_joined && removed.is_some() {
            info!(
                connection_id = %connection.id,
                player_count = self.registry.len(),
                "Player left"
            );
            self.broadcast(
                &connection.id,
                ServerMsg::Left {
                    id: connection.id.clone(),
                },
            );
        } else {
            debug!(connection_id = %connection.id, "Closed before joining");
        }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    fn broadcast(&self, origin: &ConnectionId, msg: ServerMsg) {
        // No receivers just means nobody else is connected
        let _ = self.broadcast_tx.send(Broadcast {
            origin: origin.clone(),
            msg,
        });
    }
}
