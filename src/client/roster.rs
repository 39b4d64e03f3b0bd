//! Local view of the other players in the session

use std::collections::HashMap;

use super::sync::SyncEvent;
use crate::vehicle::HudFrame;
use crate::ws::protocol::{ConnectionId, PlayerState};

/// Connection status as shown in the overlay
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    Error(String),
    Disconnected(String),
}

/// Where to draw one remote kart
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteMarker {
    pub id: ConnectionId,
    pub name: String,
    pub color: String,
    pub car: String,
    pub position: [f64; 3],
}

/// Everything the UI layer draws in one frame
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayFrame {
    pub hud: HudFrame,
    pub status: ConnectionStatus,
    /// Sorted by id
    pub remote: Vec<RemoteMarker>,
}

/// Remote players, kept up to date from [`SyncEvent`]s
#[derive(Debug, Clone)]
pub struct RemoteRoster {
    players: HashMap<ConnectionId, PlayerState>,
    status: ConnectionStatus,
}

impl Default for RemoteRoster {
    fn default() -> Self {
        Self {
            players: HashMap::new(),
            status: ConnectionStatus::Connecting,
        }
    }
}

impl RemoteRoster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, event: &SyncEvent) {
        match event {
            // The roster follows the welcome; stay "connecting" until it lands
            SyncEvent::Connected { .. } => {}
            SyncEvent::Roster(players) => {
                self.players = players.clone();
                self.status = ConnectionStatus::Connected;
            }
            SyncEvent::PlayerJoined(player) => {
                self.players.insert(player.id.clone(), player.clone());
            }
            SyncEvent::PlayerMoved { id, position } => {
                if let Some(player) = self.players.get_mut(id) {
                    player.position = *position;
                }
            }
            SyncEvent::PlayerLeft { id } => {
                self.players.remove(id);
            }
            SyncEvent::ConnectionError(msg) => {
                self.status = ConnectionStatus::Error(msg.clone());
            }
            SyncEvent::Disconnected(reason) => {
                self.status = ConnectionStatus::Disconnected(reason.clone());
            }
        }
    }

    pub fn get(&self, id: &ConnectionId) -> Option<&PlayerState> {
        self.players.get(id)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn status(&self) -> &ConnectionStatus {
        &self.status
    }

    pub fn overlay(&self, hud: HudFrame) -> OverlayFrame {
        let mut remote: Vec<RemoteMarker> = self
            .players
            .values()
            .map(|p| RemoteMarker {
                id: p.id.clone(),
                name: p.name.clone(),
                color: p.color.clone(),
                car: p.car.clone(),
                position: p.position,
            })
            .collect();
        remote.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));

        OverlayFrame {
            hud,
            status: self.status.clone(),
            remote,
        }
    }
}
