//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Opaque per-connection identifier assigned by the server on accept
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(String);

impl ConnectionId {
    /// Allocate a fresh random id
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ConnectionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A replicated participant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    pub id: ConnectionId,
    pub name: String,
    pub position: [f64; 3],
    /// Paint color tag
    pub color: String,
    /// Vehicle model variant tag
    pub car: String,
}

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Announce the player after the welcome frame
    Join {
        #[serde(default, deserialize_with = "lenient_string")]
        name: Option<String>,
        #[serde(default, deserialize_with = "lenient_string")]
        color: Option<String>,
        #[serde(default, deserialize_with = "lenient_string")]
        car: Option<String>,
    },

    /// Report the local vehicle position
    Move { position: RawPosition },
}

/// Position as received on the wire, before validation.
///
/// Kept as raw JSON so the registry can repair individual axes instead of
/// rejecting the whole frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawPosition(Value);

impl RawPosition {
    /// Per-axis view: `None` for any element that is not a JSON number.
    /// Returns `None` when the payload is not an array at all.
    pub fn coords(&self) -> Option<Vec<Option<f64>>> {
        match &self.0 {
            Value::Array(items) => Some(items.iter().map(Value::as_f64).collect()),
            _ => None,
        }
    }
}

impl From<[f64; 3]> for RawPosition {
    fn from(position: [f64; 3]) -> Self {
        Self(Value::from(position.to_vec()))
    }
}

impl From<Value> for RawPosition {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// First frame on every connection
    Welcome { id: ConnectionId },

    /// Everyone currently registered, sent to a player right after it joins
    Roster {
        players: HashMap<ConnectionId, PlayerState>,
    },

    /// Another player joined
    Joined { player: PlayerState },

    /// Another player moved (validated position)
    Moved {
        id: ConnectionId,
        position: [f64; 3],
    },

    /// Another player disconnected
    Left { id: ConnectionId },
}

impl ServerMsg {
    /// The player an event refers to, if it is about a single player
    pub fn subject(&self) -> Option<&ConnectionId> {
        match self {
            ServerMsg::Joined { player } => Some(&player.id),
            ServerMsg::Moved { id, .. } | ServerMsg::Left { id } => Some(id),
            ServerMsg::Welcome { .. } | ServerMsg::Roster { .. } => None,
        }
    }
}

/// Accept any JSON value, keeping it only when it is a string
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => Some(s),
        _ => None,
    })
}
