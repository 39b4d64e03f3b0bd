//! Authoritative table of connected players

use dashmap::DashMap;
use std::collections::HashMap;

use crate::ws::protocol::{ConnectionId, PlayerState};

/// Longest display name kept after sanitizing
pub const MAX_NAME_LENGTH: usize = 15;

/// Bound applied to every coordinate a client reports
pub const MAX_COORD: f64 = 1000.0;

/// Where a freshly joined player is placed
pub const SPAWN_POSITION: [f64; 3] = [0.0, 2.0, 0.0];

/// Cosmetic tags chosen by the player at join time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Livery {
    pub color: String,
    pub car: String,
}

impl Livery {
    /// Build from optional wire fields, filling defaults for anything absent
    pub fn from_parts(color: Option<String>, car: Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            color: color.unwrap_or(defaults.color),
            car: car.unwrap_or(defaults.car),
        }
    }
}

impl Default for Livery {
    fn default() -> Self {
        Self {
            color: "red".to_string(),
            car: "default".to_string(),
        }
    }
}

/// Registry of connected players, keyed by connection id.
///
/// Each entry is only written by the connection that owns it; the map
/// itself handles concurrent access from the broadcast path.
pub struct SessionRegistry {
    players: DashMap<ConnectionId, PlayerState>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            players: DashMap::new(),
        }
    }

    /// Register a player, sanitizing the requested name
    pub fn add_player(
        &self,
        id: &ConnectionId,
        raw_name: Option<&str>,
        livery: Livery,
    ) -> PlayerState {
        let player = PlayerState {
            id: id.clone(),
            name: sanitize_name(id, raw_name),
            position: SPAWN_POSITION,
            color: livery.color,
            car: livery.car,
        };

        self.players.insert(id.clone(), player.clone());
        player
    }

    /// Apply a reported position.
    ///
    /// Returns `None` for unknown ids and payloads that are not exactly three
    /// elements. Axes that are not finite numbers keep their previous value;
    /// the rest are clamped to `[-MAX_COORD, MAX_COORD]`.
    pub fn update_position(&self, id: &ConnectionId, raw: &[Option<f64>]) -> Option<PlayerState> {
        if raw.len() != 3 {
            return None;
        }

        let mut entry = self.players.get_mut(id)?;
        let previous = entry.position;

        let mut position = previous;
        for (axis, coord) in raw.iter().enumerate() {
            position[axis] = match coord {
                Some(value) if value.is_finite() => value.clamp(-MAX_COORD, MAX_COORD),
                _ => previous[axis],
            };
        }

        entry.position = position;
        Some(entry.clone())
    }

    /// Remove a player. Removing an absent id is a no-op.
    pub fn remove_player(&self, id: &ConnectionId) -> Option<PlayerState> {
        self.players.remove(id).map(|(_, player)| player)
    }

    /// Snapshot copy of every registered player
    pub fn all_players(&self) -> HashMap<ConnectionId, PlayerState> {
        self.players
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    pub fn get(&self, id: &ConnectionId) -> Option<PlayerState> {
        self.players.get(id).map(|p| p.value().clone())
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Trim, strip control characters and cap the length of a requested name.
/// Falls back to `Player_` plus the first five characters of the id.
pub fn sanitize_name(id: &ConnectionId, raw_name: Option<&str>) -> String {
    let name: String = raw_name
        .unwrap_or_default()
        .trim()
        .chars()
        .filter(|c| !c.is_control())
        .take(MAX_NAME_LENGTH)
        .collect();

    if name.is_empty() {
        let prefix: String = id.as_str().chars().take(5).collect();
        format!("Player_{}", prefix)
    } else {
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_with(id: &str) -> (SessionRegistry, ConnectionId) {
        let registry = SessionRegistry::new();
        let id = ConnectionId::from(id);
        registry.add_player(&id, Some("Alice"), Livery::default());
        (registry, id)
    }

    #[test]
    fn add_player_uses_spawn_position() {
        let (registry, id) = registry_with("conn-a");
        let player = registry.get(&id).unwrap();
        assert_eq!(player.name, "Alice");
        assert_eq!(player.position, [0.0, 2.0, 0.0]);
        assert_eq!(player.color, "red");
    }

    #[test]
    fn empty_name_falls_back_to_id_prefix() {
        let registry = SessionRegistry::new();
        let id = ConnectionId::from("Xy7Qp-rest-of-id");
        let player = registry.add_player(&id, Some(""), Livery::default());
        assert_eq!(player.name, "Player_Xy7Qp");
    }

    #[test]
    fn missing_or_blank_name_falls_back() {
        let id = ConnectionId::from("abcdefgh");
        assert_eq!(sanitize_name(&id, None), "Player_abcde");
        assert_eq!(sanitize_name(&id, Some("   \t ")), "Player_abcde");
    }

    #[test]
    fn long_name_is_truncated_to_fifteen_chars() {
        let registry = SessionRegistry::new();
        let id = ConnectionId::from("conn");
        let player =
            registry.add_player(&id, Some("A very long name exceeding limit"), Livery::default());
        assert_eq!(player.name.chars().count(), 15);
        assert_eq!(player.name, "A very long nam");
    }

    #[test]
    fn name_is_trimmed_and_control_chars_dropped() {
        let id = ConnectionId::from("conn");
        assert_eq!(sanitize_name(&id, Some("  Bo\u{7}b  ")), "Bob");
    }

    #[test]
    fn out_of_range_axes_are_clamped() {
        let (registry, id) = registry_with("a");
        let player = registry
            .update_position(&id, &[Some(5.0), Some(1.0), Some(2000.0)])
            .unwrap();
        assert_eq!(player.position, [5.0, 1.0, 1000.0]);

        let player = registry
            .update_position(&id, &[Some(-1500.0), Some(999.0), Some(-1000.0)])
            .unwrap();
        assert_eq!(player.position, [-1000.0, 999.0, -1000.0]);
    }

    #[test]
    fn invalid_axes_keep_previous_value() {
        let (registry, id) = registry_with("a");
        registry.update_position(&id, &[Some(3.0), Some(4.0), Some(5.0)]);

        let player = registry
            .update_position(&id, &[None, Some(f64::NAN), Some(f64::INFINITY)])
            .unwrap();
        assert_eq!(player.position, [3.0, 4.0, 5.0]);
    }

    #[test]
    fn unknown_id_is_a_no_op() {
        let (registry, _) = registry_with("a");
        let before = registry.all_players();

        let result =
            registry.update_position(&ConnectionId::from("ghost"), &[Some(1.0), Some(1.0), Some(1.0)]);

        assert!(result.is_none());
        assert_eq!(registry.all_players(), before);
    }

    #[test]
    fn wrong_arity_is_rejected() {
        let (registry, id) = registry_with("a");
        assert!(registry.update_position(&id, &[Some(1.0), Some(2.0)]).is_none());
        assert!(registry
            .update_position(&id, &[Some(1.0), Some(2.0), Some(3.0), Some(4.0)])
            .is_none());
        assert_eq!(registry.get(&id).unwrap().position, SPAWN_POSITION);
    }

    #[test]
    fn remove_is_idempotent() {
        let (registry, id) = registry_with("a");
        assert!(registry.remove_player(&id).is_some());
        assert!(registry.remove_player(&id).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn snapshot_is_detached_from_registry() {
        let (registry, id) = registry_with("a");
        let mut snapshot = registry.all_players();
        snapshot.get_mut(&id).unwrap().name = "Mallory".to_string();
        assert_eq!(registry.get(&id).unwrap().name, "Alice");
    }

    #[test]
    fn re_adding_same_id_keeps_single_entry() {
        let (registry, id) = registry_with("a");
        registry.add_player(&id, Some("Again"), Livery::default());
        assert_eq!(registry.len(), 1);
    }
}
