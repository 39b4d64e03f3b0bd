//! Contact handling: ramp boosts, curb climbing and ground contact

use glam::Vec3;
use tracing::debug;

use super::control::{forward_vector, VehicleKinematics};
use super::tuning::VehicleTuning;

/// Engine-agnostic description of a contact that just started
#[derive(Debug, Clone, PartialEq)]
pub struct CollisionEvent {
    /// Name or tag of the other collider
    pub target_tag: String,
    /// Contact normal, pointing from the other collider towards the kart
    pub normal: Option<Vec3>,
    /// World-space contact point
    pub contact_point: Option<Vec3>,
}

impl CollisionEvent {
    pub fn new(target_tag: impl Into<String>) -> Self {
        Self {
            target_tag: target_tag.into(),
            normal: None,
            contact_point: None,
        }
    }

    pub fn with_normal(mut self, normal: Vec3) -> Self {
        self.normal = Some(normal);
        self
    }

    pub fn with_contact_point(mut self, point: Vec3) -> Self {
        self.contact_point = Some(point);
        self
    }

    pub fn is_ramp(&self) -> bool {
        self.target_tag.to_ascii_lowercase().contains("ramp")
    }
}

/// The slice of a rigid body the interaction needs
pub trait VelocityController {
    fn apply_impulse(&mut self, impulse: Vec3);
}

/// Impulses applied by a single contact
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CollisionOutcome {
    pub ramp_boost: Option<Vec3>,
    pub obstacle_assist: Option<Vec3>,
}

/// Reacts to contacts with ramps and low obstacles
#[derive(Debug, Clone, Copy, Default)]
pub struct ObstacleAndRampInteraction {
    tuning: VehicleTuning,
}

impl ObstacleAndRampInteraction {
    pub fn new(tuning: VehicleTuning) -> Self {
        Self { tuning }
    }

    /// A contact started
    pub fn on_collision_enter<B: VelocityController>(
        &self,
        state: &mut VehicleKinematics,
        event: &CollisionEvent,
        body: &mut B,
    ) -> CollisionOutcome {
        state.contacts = state.contacts.saturating_add(1);
        state.grounded = true;
        state.can_jump = true;
        state.airborne = false;
        state.airtime = 0.0;

        if state.is_terminal() {
            return CollisionOutcome::default();
        }

        let outcome = CollisionOutcome {
            ramp_boost: self.ramp_boost(state, event),
            obstacle_assist: self.obstacle_assist(state, event),
        };

        if let Some(impulse) = outcome.ramp_boost {
            body.apply_impulse(impulse);
            state.airborne = true;
            debug!(impulse = impulse.y, "Ramp boost applied");
        }
        if let Some(impulse) = outcome.obstacle_assist {
            body.apply_impulse(impulse);
            debug!(impulse = impulse.y, "Obstacle assist applied");
        }

        outcome
    }

    /// A contact ended; the kart is off the ground once nothing touches it
    pub fn on_collision_exit(&self, state: &mut VehicleKinematics) {
        state.contacts = state.contacts.saturating_sub(1);
        if state.contacts == 0 {
            state.grounded = false;
            state.can_jump = false;
        }
    }

    fn ramp_boost(&self, state: &VehicleKinematics, event: &CollisionEvent) -> Option<Vec3> {
        let t = &self.tuning;
        let speed = state.signed_speed.abs();

        if !event.is_ramp() || speed <= t.min_speed_for_ramp {
            return None;
        }

        Some(Vec3::new(0.0, t.ramp_boost * (speed / t.max_speed), 0.0))
    }

    fn obstacle_assist(&self, state: &VehicleKinematics, event: &CollisionEvent) -> Option<Vec3> {
        let t = &self.tuning;
        let speed = state.signed_speed.abs();
        let normal = event.normal.filter(|n| n.is_finite())?;
        let contact = event.contact_point.filter(|p| p.is_finite())?;

        // Only the horizontal part of the normal tells us about a head-on hit
        let horizontal = Vec3::new(normal.x, 0.0, normal.z).try_normalize()?;
        let forward = forward_vector(state.heading);

        if forward.dot(horizontal) >= -0.5 || speed <= 0.5 {
            return None;
        }
        if contact.y >= t.max_obstacle_height {
            return None;
        }

        let strength = (t.acceleration * 12.0 * (speed / t.max_speed))
            .min(t.jump_force * t.obstacle_assist);

        Some(Vec3::new(
            forward.x * strength * 0.6,
            strength,
            forward.z * strength * 0.6,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vehicle::control::TerminalReason;

    const EPS: f32 = 1e-5;

    #[derive(Default)]
    struct RecordingBody {
        impulses: Vec<Vec3>,
    }

    impl VelocityController for RecordingBody {
        fn apply_impulse(&mut self, impulse: Vec3) {
            self.impulses.push(impulse);
        }
    }

    fn at_speed(speed: f32) -> VehicleKinematics {
        VehicleKinematics {
            signed_speed: speed,
            ..VehicleKinematics::default()
        }
    }

    #[test]
    fn fast_ramp_contact_launches() {
        let interaction = ObstacleAndRampInteraction::default();
        let mut state = at_speed(10.0);
        let mut body = RecordingBody::default();

        let outcome =
            interaction.on_collision_enter(&mut state, &CollisionEvent::new("ramp-north"), &mut body);

        let boost = outcome.ramp_boost.unwrap();
        assert!((boost.y - 10.0 * 10.0 / 12.0).abs() < EPS);
        assert_eq!(body.impulses, vec![boost]);
        assert!(state.airborne);
        assert!(state.grounded);
    }

    #[test]
    fn slow_ramp_contact_does_nothing() {
        let interaction = ObstacleAndRampInteraction::default();
        let mut state = at_speed(5.0);
        let mut body = RecordingBody::default();

        interaction.on_collision_enter(&mut state, &CollisionEvent::new("Ramp"), &mut body);

        assert!(body.impulses.is_empty());
        assert!(!state.airborne);
    }

    #[test]
    fn landing_clears_airborne() {
        let interaction = ObstacleAndRampInteraction::default();
        let mut state = VehicleKinematics {
            airborne: true,
            ..VehicleKinematics::default()
        };
        let mut body = RecordingBody::default();

        interaction.on_collision_enter(&mut state, &CollisionEvent::new("ground"), &mut body);

        assert!(state.grounded);
        assert!(!state.airborne);
        assert!(state.can_jump);
    }

    #[test]
    fn head_on_curb_gets_climb_assist() {
        let interaction = ObstacleAndRampInteraction::default();
        let mut state = at_speed(6.0);
        let mut body = RecordingBody::default();
        // Heading 0 faces +Z, so a wall in front pushes back along -Z
        let event = CollisionEvent::new("curb")
            .with_normal(Vec3::new(0.0, 0.2, -1.0))
            .with_contact_point(Vec3::new(0.0, 0.05, 3.0));

        let outcome = interaction.on_collision_enter(&mut state, &event, &mut body);

        let assist = outcome.obstacle_assist.unwrap();
        let strength = 0.15 * 12.0 * 0.5;
        assert!((assist.y - strength).abs() < EPS);
        assert!((assist.z - strength * 0.6).abs() < EPS);
        assert!(assist.x.abs() < EPS);
        assert_eq!(body.impulses.len(), 1);
    }

    #[test]
    fn climb_assist_is_capped() {
        let tuning = VehicleTuning {
            acceleration: 5.0,
            ..VehicleTuning::default()
        };
        let interaction = ObstacleAndRampInteraction::new(tuning);
        let mut state = at_speed(12.0);
        let event = CollisionEvent::new("curb")
            .with_normal(Vec3::new(0.0, 0.0, -1.0))
            .with_contact_point(Vec3::new(0.0, 0.0, 1.0));

        let outcome = interaction.on_collision_enter(&mut state, &event, &mut RecordingBody::default());
        assert!((outcome.obstacle_assist.unwrap().y - 7.0 * 0.6).abs() < EPS);
    }

    #[test]
    fn glancing_high_or_slow_contacts_get_no_assist() {
        let interaction = ObstacleAndRampInteraction::default();
        let head_on = Vec3::new(0.0, 0.0, -1.0);
        let low = Vec3::new(0.0, 0.05, 1.0);

        let cases = [
            (at_speed(6.0), Some(Vec3::new(1.0, 0.0, 0.0)), Some(low)),
            (at_speed(6.0), Some(head_on), Some(Vec3::new(0.0, 0.5, 1.0))),
            (at_speed(0.4), Some(head_on), Some(low)),
            (at_speed(6.0), Some(Vec3::Y), Some(low)),
            (at_speed(6.0), None, Some(low)),
            (at_speed(6.0), Some(head_on), None),
        ];

        for (mut state, normal, point) in cases {
            let event = CollisionEvent {
                target_tag: "wall".to_string(),
                normal,
                contact_point: point,
            };
            let outcome =
                interaction.on_collision_enter(&mut state, &event, &mut RecordingBody::default());
            assert_eq!(outcome.obstacle_assist, None, "{:?}", event);
        }
    }

    #[test]
    fn grounded_until_last_contact_ends() {
        let interaction = ObstacleAndRampInteraction::default();
        let mut state = VehicleKinematics::default();
        let mut body = RecordingBody::default();

        interaction.on_collision_enter(&mut state, &CollisionEvent::new("ground"), &mut body);
        interaction.on_collision_enter(&mut state, &CollisionEvent::new("wall"), &mut body);

        interaction.on_collision_exit(&mut state);
        assert!(state.grounded);

        interaction.on_collision_exit(&mut state);
        assert!(!state.grounded);
        assert!(!state.can_jump);

        // Spurious extra exit never underflows
        interaction.on_collision_exit(&mut state);
        assert_eq!(state.contacts, 0);
    }

    #[test]
    fn terminal_vehicle_gets_no_impulses() {
        let interaction = ObstacleAndRampInteraction::default();
        let mut state = VehicleKinematics {
            terminal: Some(TerminalReason::Flipped),
            ..at_speed(11.0)
        };
        let mut body = RecordingBody::default();

        interaction.on_collision_enter(&mut state, &CollisionEvent::new("ramp"), &mut body);
        assert!(body.impulses.is_empty());
    }
}
