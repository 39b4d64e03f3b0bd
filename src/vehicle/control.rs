//! Per-frame kart control: throttle, steering, drift and terminal states

use glam::Vec3;

use super::input::InputState;
use super::tuning::VehicleTuning;

/// Why a vehicle stopped being simulated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalReason {
    /// Pitch or roll went past the critical angle
    Flipped,
    /// Dropped below the game-over height
    FellOff,
}

/// Client-local motion state carried from one frame to the next
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleKinematics {
    /// Speed along the heading; negative while reversing
    pub signed_speed: f32,
    /// Yaw in radians; 0 faces +Z
    pub heading: f32,
    pub grounded: bool,
    pub airborne: bool,
    pub drifting: bool,
    /// Armed on touchdown, spent by a jump
    pub can_jump: bool,
    /// Number of surfaces currently touching the body
    pub contacts: u32,
    /// Seconds since the body last touched anything
    pub airtime: f32,
    /// Set once; a terminal vehicle is never simulated again
    pub terminal: Option<TerminalReason>,
}

impl VehicleKinematics {
    pub fn spawn(heading: f32) -> Self {
        Self {
            signed_speed: 0.0,
            heading,
            grounded: false,
            airborne: false,
            drifting: false,
            can_jump: false,
            contacts: 0,
            airtime: 0.0,
            terminal: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal.is_some()
    }
}

impl Default for VehicleKinematics {
    fn default() -> Self {
        Self::spawn(0.0)
    }
}

/// Body orientation away from upright, in radians
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Tilt {
    pub pitch: f32,
    pub roll: f32,
}

/// Everything the model reads in one frame
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameInput {
    pub controls: InputState,
    /// Current rigid-body velocity
    pub velocity: Vec3,
    pub tilt: Tilt,
    /// Current rigid-body position
    pub position: Vec3,
    /// Seconds since the previous frame
    pub dt: f32,
}

/// What the caller writes back into the physics body and HUD
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameOutput {
    /// Horizontal motion plus drift blend and climb assist
    pub movement: Vec3,
    /// Velocity to write back: movement on X/Z, vertical left to gravity
    pub velocity: Vec3,
    pub heading: f32,
    pub signed_speed: f32,
    pub drifting: bool,
    pub airborne: bool,
    pub upside_down: bool,
    pub terminal: Option<TerminalReason>,
    /// One-shot impulse to apply this frame (jump)
    pub impulse: Option<Vec3>,
}

/// Unit vector the kart points along for a given heading
pub fn forward_vector(heading: f32) -> Vec3 {
    Vec3::new(heading.sin(), 0.0, heading.cos())
}

/// Fold an angle in degrees into [-180, 180]
pub fn fold_degrees(angle: f32) -> f32 {
    let angle = angle % 360.0;
    if angle > 180.0 {
        angle - 360.0
    } else if angle < -180.0 {
        angle + 360.0
    } else {
        angle
    }
}

/// True when pitch or roll is past `critical_angle_deg`
pub fn is_upside_down(tilt: Tilt, critical_angle_deg: f32) -> bool {
    let pitch = fold_degrees(finite_or_zero(tilt.pitch).to_degrees());
    let roll = fold_degrees(finite_or_zero(tilt.roll).to_degrees());
    pitch.abs() > critical_angle_deg || roll.abs() > critical_angle_deg
}

/// Drift is on while steering above half of top speed (boundary excluded)
pub fn drift_active(turn: f32, signed_speed: f32, tuning: &VehicleTuning) -> bool {
    turn != 0.0 && signed_speed.abs() > tuning.drift_threshold()
}

fn finite_or_zero(value: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

fn finite_vec_or_zero(value: Vec3) -> Vec3 {
    if value.is_finite() {
        value
    } else {
        Vec3::ZERO
    }
}

/// Frame-stepped kart controller.
///
/// `step` is pure: the only state carried between frames is the
/// [`VehicleKinematics`] value the caller threads through.
#[derive(Debug, Clone, Copy, Default)]
pub struct VehicleControlModel {
    tuning: VehicleTuning,
}

impl VehicleControlModel {
    pub fn new(tuning: VehicleTuning) -> Self {
        Self { tuning }
    }

    pub fn tuning(&self) -> &VehicleTuning {
        &self.tuning
    }

    /// Advance one frame
    pub fn step(
        &self,
        state: &VehicleKinematics,
        frame: &FrameInput,
    ) -> (VehicleKinematics, FrameOutput) {
        let t = &self.tuning;
        let mut next = *state;
        let velocity = finite_vec_or_zero(frame.velocity);

        if let Some(reason) = state.terminal {
            return (next, Self::halted(&next, velocity, reason));
        }

        let position = finite_vec_or_zero(frame.position);
        if position.y < t.game_over_height {
            next.terminal = Some(TerminalReason::FellOff);
            return (next, Self::halted(&next, velocity, TerminalReason::FellOff));
        }

        if is_upside_down(frame.tilt, t.critical_angle_deg) {
            next.terminal = Some(TerminalReason::Flipped);
            return (next, Self::halted(&next, velocity, TerminalReason::Flipped));
        }

        let controls = frame.controls;
        let turn = controls.turn_factor();
        let heading = finite_or_zero(state.heading);
        let forward = forward_vector(heading);
        let mut speed = finite_or_zero(state.signed_speed)
            .clamp(-t.max_reverse_speed(), t.max_speed);
        let mut climb_assist = 0.0;

        if controls.forward {
            let turn_penalty = 1.0 - 0.3 * turn.abs();
            speed = (speed + t.acceleration * turn_penalty).min(t.max_speed);
            if state.grounded {
                climb_assist = 0.15;
            }
        } else if controls.reverse {
            if speed > 0.0 {
                // Brake before reversing
                speed = (speed - t.brake_force).max(0.0);
            } else {
                speed = (speed - t.acceleration).max(-t.max_reverse_speed());
                if state.grounded {
                    climb_assist = 0.10;
                }
            }
        } else {
            let decel = t.acceleration * 0.7;
            if speed > 0.0 {
                speed = (speed - decel).max(0.0);
            } else if speed < 0.0 {
                speed = (speed + decel).min(0.0);
            }
        }

        let drifting = drift_active(turn, speed, t);

        let mut movement = forward * speed;
        movement.y += climb_assist;
        if drifting {
            // The slide is flat, so the blend also damps the climb assist
            let right = forward.cross(Vec3::Y);
            let slide = right * (turn * speed.abs() * 0.08 * t.drift_factor);
            movement = movement.lerp(slide, (1.0 - t.traction_control) * 0.5);
        }

        let mut new_heading = heading;
        if turn != 0.0 {
            let speed_frac = (speed.abs() / t.max_speed).min(1.0);
            let rate = t.steering_sensitivity * (0.7 + 0.3 * speed_frac);
            if speed > 0.0 {
                new_heading -= turn * rate;
            } else if speed < 0.0 {
                // Reverse steering is mirrored
                new_heading += turn * rate;
            } else {
                new_heading -= turn * rate * 0.4;
            }
        }

        let mut impulse = None;
        if controls.jump && state.can_jump {
            impulse = Some(Vec3::new(0.0, t.jump_force, 0.0));
            next.can_jump = false;
        }

        next.signed_speed = speed;
        next.heading = new_heading;
        next.drifting = drifting;
        next.airtime = if state.grounded {
            0.0
        } else {
            state.airtime + finite_or_zero(frame.dt).max(0.0)
        };

        let output = FrameOutput {
            movement,
            velocity: Vec3::new(movement.x, velocity.y, movement.z),
            heading: new_heading,
            signed_speed: speed,
            drifting,
            airborne: next.airborne,
            upside_down: false,
            terminal: None,
            impulse,
        };

        (next, output)
    }

    /// Output for a vehicle that is no longer simulated
    fn halted(state: &VehicleKinematics, velocity: Vec3, reason: TerminalReason) -> FrameOutput {
        FrameOutput {
            movement: Vec3::ZERO,
            velocity,
            heading: state.heading,
            signed_speed: state.signed_speed,
            drifting: false,
            airborne: state.airborne,
            upside_down: reason == TerminalReason::Flipped,
            terminal: Some(reason),
            impulse: None,
        }
    }
}
