//! Per-frame data handed to the renderer and UI overlay

use glam::Vec3;

use super::control::FrameOutput;

/// Snapshot of the local kart for the HUD callback
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HudFrame {
    /// Absolute speed, rounded to one decimal
    pub speed: f32,
    pub drifting: bool,
    pub airborne: bool,
    pub upside_down: bool,
    pub position: Vec3,
    pub heading: f32,
}

impl HudFrame {
    pub fn from_output(output: &FrameOutput, position: Vec3) -> Self {
        Self {
            speed: (output.signed_speed.abs() * 10.0).round() / 10.0,
            drifting: output.drifting,
            airborne: output.airborne,
            upside_down: output.upside_down,
            position,
            heading: output.heading,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vehicle::control::{FrameInput, VehicleControlModel, VehicleKinematics};
    use crate::vehicle::input::InputState;

    #[test]
    fn hud_speed_is_rounded_magnitude() {
        let state = VehicleKinematics {
            signed_speed: -3.0,
            ..VehicleKinematics::default()
        };
        let frame = FrameInput {
            controls: InputState::default(),
            position: Vec3::new(1.0, 2.0, 3.0),
            ..Default::default()
        };
        let (_, output) = VehicleControlModel::default().step(&state, &frame);
        let hud = HudFrame::from_output(&output, frame.position);

        // -3.0 coasts to -2.895
        assert_eq!(hud.speed, 2.9);
        assert_eq!(hud.position, Vec3::new(1.0, 2.0, 3.0));
        assert!(!hud.upside_down);
    }
}
