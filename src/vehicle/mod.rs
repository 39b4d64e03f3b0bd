//! Client-side kart simulation: controls, contact reactions and HUD output

pub mod collision;
pub mod control;
pub mod hud;
pub mod input;
pub mod tuning;

pub use collision::{CollisionEvent, CollisionOutcome, ObstacleAndRampInteraction, VelocityController};
pub use control::{
    FrameInput, FrameOutput, TerminalReason, Tilt, VehicleControlModel, VehicleKinematics,
};
pub use hud::HudFrame;
pub use input::{Control, InputState};
pub use tuning::VehicleTuning;
