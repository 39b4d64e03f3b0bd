/// Gameplay tuning for player-controlled karts.
///
/// Values are per simulated frame unless noted; the control model is
/// frame-stepped rather than time-integrated.
#[derive(Debug, Clone, Copy)]
pub struct VehicleTuning {
    /// Speed gained per frame with forward held
    pub acceleration: f32,
    /// Top forward speed; reverse is capped at half of it
    pub max_speed: f32,
    /// Speed shed per frame when braking from forward motion
    pub brake_force: f32,
    /// Scale of the lateral slide while drifting
    pub drift_factor: f32,
    /// Heading change per frame at full lock (radians)
    pub steering_sensitivity: f32,
    /// 1.0 = no slide blended in, 0.0 = maximum slide
    pub traction_control: f32,
    /// Vertical impulse at full speed over a ramp
    pub ramp_boost: f32,
    /// Ramps below this speed give no boost
    pub min_speed_for_ramp: f32,
    /// Pitch or roll beyond this (degrees) ends the round
    pub critical_angle_deg: f32,
    /// Jump impulse, also the base of the obstacle assist cap
    pub jump_force: f32,
    /// Fraction of `jump_force` the obstacle assist may use
    pub obstacle_assist: f32,
    /// Contacts lower than this count as a climbable curb
    pub max_obstacle_height: f32,
    /// Falling below this height ends the round
    pub game_over_height: f32,
}

impl VehicleTuning {
    /// Most negative signed speed allowed
    pub fn max_reverse_speed(&self) -> f32 {
        self.max_speed * 0.5
    }

    /// Speed above which steering starts a drift
    pub fn drift_threshold(&self) -> f32 {
        self.max_speed * 0.5
    }
}

impl Default for VehicleTuning {
    fn default() -> Self {
        Self {
            acceleration: 0.15,
            max_speed: 12.0,
            brake_force: 0.5,
            drift_factor: 0.5,
            steering_sensitivity: 0.035,
            traction_control: 0.92,
            ramp_boost: 10.0,
            min_speed_for_ramp: 5.0,
            critical_angle_deg: 130.0,
            jump_force: 7.0,
            obstacle_assist: 0.6,
            max_obstacle_height: 0.1,
            game_over_height: -10.0,
        }
    }
}
