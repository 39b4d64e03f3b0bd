//! Driver controls sampled once per frame

/// A logical control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Control {
    Forward,
    Reverse,
    Left,
    Right,
    Jump,
}

impl Control {
    /// Map a keyboard key name onto a control (case-insensitive)
    pub fn from_key(key: &str) -> Option<Self> {
        match key.to_ascii_lowercase().as_str() {
            "w" => Some(Self::Forward),
            "s" => Some(Self::Reverse),
            "a" => Some(Self::Left),
            "d" => Some(Self::Right),
            " " | "space" => Some(Self::Jump),
            _ => None,
        }
    }
}

/// Pressed/released state of every control. Anything never pressed reads
/// as released.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputState {
    pub forward: bool,
    pub reverse: bool,
    pub left: bool,
    pub right: bool,
    pub jump: bool,
}

impl InputState {
    pub fn set(&mut self, control: Control, pressed: bool) {
        match control {
            Control::Forward => self.forward = pressed,
            Control::Reverse => self.reverse = pressed,
            Control::Left => self.left = pressed,
            Control::Right => self.right = pressed,
            Control::Jump => self.jump = pressed,
        }
    }

    pub fn is_pressed(&self, control: Control) -> bool {
        match control {
            Control::Forward => self.forward,
            Control::Reverse => self.reverse,
            Control::Left => self.left,
            Control::Right => self.right,
            Control::Jump => self.jump,
        }
    }

    /// Apply a raw key event; unknown keys are ignored
    pub fn key_event(&mut self, key: &str, pressed: bool) {
        if let Some(control) = Control::from_key(key) {
            self.set(control, pressed);
        }
    }

    /// -1 for left, +1 for right, 0 for neither. Right wins when both are held.
    pub fn turn_factor(&self) -> f32 {
        if self.right {
            1.0
        } else if self.left {
            -1.0
        } else {
            0.0
        }
    }
}
