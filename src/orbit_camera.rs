use crate::transform::Transform;

/// Default pointer-drag sensitivity in degrees per pixel.
pub const DEFAULT_DRAG_SENSITIVITY: f32 = 0.45;

/// Default symmetric pitch limit in degrees.
pub const DEFAULT_PITCH_LIMIT: f32 = 80.0;

/// The global orbit of the character, accumulated from pointer drags.
///
/// Yaw turns the whole character about +Y, pitch tilts it about +X. Both are
/// in degrees. Pitch is clamped to `[-pitch_limit, pitch_limit]`; yaw is
/// unbounded.
///
/// # Example
/// ```
/// use blocky::CameraState;
///
/// let mut orbit = CameraState::new();
/// orbit.drag(100.0, 1000.0);
/// assert!((orbit.yaw - 45.0).abs() < 1e-4);
/// assert_eq!(orbit.pitch, 80.0);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraState {
    /// Rotation about the vertical axis, in degrees.
    pub yaw: f32,
    /// Tilt about the horizontal axis, in degrees.
    pub pitch: f32,
    /// Degrees of rotation per pixel of drag.
    pub sensitivity: f32,
    /// Maximum absolute pitch, in degrees.
    pub pitch_limit: f32,
}

impl Default for CameraState {
    fn default() -> Self {
        Self {
            yaw: 0.0,
            pitch: 0.0,
            sensitivity: DEFAULT_DRAG_SENSITIVITY,
            pitch_limit: DEFAULT_PITCH_LIMIT,
        }
    }
}

impl CameraState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the drag sensitivity in degrees per pixel.
    pub fn sensitivity(mut self, sensitivity: f32) -> Self {
        self.sensitivity = sensitivity;
        self
    }

    /// Set the symmetric pitch limit in degrees.
    pub fn pitch_limit(mut self, limit: f32) -> Self {
        self.pitch_limit = limit.abs();
        self.pitch = self.pitch.clamp(-self.pitch_limit, self.pitch_limit);
        self
    }

    /// Applies a pointer drag of `(dx, dy)` pixels.
    pub fn drag(&mut self, dx: f32, dy: f32) {
        self.yaw += dx * self.sensitivity;
        self.pitch =
            (self.pitch + dy * self.sensitivity).clamp(-self.pitch_limit, self.pitch_limit);
    }

    /// Turns the character by `degrees` about the vertical axis.
    pub fn turn(&mut self, degrees: f32) {
        self.yaw += degrees;
    }

    /// The global rotation: yaw about +Y, then pitch about +X.
    pub fn global_rotation(&self) -> Transform {
        let mut rotation = Transform::new();
        rotation
            .rotate(self.yaw, 0.0, 1.0, 0.0)
            .rotate(self.pitch, 1.0, 0.0, 0.0);
        rotation
    }
}
