//! Composable 4×4 affine transforms for the attach-point hierarchy.
//!
//! A [`Transform`] is a plain value wrapping a [`Mat4`]. Every operation
//! post-multiplies an elementary matrix, so operations take effect in the
//! child's local space in the order they are issued:
//!
//! ```
//! use blocky::Transform;
//!
//! let mut shoulder = Transform::new();
//! shoulder.translate(0.46, 0.06, 0.12).rotate(20.0, 0.0, 0.0, 1.0);
//!
//! // Children start from a copy of their parent; the parent is untouched.
//! let mut sleeve = shoulder;
//! sleeve.scale(0.10, 0.22, 0.10);
//! assert_ne!(sleeve.matrix(), shoulder.matrix());
//! ```

use glam::{Mat4, Vec3};

/// A position/orientation/scale in some parent's local space.
///
/// `Transform` is `Copy`: duplicating it is the "copy constructor" used to
/// start a child part from its parent's attach point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    matrix: Mat4,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            matrix: Mat4::IDENTITY,
        }
    }
}

impl Transform {
    /// The identity transform.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new, independent transform from a parent's current matrix.
    pub fn from_parent(parent: &Transform) -> Self {
        *parent
    }

    /// Post-multiplies a translation.
    pub fn translate(&mut self, x: f32, y: f32, z: f32) -> &mut Self {
        self.matrix *= Mat4::from_translation(Vec3::new(x, y, z));
        self
    }

    /// Post-multiplies a (possibly non-uniform) scale.
    pub fn scale(&mut self, x: f32, y: f32, z: f32) -> &mut Self {
        self.matrix *= Mat4::from_scale(Vec3::new(x, y, z));
        self
    }

    /// Post-multiplies a rotation of `degrees` about the axis `(x, y, z)`.
    ///
    /// The axis does not need to be normalized. A zero axis leaves the
    /// transform unchanged.
    pub fn rotate(&mut self, degrees: f32, x: f32, y: f32, z: f32) -> &mut Self {
        let axis = Vec3::new(x, y, z).normalize_or_zero();
        if axis != Vec3::ZERO {
            self.matrix *= Mat4::from_axis_angle(axis, degrees.to_radians());
        }
        self
    }

    /// Post-multiplies another transform (`self = self ∘ local`).
    pub fn compose(&mut self, local: &Transform) -> &mut Self {
        self.matrix *= local.matrix;
        self
    }

    /// The composed matrix.
    pub fn matrix(&self) -> Mat4 {
        self.matrix
    }

    /// Applies the transform to a point.
    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.matrix.transform_point3(point)
    }
}
