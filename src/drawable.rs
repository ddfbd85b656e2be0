//! Draw submissions produced by the scene builder.

use glam::Mat4;

use crate::color::Color;
use crate::mesh::Primitive;
use crate::transform::Transform;

/// A single mesh instance ready for one draw call.
///
/// The transform is the model matrix in character space; the global orbit
/// rotation is applied separately by the renderer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Drawable {
    /// Name of the body part, for diagnostics.
    pub label: &'static str,
    /// Which shared primitive to draw.
    pub mesh: Primitive,
    /// Model transform.
    pub transform: Transform,
    /// Flat RGBA color.
    pub color: Color,
}

impl Drawable {
    pub fn new(label: &'static str, mesh: Primitive, transform: Transform, color: Color) -> Self {
        Self {
            label,
            mesh,
            transform,
            color,
        }
    }

    /// The full world matrix under a global rotation (`global ∘ model`).
    pub fn world_matrix(&self, global: &Transform) -> Mat4 {
        let mut world = *global;
        world.compose(&self.transform);
        world.matrix()
    }
}

/// The ordered draw submissions for one frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DrawList {
    drawables: Vec<Drawable>,
}

impl DrawList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.drawables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drawables.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Drawable> {
        self.drawables.iter()
    }

    /// Looks up the first drawable with the given label.
    pub fn find(&self, label: &str) -> Option<&Drawable> {
        self.drawables.iter().find(|d| d.label == label)
    }

    /// Number of drawables using `mesh`.
    pub fn count(&self, mesh: Primitive) -> usize {
        self.drawables.iter().filter(|d| d.mesh == mesh).count()
    }
}

impl<'a> IntoIterator for &'a DrawList {
    type Item = &'a Drawable;
    type IntoIter = std::slice::Iter<'a, Drawable>;

    fn into_iter(self) -> Self::IntoIter {
        self.drawables.iter()
    }
}

impl Extend<Drawable> for DrawList {
    fn extend<I: IntoIterator<Item = Drawable>>(&mut self, iter: I) {
        self.drawables.extend(iter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn world_matrix_applies_the_model_before_the_orbit() {
        let mut model = Transform::new();
        model.translate(1.0, 0.0, 0.0).scale(2.0, 2.0, 2.0);
        let drawable = Drawable::new("part", Primitive::Box, model, Color::WHITE);

        let mut orbit = Transform::new();
        orbit.rotate(90.0, 0.0, 1.0, 0.0);

        let world = drawable.world_matrix(&orbit);
        assert!(world.abs_diff_eq(orbit.matrix() * model.matrix(), 1e-6));
        // (1,0,0) scales to (2,0,0), shifts to (3,0,0), then yaws onto -Z
        let p = world.transform_point3(Vec3::X);
        assert!((p - Vec3::new(0.0, 0.0, -3.0)).length() < 1e-5, "{p}");
    }

    #[test]
    fn empty_list_reports_empty() {
        let mut list = DrawList::new();
        assert!(list.is_empty());
        list.extend([Drawable::new(
            "part",
            Primitive::Sphere,
            Transform::new(),
            Color::WHITE,
        )]);
        assert!(!list.is_empty());
        assert_eq!(list.len(), 1);
        assert_eq!(list.count(Primitive::Sphere), 1);
    }
}
