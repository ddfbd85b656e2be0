//! Per-frame scene graph for the koala.
//!
//! Every frame the builder rebuilds a small tree of [`AttachPoint`]s from the
//! published [`AnimationState`], the manual leg pose and the orbit. Each node
//! starts from a copy of its parent's transform, applies its own fixed offset
//! and any animation-driven rotation, and owns the [`Drawable`]s hanging off
//! it. Flattening the tree pre-order yields the draw submissions.
//!
//! ```text
//! body ─┬─ chest ─┬─ head ── snout, eyes, highlights, nose, ears
//!       │         ├─ arm_l
//!       │         └─ arm_r
//!       ├─ belly
//!       ├─ thigh_l ── calf_l ── foot_l
//!       └─ thigh_r ── calf_r ── foot_r
//! ```

use crate::animation::{AnimationState, Pose};
use crate::color::Color;
use crate::drawable::{DrawList, Drawable};
use crate::mesh::Primitive;
use crate::orbit_camera::CameraState;
use crate::transform::Transform;

/// Character palette.
pub mod palette {
    use crate::color::Color;

    pub const FUR: Color = Color::gray(0.68);
    pub const FUR2: Color = Color::gray(0.58);
    pub const BELLY: Color = Color::gray(0.88);
    pub const DARK: Color = Color::gray(0.12);
    pub const FOOT: Color = Color::gray(0.35);
    pub const SNOUT: Color = Color::gray(0.42);
    pub const PINK: Color = Color::rgb(0.90, 0.78, 0.82);
    pub const WHITE: Color = Color::WHITE;
}

/// Largest absolute manual joint angle, in degrees.
pub const MANUAL_JOINT_LIMIT: f32 = 90.0;

/// Fixed pose of the right leg, which never animates.
const RIGHT_HIP: f32 = -10.0;
const RIGHT_KNEE: f32 = 18.0;

/// Outward splay of both arms about Z.
const ARM_SPLAY: f32 = 20.0;

/// Share of the arm-swing channel applied to each arm.
const ARM_SWING_SCALE: f32 = 0.5;

/// The joints of the left leg that can be posed by hand.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LegJoint {
    Hip,
    Knee,
    Ankle,
}

/// Hand-set angles for the left leg, in degrees.
///
/// Used only while the animation controller is idle; any active mode
/// overrides them with its derived angles.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ManualPose {
    pub hip: f32,
    pub knee: f32,
    pub ankle: f32,
}

impl ManualPose {
    pub fn get(&self, joint: LegJoint) -> f32 {
        match joint {
            LegJoint::Hip => self.hip,
            LegJoint::Knee => self.knee,
            LegJoint::Ankle => self.ankle,
        }
    }

    /// Adds `delta` degrees to `joint`, clamped to [`MANUAL_JOINT_LIMIT`].
    pub fn nudge(&mut self, joint: LegJoint, delta: f32) {
        let angle = match joint {
            LegJoint::Hip => &mut self.hip,
            LegJoint::Knee => &mut self.knee,
            LegJoint::Ankle => &mut self.ankle,
        };
        *angle = (*angle + delta).clamp(-MANUAL_JOINT_LIMIT, MANUAL_JOINT_LIMIT);
    }
}

/// A named node of the character hierarchy.
#[derive(Clone, Debug, PartialEq)]
pub struct AttachPoint {
    pub name: &'static str,
    /// Attach transform in character space.
    pub transform: Transform,
    pub drawables: Vec<Drawable>,
    pub children: Vec<AttachPoint>,
}

impl AttachPoint {
    pub fn new(name: &'static str, transform: Transform) -> Self {
        Self {
            name,
            transform,
            drawables: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Draws `mesh` at this node's transform after a local `scale`.
    fn draw_scaled(
        &mut self,
        label: &'static str,
        mesh: Primitive,
        [sx, sy, sz]: [f32; 3],
        color: Color,
    ) {
        let mut t = self.transform;
        t.scale(sx, sy, sz);
        self.drawables.push(Drawable::new(label, mesh, t, color));
    }

    /// Draws `mesh` offset by `translate` and then scaled, relative to this node.
    fn draw_at(
        &mut self,
        label: &'static str,
        mesh: Primitive,
        [tx, ty, tz]: [f32; 3],
        [sx, sy, sz]: [f32; 3],
        color: Color,
    ) {
        let mut t = self.transform;
        t.translate(tx, ty, tz).scale(sx, sy, sz);
        self.drawables.push(Drawable::new(label, mesh, t, color));
    }

    /// Starts a child node from a copy of this node's transform.
    fn child(&self, name: &'static str) -> AttachPoint {
        AttachPoint::new(name, Transform::from_parent(&self.transform))
    }

    /// Depth-first search by node name.
    pub fn find(&self, name: &str) -> Option<&AttachPoint> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(name))
    }

    /// Number of nodes in this subtree, including itself.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(AttachPoint::node_count).sum::<usize>()
    }

    /// Appends this subtree's drawables in pre-order: own drawables, then
    /// each child in turn.
    pub fn flatten_into(&self, out: &mut DrawList) {
        out.extend(self.drawables.iter().copied());
        for child in &self.children {
            child.flatten_into(out);
        }
    }

    pub fn flatten(&self) -> DrawList {
        let mut out = DrawList::new();
        self.flatten_into(&mut out);
        out
    }
}

/// The pose the builder applies after gating on the mode.
///
/// While a mode is active the controller's pose drives every eligible joint;
/// while idle, only the manual leg angles apply and everything else rests.
pub fn joint_angles(anim: &AnimationState, manual: &ManualPose) -> Pose {
    if anim.is_active() {
        anim.pose
    } else {
        Pose {
            hip: manual.hip,
            knee: manual.knee,
            ankle: manual.ankle,
            ..Pose::REST
        }
    }
}

/// Builds the attach-point tree for one set of joint angles.
pub fn build_character(angles: &Pose) -> AttachPoint {
    let mut root = Transform::new();
    root.translate(-0.18, -0.62, -1.25)
        .scale(1.35, 1.35, 1.35)
        .rotate(angles.body_sway, 0.0, 0.0, 1.0);

    let mut body = AttachPoint::new("body", root);
    body.draw_scaled("body", Primitive::Box, [0.52, 0.40, 0.36], palette::FUR);

    let mut chest = body.child("chest");
    chest.transform.translate(0.02, 0.32, -0.02);
    chest.draw_scaled("chest", Primitive::Box, [0.46, 0.30, 0.34], palette::FUR2);

    let mut belly = body.child("belly");
    belly.transform.translate(0.10, 0.06, 0.22);
    belly.draw_scaled("belly", Primitive::Box, [0.32, 0.26, 0.08], palette::BELLY);

    let head = build_head(&chest, angles.head_bob);
    let arm_l = build_arm(&chest, Side::Left, angles.arm_swing);
    let arm_r = build_arm(&chest, Side::Right, angles.arm_swing);
    chest.children = vec![head, arm_l, arm_r];

    let leg_l = build_leg(
        &body,
        Side::Left,
        [0.12, -0.06, 0.10],
        [angles.hip, angles.knee, angles.ankle],
    );
    let leg_r = build_leg(
        &body,
        Side::Right,
        [0.32, -0.06, 0.08],
        [RIGHT_HIP, RIGHT_KNEE, 0.0],
    );

    body.children = vec![chest, belly, leg_l, leg_r];
    body
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

fn build_head(chest: &AttachPoint, head_bob: f32) -> AttachPoint {
    use Primitive::{Box, Pyramid, Sphere};

    let mut head = chest.child("head");
    head.transform
        .translate(0.0, 0.34, -0.06)
        .rotate(head_bob, 0.0, 0.0, 1.0);

    head.draw_at("head", Sphere, [0.22, 0.20, 0.10], [0.58, 0.50, 0.46], palette::FUR2);
    head.draw_at("snout", Sphere, [0.24, 0.13, 0.28], [0.24, 0.17, 0.18], palette::SNOUT);

    head.draw_at("eye_l", Box, [0.13, 0.24, 0.37], [0.06, 0.06, 0.04], palette::DARK);
    head.draw_at("eye_r", Box, [0.33, 0.24, 0.37], [0.06, 0.06, 0.04], palette::DARK);
    head.draw_at("highlight_l", Sphere, [0.148, 0.248, 0.40], [0.018; 3], palette::WHITE);
    head.draw_at("highlight_r", Sphere, [0.348, 0.248, 0.40], [0.018; 3], palette::WHITE);

    head.draw_at("nose", Pyramid, [0.22, 0.10, 0.36], [0.08, 0.12, 0.08], palette::DARK);

    for (x, outer, inner) in [(0.07, "ear_l", "ear_inner_l"), (0.37, "ear_r", "ear_inner_r")] {
        head.draw_at(outer, Sphere, [x, 0.43, 0.06], [0.24, 0.24, 0.20], palette::FUR2);
        head.draw_at(inner, Sphere, [x, 0.43, 0.09], [0.13, 0.13, 0.10], palette::PINK);
    }

    head
}

fn build_arm(chest: &AttachPoint, side: Side, arm_swing: f32) -> AttachPoint {
    let (name, x, sign) = match side {
        Side::Left => ("arm_l", -0.10, -1.0),
        Side::Right => ("arm_r", 0.46, 1.0),
    };

    let mut arm = chest.child(name);
    arm.transform
        .translate(x, 0.06, 0.12)
        .rotate(sign * ARM_SPLAY, 0.0, 0.0, 1.0)
        .rotate(sign * arm_swing * ARM_SWING_SCALE, 1.0, 0.0, 0.0);
    arm.draw_scaled(name, Primitive::Box, [0.10, 0.22, 0.10], palette::FUR);
    arm
}

/// A thigh → calf → foot chain, each joint rotating about X.
fn build_leg(
    body: &AttachPoint,
    side: Side,
    [hx, hy, hz]: [f32; 3],
    [hip, knee, ankle]: [f32; 3],
) -> AttachPoint {
    let (thigh_name, calf_name, foot_name) = match side {
        Side::Left => ("thigh_l", "calf_l", "foot_l"),
        Side::Right => ("thigh_r", "calf_r", "foot_r"),
    };

    let mut thigh = body.child(thigh_name);
    thigh.transform.translate(hx, hy, hz).rotate(hip, 1.0, 0.0, 0.0);
    thigh.draw_scaled(thigh_name, Primitive::Box, [0.10, 0.14, 0.10], palette::FUR);

    let mut calf = thigh.child(calf_name);
    calf.transform.translate(0.0, -0.14, 0.0).rotate(knee, 1.0, 0.0, 0.0);
    calf.draw_scaled(calf_name, Primitive::Box, [0.09, 0.13, 0.09], palette::FUR2);

    let mut foot = calf.child(foot_name);
    foot.transform.translate(-0.02, -0.12, 0.02).rotate(ankle, 1.0, 0.0, 0.0);
    foot.draw_scaled(foot_name, Primitive::Box, [0.14, 0.05, 0.12], palette::FOOT);

    calf.children.push(foot);
    thigh.children.push(calf);
    thigh
}

/// Everything the renderer needs for one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct SceneFrame {
    /// Orbit rotation applied on top of every drawable's model transform.
    pub global_rotation: Transform,
    pub drawables: DrawList,
}

/// Builds one frame from the camera orbit, the published animation state and
/// the manual leg pose.
pub fn build_scene(
    camera: &CameraState,
    anim: &AnimationState,
    manual: &ManualPose,
) -> SceneFrame {
    let angles = joint_angles(anim, manual);
    SceneFrame {
        global_rotation: camera.global_rotation(),
        drawables: build_character(&angles).flatten(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::{AnimationController, AnimationMode};
    use glam::Vec3;
    use pretty_assertions::assert_eq;

    fn active(pose: Pose) -> AnimationState {
        AnimationState {
            mode: AnimationMode::Cyclic { started_at: 0.0 },
            pose,
        }
    }

    fn origin_of(frame: &SceneFrame, label: &str) -> Vec3 {
        frame
            .drawables
            .find(label)
            .unwrap_or_else(|| panic!("missing drawable {label}"))
            .transform
            .transform_point(Vec3::ZERO)
    }

    #[test]
    fn idle_frame_has_every_part_once() {
        let frame = build_scene(
            &CameraState::default(),
            &AnimationState::IDLE,
            &ManualPose::default(),
        );
        let list = &frame.drawables;

        assert_eq!(list.len(), 22);
        assert_eq!(list.count(Primitive::Box), 13);
        assert_eq!(list.count(Primitive::Pyramid), 1);
        assert_eq!(list.count(Primitive::Sphere), 8);

        let mut labels: Vec<_> = list.iter().map(|d| d.label).collect();
        labels.sort_unstable();
        labels.dedup();
        assert_eq!(labels.len(), 22);
    }

    #[test]
    fn flatten_is_pre_order() {
        let frame = build_scene(
            &CameraState::default(),
            &AnimationState::IDLE,
            &ManualPose::default(),
        );
        let labels: Vec<_> = frame.drawables.iter().map(|d| d.label).collect();
        assert_eq!(&labels[..3], &["body", "chest", "head"]);
        assert_eq!(labels.last(), Some(&"foot_r"));

        let arm = labels.iter().position(|l| *l == "arm_r").unwrap();
        let belly = labels.iter().position(|l| *l == "belly").unwrap();
        let thigh = labels.iter().position(|l| *l == "thigh_l").unwrap();
        assert!(arm < belly && belly < thigh);
    }

    #[test]
    fn tree_mirrors_the_body_hierarchy() {
        let root = build_character(&Pose::REST);
        assert_eq!(root.name, "body");
        assert_eq!(root.node_count(), 12);

        let names: Vec<_> = root.children.iter().map(|c| c.name).collect();
        assert_eq!(names, ["chest", "belly", "thigh_l", "thigh_r"]);

        let chest = root.find("chest").unwrap();
        let names: Vec<_> = chest.children.iter().map(|c| c.name).collect();
        assert_eq!(names, ["head", "arm_l", "arm_r"]);

        assert_eq!(root.find("head").unwrap().drawables.len(), 11);
        assert!(root.find("foot_l").unwrap().children.is_empty());
        assert!(root.find("tail").is_none());
    }

    #[test]
    fn idle_ignores_stray_pose_values() {
        let stray = AnimationState {
            mode: AnimationMode::Idle,
            pose: Pose {
                head_bob: 30.0,
                body_sway: 30.0,
                ..Pose::REST
            },
        };
        let manual = ManualPose::default();
        let camera = CameraState::default();
        assert_eq!(
            build_scene(&camera, &stray, &manual),
            build_scene(&camera, &AnimationState::IDLE, &manual)
        );
    }

    #[test]
    fn joint_angles_gate_on_the_mode() {
        let manual = ManualPose {
            hip: 40.0,
            knee: -20.0,
            ankle: 5.0,
        };
        let pose = Pose {
            hip: 1.0,
            knee: 2.0,
            ankle: 3.0,
            head_bob: 4.0,
            arm_swing: 5.0,
            body_sway: 6.0,
        };

        assert_eq!(joint_angles(&active(pose), &manual), pose);

        let idle = AnimationState {
            mode: AnimationMode::Idle,
            pose,
        };
        assert_eq!(
            joint_angles(&idle, &manual),
            Pose {
                hip: 40.0,
                knee: -20.0,
                ankle: 5.0,
                ..Pose::REST
            }
        );
    }

    #[test]
    fn manual_leg_applies_only_while_idle() {
        let manual = ManualPose {
            hip: 40.0,
            knee: 0.0,
            ankle: 0.0,
        };
        let camera = CameraState::default();
        let rest = build_scene(&camera, &AnimationState::IDLE, &ManualPose::default());
        let posed = build_scene(&camera, &AnimationState::IDLE, &manual);
        let overridden = build_scene(&camera, &active(Pose::REST), &manual);

        assert_ne!(origin_of(&rest, "calf_l"), origin_of(&posed, "calf_l"));
        assert_eq!(origin_of(&rest, "calf_l"), origin_of(&overridden, "calf_l"));
        // the right leg is never posed by hand
        assert_eq!(origin_of(&rest, "calf_r"), origin_of(&posed, "calf_r"));
    }

    #[test]
    fn body_sway_carries_every_attached_part() {
        let camera = CameraState::default();
        let manual = ManualPose::default();
        let still = build_scene(&camera, &active(Pose::REST), &manual);
        let swayed = build_scene(
            &camera,
            &active(Pose {
                body_sway: 10.0,
                ..Pose::REST
            }),
            &manual,
        );

        // the torso pivots about its own origin
        assert!((origin_of(&still, "body") - origin_of(&swayed, "body")).length() < 1e-6);
        for label in ["belly", "head", "arm_l", "foot_l", "foot_r"] {
            let moved = (origin_of(&still, label) - origin_of(&swayed, label)).length();
            assert!(moved > 1e-3, "{label} did not follow the torso");
        }
    }

    #[test]
    fn head_bob_moves_only_the_head() {
        let camera = CameraState::default();
        let manual = ManualPose::default();
        let still = build_scene(&camera, &active(Pose::REST), &manual);
        let bobbed = build_scene(
            &camera,
            &active(Pose {
                head_bob: 15.0,
                ..Pose::REST
            }),
            &manual,
        );

        for (a, b) in still.drawables.iter().zip(&bobbed.drawables) {
            let in_head = still
                .drawables
                .iter()
                .position(|d| d.label == a.label)
                .is_some_and(|i| (2..13).contains(&i));
            assert_eq!(a.transform == b.transform, !in_head, "{}", a.label);
        }
    }

    #[test]
    fn arms_swing_in_opposition() {
        let camera = CameraState::default();
        let manual = ManualPose::default();
        let swung = build_scene(
            &camera,
            &active(Pose {
                arm_swing: 40.0,
                ..Pose::REST
            }),
            &manual,
        );
        let hand = Vec3::new(0.5, 1.0, -0.5);
        let left = swung.drawables.find("arm_l").unwrap().transform.transform_point(hand);
        let right = swung.drawables.find("arm_r").unwrap().transform.transform_point(hand);
        let still = build_scene(&camera, &active(Pose::REST), &manual);
        let left0 = still.drawables.find("arm_l").unwrap().transform.transform_point(hand);
        let right0 = still.drawables.find("arm_r").unwrap().transform.transform_point(hand);

        // opposite rotations about X push the far ends in opposite z directions
        assert!((left.z - left0.z) * (right.z - right0.z) < 0.0);
    }

    #[test]
    fn global_rotation_comes_from_the_orbit() {
        let camera = CameraState {
            yaw: 30.0,
            pitch: -15.0,
            ..CameraState::default()
        };
        let frame = build_scene(&camera, &AnimationState::IDLE, &ManualPose::default());
        assert_eq!(frame.global_rotation, camera.global_rotation());

        // drawables stay in character space
        let unrotated = build_scene(
            &CameraState::default(),
            &AnimationState::IDLE,
            &ManualPose::default(),
        );
        assert_eq!(frame.drawables, unrotated.drawables);
    }

    #[test]
    fn every_transform_is_finite_through_a_poke() {
        let mut anim = AnimationController::default();
        anim.animation_on(0.0);
        anim.poke(0.5);
        let camera = CameraState::default();
        let manual = ManualPose::default();
        for step in 0..40_u32 {
            let state = anim.update(0.5 + f64::from(step) * 0.05);
            let frame = build_scene(&camera, &state, &manual);
            for d in &frame.drawables {
                assert!(d.transform.matrix().is_finite(), "{}", d.label);
            }
        }
        assert_eq!(anim.mode(), AnimationMode::Idle);
    }

    #[test]
    fn manual_nudges_are_clamped() {
        let mut manual = ManualPose::default();
        manual.nudge(LegJoint::Knee, 50.0);
        manual.nudge(LegJoint::Knee, 50.0);
        manual.nudge(LegJoint::Ankle, -5.0);
        assert_eq!(manual.get(LegJoint::Knee), MANUAL_JOINT_LIMIT);
        assert_eq!(manual.get(LegJoint::Ankle), -5.0);
        assert_eq!(manual.get(LegJoint::Hip), 0.0);
    }
}
