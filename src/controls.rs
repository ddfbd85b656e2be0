//! Maps raw input to the discrete signals the character reacts to.
//!
//! The input collaborator is the only writer of [`CameraState`] and
//! [`ManualPose`]; the animation controller only ever sees the three
//! signals (on, off, poke).

use glam::Vec2;
use winit::event::MouseButton;
use winit::keyboard::KeyCode;

use crate::animation::AnimationController;
use crate::input::Input;
use crate::orbit_camera::CameraState;
use crate::scene_graph::{LegJoint, ManualPose};

/// A pair of keys that nudge a value up or down.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyPair {
    pub increase: KeyCode,
    pub decrease: KeyCode,
}

impl KeyPair {
    pub const fn new(increase: KeyCode, decrease: KeyCode) -> Self {
        Self { increase, decrease }
    }

    /// `+1`, `-1` or `0` for the keys pressed this frame.
    fn direction(&self, input: &Input) -> f32 {
        let up = input.key_pressed(self.increase) as i8;
        let down = input.key_pressed(self.decrease) as i8;
        f32::from(up - down)
    }
}

/// Key and button bindings.
#[derive(Clone, Debug, PartialEq)]
pub struct Bindings {
    pub animation_on: KeyCode,
    pub animation_off: KeyCode,
    /// Button that drags the orbit; with shift held it pokes instead.
    pub drag_button: MouseButton,
    pub turn: KeyPair,
    pub hip: KeyPair,
    pub knee: KeyPair,
    pub ankle: KeyPair,
    /// Degrees added per turn key press.
    pub turn_step: f32,
    /// Degrees added per joint key press.
    pub joint_step: f32,
}

impl Default for Bindings {
    fn default() -> Self {
        Self {
            animation_on: KeyCode::KeyA,
            animation_off: KeyCode::KeyS,
            drag_button: MouseButton::Left,
            turn: KeyPair::new(KeyCode::ArrowRight, KeyCode::ArrowLeft),
            hip: KeyPair::new(KeyCode::KeyU, KeyCode::KeyJ),
            knee: KeyPair::new(KeyCode::KeyI, KeyCode::KeyK),
            ankle: KeyPair::new(KeyCode::KeyO, KeyCode::KeyL),
            turn_step: 5.0,
            joint_step: 5.0,
        }
    }
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Everything one frame of input asks for.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ControlSignals {
    pub animation_on: bool,
    pub animation_off: bool,
    pub poke: bool,
    /// Pointer drag in pixels, zero unless the drag button is held.
    pub drag: Vec2,
    /// Turntable yaw in degrees.
    pub turn: f32,
    pub hip: f32,
    pub knee: f32,
    pub ankle: f32,
}

impl ControlSignals {
    pub fn gather(input: &Input, bindings: &Bindings) -> Self {
        let poke = input.shift_down() && input.mouse_pressed(bindings.drag_button);
        let drag = if input.mouse_down(bindings.drag_button) {
            input.mouse_delta()
        } else {
            Vec2::ZERO
        };

        Self {
            animation_on: input.key_pressed(bindings.animation_on),
            animation_off: input.key_pressed(bindings.animation_off),
            poke,
            drag,
            turn: bindings.turn.direction(input) * bindings.turn_step,
            hip: bindings.hip.direction(input) * bindings.joint_step,
            knee: bindings.knee.direction(input) * bindings.joint_step,
            ankle: bindings.ankle.direction(input) * bindings.joint_step,
        }
    }

    /// Applies the signals at time `now`.
    ///
    /// "Off" is handled before "on" so pressing both in one frame leaves the
    /// cyclic animation running; a poke is applied last and wins.
    pub fn apply(
        &self,
        now: f64,
        camera: &mut CameraState,
        anim: &mut AnimationController,
        manual: &mut ManualPose,
    ) {
        if self.drag != Vec2::ZERO {
            camera.drag(self.drag.x, self.drag.y);
        }
        if self.turn != 0.0 {
            camera.turn(self.turn);
        }

        for (joint, delta) in [
            (LegJoint::Hip, self.hip),
            (LegJoint::Knee, self.knee),
            (LegJoint::Ankle, self.ankle),
        ] {
            if delta != 0.0 {
                manual.nudge(joint, delta);
            }
        }

        if self.animation_off {
            anim.animation_off();
        }
        if self.animation_on {
            anim.animation_on(now);
        }
        if self.poke {
            anim.poke(now);
        }
    }
}
