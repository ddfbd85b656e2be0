//! # Blocky
//!
//! **A procedurally modeled, articulated koala built from three primitives.**
//!
//! The character is assembled every frame from a box, a pyramid and a sphere,
//! each uploaded to the GPU once and drawn many times under different
//! transforms. Joint angles come from a small animation state machine with an
//! idle cycle and a one-shot "poke" gesture.
//!
//! ## Quick Start
//!
//! ```no_run
//! use blocky::*;
//!
//! fn main() -> Result<(), RunError> {
//!     run(AppConfig::new().title("Koala").size(1024, 768))
//! }
//! ```
//!
//! ## Frame pipeline
//!
//! - [`ControlSignals`] turn raw [`Input`] into orbit drags, joint nudges and
//!   animation signals.
//! - [`AnimationController`] advances its mode and publishes an
//!   [`AnimationState`].
//! - [`build_scene`] composes the attach-point hierarchy into an ordered
//!   [`DrawList`].
//! - [`CharacterPass`] uploads per-drawable uniforms and draws each
//!   [`Drawable`] with the shared [`MeshLibrary`] buffers.
//!
//! Everything up to the render pass is plain data, so the pose and the
//! scene can be built and inspected without a GPU:
//!
//! ```
//! use blocky::*;
//!
//! let mut anim = AnimationController::default();
//! anim.animation_on(0.0);
//! let state = anim.update(0.5);
//!
//! let frame = build_scene(&CameraState::default(), &state, &ManualPose::default());
//! assert_eq!(frame.drawables.len(), 22);
//! assert_eq!(frame.drawables.count(Primitive::Sphere), 8);
//! ```

mod animation;
mod app;
mod camera;
mod color;
mod controls;
mod drawable;
mod error;
mod gpu;
mod input;
mod mesh;
mod mesh_pass;
mod orbit_camera;
mod scene_graph;
mod transform;

pub use animation::{
    AnimationConfig, AnimationController, AnimationMode, AnimationState, CyclicConfig, Joints,
    Oscillator, PokeConfig, Pose, Wiggle,
};
pub use app::{AppConfig, FPS_WINDOW, FpsCounter, run};
pub use camera::Camera;
pub use color::Color;
pub use controls::{Bindings, ControlSignals, KeyPair};
pub use drawable::{DrawList, Drawable};
pub use error::{InitError, MeshError, RunError};
pub use gpu::GpuContext;
pub use input::Input;
pub use mesh::{
    DEFAULT_SPHERE_BANDS, Mesh, MeshData, MeshLibrary, Primitive, SPHERE_RADIUS, Vertex3d,
};
pub use mesh_pass::{CharacterPass, DrawUniforms, FrameUniforms, Light};
pub use orbit_camera::{CameraState, DEFAULT_DRAG_SENSITIVITY, DEFAULT_PITCH_LIMIT};
pub use scene_graph::{
    AttachPoint, LegJoint, MANUAL_JOINT_LIMIT, ManualPose, SceneFrame, build_character,
    build_scene, joint_angles, palette,
};
pub use transform::Transform;

// Re-export glam math types for convenience
pub use glam::{Mat4, Vec2, Vec3};

// Re-export commonly used winit types for convenience
pub use winit::event::MouseButton;
pub use winit::keyboard::KeyCode;
