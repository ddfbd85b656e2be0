//! Animation controller: an explicit Idle / Cyclic / Poke state machine.
//!
//! The controller publishes six derived channels every frame (hip, knee,
//! ankle, head bob, arm swing and body sway, all in degrees). They are a pure
//! function of the current mode and the time elapsed since that mode started,
//! so sampling the same time twice always yields the same pose.
//!
//! ```text
//!            animation_on            poke
//!   Idle ─────────────────▶ Cyclic ─────────▶ Poke
//!    ▲  ◀─────────────────    │                 │
//!    │      animation_off     │ poke            │ elapsed > duration
//!    │                        ▼                 │
//!    └──────────────────── (Poke) ◀─────────────┘
//! ```
//!
//! A poke preempts the cyclic animation for its whole duration and always
//! settles back into [`AnimationMode::Idle`].

use std::f32::consts::TAU;

/// One value per animated channel.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Joints<T> {
    pub hip: T,
    pub knee: T,
    pub ankle: T,
    pub head_bob: T,
    pub arm_swing: T,
    pub body_sway: T,
}

impl<T> Joints<T> {
    /// Applies `f` to every channel.
    pub fn map<U>(&self, mut f: impl FnMut(&T) -> U) -> Joints<U> {
        Joints {
            hip: f(&self.hip),
            knee: f(&self.knee),
            ankle: f(&self.ankle),
            head_bob: f(&self.head_bob),
            arm_swing: f(&self.arm_swing),
            body_sway: f(&self.body_sway),
        }
    }

    pub fn to_array(self) -> [T; 6] {
        [
            self.hip,
            self.knee,
            self.ankle,
            self.head_bob,
            self.arm_swing,
            self.body_sway,
        ]
    }
}

/// Derived joint angles in degrees.
pub type Pose = Joints<f32>;

impl Pose {
    /// The rest pose; every channel is zero.
    pub const REST: Pose = Joints {
        hip: 0.0,
        knee: 0.0,
        ankle: 0.0,
        head_bob: 0.0,
        arm_swing: 0.0,
        body_sway: 0.0,
    };

    pub fn is_rest(&self) -> bool {
        self.to_array().iter().all(|v| *v == 0.0)
    }
}

/// A cyclic channel: `amplitude · sin(ω·t + phase)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Oscillator {
    /// Peak angle in degrees.
    pub amplitude: f32,
    /// Phase offset in radians.
    pub phase: f32,
}

impl Oscillator {
    pub const fn new(amplitude: f32, phase: f32) -> Self {
        Self { amplitude, phase }
    }
}

/// A poke channel: `amplitude · sin(frequency·t) · fade(t)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Wiggle {
    /// Peak angle in degrees before fading.
    pub amplitude: f32,
    /// Angular frequency in radians per second.
    pub frequency: f32,
}

impl Wiggle {
    pub const fn new(amplitude: f32, frequency: f32) -> Self {
        Self {
            amplitude,
            frequency,
        }
    }
}

/// Tuning for the continuous idle cycle.
#[derive(Clone, Debug, PartialEq)]
pub struct CyclicConfig {
    /// Shared angular frequency ω in radians per second.
    pub angular_frequency: f32,
    pub channels: Joints<Oscillator>,
}

impl Default for CyclicConfig {
    fn default() -> Self {
        Self {
            angular_frequency: 2.4,
            channels: Joints {
                hip: Oscillator::new(18.0, 0.0),
                knee: Oscillator::new(28.0, 1.0),
                ankle: Oscillator::new(10.0, 2.0),
                head_bob: Oscillator::new(4.0, 0.0),
                arm_swing: Oscillator::new(10.0, 2.0),
                body_sway: Oscillator::new(2.0, 0.5),
            },
        }
    }
}

impl CyclicConfig {
    /// Seconds per full cycle (`2π / ω`).
    pub fn period(&self) -> f32 {
        TAU / self.angular_frequency
    }

    pub fn sample(&self, t: f32) -> Pose {
        let omega = self.angular_frequency;
        self.channels
            .map(|c| c.amplitude * (omega * t + c.phase).sin())
    }
}

/// Tuning for the one-shot poke gesture.
#[derive(Clone, Debug, PartialEq)]
pub struct PokeConfig {
    /// Seconds after which the gesture ends and the controller returns to idle.
    pub duration: f32,
    /// Exponential decay rate of the fade, per second.
    pub decay: f32,
    pub channels: Joints<Wiggle>,
}

impl Default for PokeConfig {
    fn default() -> Self {
        Self {
            duration: 1.2,
            decay: 2.0,
            channels: Joints {
                hip: Wiggle::new(10.0, 20.0),
                knee: Wiggle::new(14.0, 18.0),
                ankle: Wiggle::new(8.0, 24.0),
                head_bob: Wiggle::new(22.0, 18.0),
                arm_swing: Wiggle::new(55.0, 22.0),
                body_sway: Wiggle::new(10.0, 16.0),
            },
        }
    }
}

impl PokeConfig {
    /// The fade multiplier `e^(-decay·t)`.
    pub fn fade(&self, t: f32) -> f32 {
        (-self.decay * t).exp()
    }

    pub fn sample(&self, t: f32) -> Pose {
        let fade = self.fade(t);
        self.channels
            .map(|w| w.amplitude * (w.frequency * t).sin() * fade)
    }
}

/// Full animation tuning. The defaults reproduce the character's stock look.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AnimationConfig {
    pub cyclic: CyclicConfig,
    pub poke: PokeConfig,
}

/// Which driver currently owns the joints.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AnimationMode {
    /// No animation; every derived channel is zero.
    Idle,
    /// Continuous sinusoidal motion since `started_at`.
    Cyclic { started_at: f64 },
    /// Decaying gesture since `started_at`; overrides everything else.
    Poke { started_at: f64 },
}

impl AnimationMode {
    /// Whether an animation driver is currently active.
    pub fn is_active(&self) -> bool {
        !matches!(self, AnimationMode::Idle)
    }

    fn name(&self) -> &'static str {
        match self {
            AnimationMode::Idle => "idle",
            AnimationMode::Cyclic { .. } => "cyclic",
            AnimationMode::Poke { .. } => "poke",
        }
    }
}

/// The controller's published output for one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnimationState {
    pub mode: AnimationMode,
    pub pose: Pose,
}

impl AnimationState {
    pub const IDLE: AnimationState = AnimationState {
        mode: AnimationMode::Idle,
        pose: Pose::REST,
    };

    pub fn is_active(&self) -> bool {
        self.mode.is_active()
    }
}

impl Default for AnimationState {
    fn default() -> Self {
        Self::IDLE
    }
}

/// Owns the animation mode and computes the pose once per frame.
///
/// Times are seconds on the caller's monotonic clock, kept as `f64`.
///
/// # Example
///
/// ```
/// use blocky::{AnimationController, AnimationMode};
///
/// let mut anim = AnimationController::default();
/// anim.animation_on(0.0);
/// anim.poke(1.0);
///
/// let state = anim.update(1.5);
/// assert!(matches!(state.mode, AnimationMode::Poke { .. }));
///
/// // well past the gesture: back at rest
/// let state = anim.update(3.0);
/// assert_eq!(state.mode, AnimationMode::Idle);
/// assert!(state.pose.is_rest());
/// ```
#[derive(Clone, Debug)]
pub struct AnimationController {
    config: AnimationConfig,
    mode: AnimationMode,
}

impl Default for AnimationController {
    fn default() -> Self {
        Self::new(AnimationConfig::default())
    }
}

impl AnimationController {
    pub fn new(config: AnimationConfig) -> Self {
        Self {
            config,
            mode: AnimationMode::Idle,
        }
    }

    pub fn config(&self) -> &AnimationConfig {
        &self.config
    }

    pub fn mode(&self) -> AnimationMode {
        self.mode
    }

    /// "Animation on": Idle → Cyclic. Ignored while cyclic or poking.
    pub fn animation_on(&mut self, now: f64) {
        if self.mode == AnimationMode::Idle {
            self.transition(AnimationMode::Cyclic { started_at: now });
        }
    }

    /// "Animation off": Cyclic → Idle. A running poke is left to finish.
    pub fn animation_off(&mut self) {
        if let AnimationMode::Cyclic { .. } = self.mode {
            self.transition(AnimationMode::Idle);
        }
    }

    /// Gesture trigger: Idle or Cyclic → Poke, restarting the gesture if one
    /// is already running.
    pub fn poke(&mut self, now: f64) {
        self.transition(AnimationMode::Poke { started_at: now });
    }

    /// Advances the state machine to `now` and returns the published pose.
    pub fn update(&mut self, now: f64) -> AnimationState {
        if let AnimationMode::Poke { started_at } = self.mode {
            if elapsed(now, started_at) > self.config.poke.duration {
                self.transition(AnimationMode::Idle);
            }
        }

        AnimationState {
            mode: self.mode,
            pose: self.sample(now),
        }
    }

    /// The pose for the current mode at `now`, without advancing the mode.
    pub fn sample(&self, now: f64) -> Pose {
        match self.mode {
            AnimationMode::Idle => Pose::REST,
            AnimationMode::Cyclic { started_at } => {
                self.config.cyclic.sample(elapsed(now, started_at))
            }
            AnimationMode::Poke { started_at } => self.config.poke.sample(elapsed(now, started_at)),
        }
    }

    fn transition(&mut self, next: AnimationMode) {
        log::debug!("animation: {} -> {}", self.mode.name(), next.name());
        self.mode = next;
    }
}

/// Seconds since `started_at`. The subtraction happens at full precision so
/// that a long-running clock does not quantize the animation.
fn elapsed(now: f64, started_at: f64) -> f32 {
    (now - started_at) as f32
}
