use std::sync::Arc;
use std::time::{Duration, Instant};

use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowAttributes, WindowId};

use crate::animation::{AnimationConfig, AnimationController};
use crate::camera::Camera;
use crate::color::Color;
use crate::controls::{Bindings, ControlSignals};
use crate::error::{InitError, RunError};
use crate::gpu::GpuContext;
use crate::input::Input;
use crate::mesh::{DEFAULT_SPHERE_BANDS, MeshLibrary};
use crate::mesh_pass::{CharacterPass, Light};
use crate::orbit_camera::CameraState;
use crate::scene_graph::{ManualPose, build_scene};

/// Minimum span over which frames are averaged for the FPS readout.
pub const FPS_WINDOW: Duration = Duration::from_millis(250);

/// Configuration for the app window and the character.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    /// Sphere tessellation as `(latitude, longitude)` bands.
    pub sphere_bands: (u32, u32),
    pub background: Color,
    pub camera: Camera,
    /// Initial orbit, including drag sensitivity and pitch limit.
    pub orbit: CameraState,
    pub animation: AnimationConfig,
    pub bindings: Bindings,
    pub light: Light,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "Blocky Koala".to_string(),
            width: 800,
            height: 600,
            sphere_bands: (DEFAULT_SPHERE_BANDS, DEFAULT_SPHERE_BANDS),
            background: Color::BLACK,
            camera: Camera::default(),
            orbit: CameraState::default(),
            animation: AnimationConfig::default(),
            bindings: Bindings::default(),
            light: Light::default(),
        }
    }
}

impl AppConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Sphere tessellation. Zero bands are rejected at startup.
    pub fn sphere_bands(mut self, lat_bands: u32, lon_bands: u32) -> Self {
        self.sphere_bands = (lat_bands, lon_bands);
        self
    }

    pub fn background(mut self, color: Color) -> Self {
        self.background = color;
        self
    }

    pub fn camera(mut self, camera: Camera) -> Self {
        self.camera = camera;
        self
    }

    /// Degrees of orbit per pixel of drag.
    pub fn drag_sensitivity(mut self, degrees_per_pixel: f32) -> Self {
        self.orbit = self.orbit.sensitivity(degrees_per_pixel);
        self
    }

    pub fn pitch_limit(mut self, degrees: f32) -> Self {
        self.orbit = self.orbit.pitch_limit(degrees);
        self
    }

    pub fn animation(mut self, animation: AnimationConfig) -> Self {
        self.animation = animation;
        self
    }

    pub fn bindings(mut self, bindings: Bindings) -> Self {
        self.bindings = bindings;
        self
    }

    pub fn light(mut self, light: Light) -> Self {
        self.light = light;
        self
    }
}

/// Averages frame times over windows of at least [`FPS_WINDOW`].
#[derive(Clone, Debug)]
pub struct FpsCounter {
    window_start: Instant,
    frames: u32,
    fps: Option<f32>,
}

impl FpsCounter {
    pub fn new(now: Instant) -> Self {
        Self {
            window_start: now,
            frames: 0,
            fps: None,
        }
    }

    /// Counts one frame. Returns the new rate when a window closes.
    pub fn tick(&mut self, now: Instant) -> Option<f32> {
        self.frames += 1;
        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed < FPS_WINDOW {
            return None;
        }
        let fps = self.frames as f32 / elapsed.as_secs_f32();
        self.fps = Some(fps);
        self.frames = 0;
        self.window_start = now;
        Some(fps)
    }

    /// The last completed measurement.
    pub fn fps(&self) -> Option<f32> {
        self.fps
    }
}

/// Runs the koala viewer until the window is closed.
///
/// Startup failures (window, GPU, pipeline or mesh upload) stop the event loop
/// and are returned to the caller as [`RunError::Init`]. A surface that fails
/// mid-run in a way reconfiguring cannot fix is returned as [`RunError::Frame`].
///
/// # Example
/// ```no_run
/// use blocky::AppConfig;
///
/// blocky::run(AppConfig::new().title("Koala").size(1280, 720))?;
/// # Ok::<(), blocky::RunError>(())
/// ```
pub fn run(config: AppConfig) -> Result<(), RunError> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = BlockyApp::Pending { config };
    event_loop.run_app(&mut app)?;

    match app {
        BlockyApp::Failed(err) => Err(err),
        _ => Ok(()),
    }
}

/// What the loop does after a frame failed to reach the surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SurfaceRecovery {
    /// Reconfigure the surface and skip the frame.
    Reconfigure,
    /// Skip the frame and try again next redraw.
    Skip,
}

fn recover_surface(err: wgpu::SurfaceError) -> Result<SurfaceRecovery, RunError> {
    match err {
        wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => {
            log::warn!("{err}; reconfiguring surface and skipping frame");
            Ok(SurfaceRecovery::Reconfigure)
        }
        wgpu::SurfaceError::Timeout => {
            log::warn!("surface timed out; skipping frame");
            Ok(SurfaceRecovery::Skip)
        }
        err => Err(RunError::Frame(err)),
    }
}

enum BlockyApp {
    Pending { config: AppConfig },
    Running(Box<Running>),
    Failed(RunError),
}

struct Running {
    window: Arc<Window>,
    gpu: GpuContext,
    meshes: MeshLibrary,
    pass: CharacterPass,
    camera: Camera,
    orbit: CameraState,
    anim: AnimationController,
    manual: ManualPose,
    bindings: Bindings,
    input: Input,
    fps: FpsCounter,
    title: String,
    start_time: Instant,
}

impl Running {
    fn new(event_loop: &ActiveEventLoop, config: &AppConfig) -> Result<Self, InitError> {
        let window_attrs = WindowAttributes::default()
            .with_title(&config.title)
            .with_inner_size(winit::dpi::LogicalSize::new(config.width, config.height));

        let window = Arc::new(event_loop.create_window(window_attrs)?);
        let gpu = GpuContext::new(window.clone())?;

        let (lat_bands, lon_bands) = config.sphere_bands;
        let meshes = MeshLibrary::new(&gpu, lat_bands, lon_bands)?;
        let pass = CharacterPass::new(&gpu, config.light, config.background)?;

        log::info!("{}x{} window ready", gpu.width(), gpu.height());

        let now = Instant::now();
        Ok(Self {
            window,
            gpu,
            meshes,
            pass,
            camera: config.camera,
            orbit: config.orbit,
            anim: AnimationController::new(config.animation.clone()),
            manual: ManualPose::default(),
            bindings: config.bindings.clone(),
            input: Input::new(),
            fps: FpsCounter::new(now),
            title: config.title.clone(),
            start_time: now,
        })
    }

    /// One frame: input, animation, scene, draw.
    fn tick(&mut self) -> Result<(), RunError> {
        let now = self.start_time.elapsed().as_secs_f64();

        ControlSignals::gather(&self.input, &self.bindings).apply(
            now,
            &mut self.orbit,
            &mut self.anim,
            &mut self.manual,
        );
        let state = self.anim.update(now);
        let frame = build_scene(&self.orbit, &state, &self.manual);

        if let Err(err) = self
            .pass
            .draw_frame(&self.gpu, &self.meshes, &self.camera, &frame)
        {
            if recover_surface(err)? == SurfaceRecovery::Reconfigure {
                self.gpu.reconfigure();
            }
        }

        if let Some(fps) = self.fps.tick(Instant::now()) {
            self.window
                .set_title(&format!("{} - {:.0} fps", self.title, fps));
        }
        Ok(())
    }
}

impl ApplicationHandler for BlockyApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if let BlockyApp::Pending { config } = self {
            match Running::new(event_loop, config) {
                Ok(running) => {
                    running.window.request_redraw();
                    *self = BlockyApp::Running(Box::new(running));
                }
                Err(err) => {
                    log::error!("startup failed: {err}");
                    event_loop.exit();
                    *self = BlockyApp::Failed(err.into());
                }
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let BlockyApp::Running(app) = self else {
            return;
        };

        app.input.handle_event(&event);

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                app.gpu.resize(size.width, size.height);
            }
            WindowEvent::RedrawRequested => {
                if let Err(err) = app.tick() {
                    log::error!("{err}");
                    event_loop.exit();
                    *self = BlockyApp::Failed(err);
                    return;
                }
                app.input.begin_frame();
                app.window.request_redraw();
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fps_waits_for_a_full_window() {
        let start = Instant::now();
        let mut counter = FpsCounter::new(start);

        for i in 1..15 {
            assert_eq!(counter.tick(start + Duration::from_millis(i * 16)), None);
        }
        assert_eq!(counter.fps(), None);

        // 15 frames over 300ms
        let fps = counter.tick(start + Duration::from_millis(300)).unwrap();
        assert!((fps - 50.0).abs() < 1e-3, "{fps}");
        assert_eq!(counter.fps(), Some(fps));

        // the next window starts fresh
        assert_eq!(counter.tick(start + Duration::from_millis(310)), None);
    }

    #[test]
    fn lost_or_outdated_surfaces_are_reconfigured() {
        for err in [wgpu::SurfaceError::Lost, wgpu::SurfaceError::Outdated] {
            assert_eq!(recover_surface(err).unwrap(), SurfaceRecovery::Reconfigure);
        }
        assert_eq!(
            recover_surface(wgpu::SurfaceError::Timeout).unwrap(),
            SurfaceRecovery::Skip
        );
    }

    #[test]
    fn unrecoverable_surface_errors_end_the_run_as_frame_errors() {
        let err = recover_surface(wgpu::SurfaceError::OutOfMemory).unwrap_err();
        assert!(matches!(
            err,
            RunError::Frame(wgpu::SurfaceError::OutOfMemory)
        ));
    }

    #[test]
    fn config_builders_forward_to_the_orbit() {
        let config = AppConfig::new()
            .drag_sensitivity(0.2)
            .pitch_limit(45.0)
            .sphere_bands(12, 16);
        assert_eq!(config.orbit.sensitivity, 0.2);
        assert_eq!(config.orbit.pitch_limit, 45.0);
        assert_eq!(config.sphere_bands, (12, 16));
    }

    #[test]
    fn default_config_matches_the_viewer() {
        let config = AppConfig::default();
        assert_eq!(config.sphere_bands, (24, 24));
        assert_eq!(config.orbit.sensitivity, 0.45);
        assert_eq!(config.orbit.pitch_limit, 80.0);
        assert_eq!(config.background, Color::BLACK);
    }
}
