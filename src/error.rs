//! Error types for mesh construction, startup and the render loop.
//!
//! Almost everything that can fail happens before the first frame is drawn and
//! is reported as an [`InitError`]. Once the render loop is running, a lost or
//! outdated surface is recovered by reconfiguring it; a surface failure that
//! reconfiguring cannot fix ends the loop as [`RunError::Frame`].

/// Errors produced while generating or uploading primitive meshes.
#[derive(Debug, thiserror::Error)]
pub enum MeshError {
    /// Sphere tessellation needs at least one band in each direction.
    #[error("invalid sphere bands: {lat_bands} latitude x {lon_bands} longitude (both must be >= 1)")]
    InvalidBands { lat_bands: u32, lon_bands: u32 },

    /// The vertex list was empty or not a whole number of triangles.
    #[error("mesh '{label}' has {count} vertices, expected a non-empty multiple of 3")]
    MalformedTriangleList { label: &'static str, count: usize },

    /// The device rejected the vertex buffer allocation.
    #[error("failed to allocate vertex buffer for mesh '{label}': {source}")]
    BufferAllocation {
        label: &'static str,
        #[source]
        source: wgpu::Error,
    },
}

/// Fatal errors raised while bringing up the window and render pipeline.
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),

    #[error("failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),

    #[error("no suitable GPU adapter: {0}")]
    Adapter(#[from] wgpu::RequestAdapterError),

    #[error("failed to create device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),

    #[error("surface reports no supported formats")]
    NoSurfaceFormat,

    /// Shader compilation or pipeline linkage failed validation.
    #[error("failed to build render pipeline '{label}': {source}")]
    Pipeline {
        label: &'static str,
        #[source]
        source: wgpu::Error,
    },

    #[error(transparent)]
    Mesh(#[from] MeshError),
}

/// Errors that end [`run`](crate::run).
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Init(#[from] InitError),

    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    /// The surface failed in a way reconfiguring cannot fix.
    #[error("surface failed while rendering: {0}")]
    Frame(#[source] wgpu::SurfaceError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn startup_errors_keep_their_message_through_run_error() {
        let err = RunError::from(InitError::from(MeshError::InvalidBands {
            lat_bands: 0,
            lon_bands: 8,
        }));
        assert!(matches!(err, RunError::Init(InitError::Mesh(_))));
        assert_eq!(
            err.to_string(),
            "invalid sphere bands: 0 latitude x 8 longitude (both must be >= 1)"
        );
    }

    #[test]
    fn frame_errors_are_not_startup_errors() {
        let err = RunError::Frame(wgpu::SurfaceError::OutOfMemory);
        assert!(!matches!(err, RunError::Init(_)));
        assert!(err.to_string().starts_with("surface failed while rendering"));
    }
}
