//! Procedural primitive meshes and their GPU-resident buffers.
//!
//! This module provides the geometry every part of the character is built from:
//!
//! - [`Vertex3d`]: position + outward normal, 24 bytes per vertex
//! - [`MeshData`]: CPU-side triangle lists for the box, pyramid and sphere
//! - [`Mesh`]: a vertex buffer uploaded once and reused by every draw
//! - [`MeshLibrary`]: owns the three uploaded primitives, keyed by [`Primitive`]
//!
//! All primitives are non-indexed triangle lists wound counter-clockwise when
//! viewed from outside, with one flat normal per face for the box and pyramid
//! and smooth radial normals for the sphere.
//!
//! # Vertex Layout
//!
//! | Attribute | Format    | Offset | Shader Location |
//! |-----------|-----------|--------|-----------------|
//! | position  | Float32x3 | 0      | 0               |
//! | normal    | Float32x3 | 12     | 1               |

use std::f32::consts::PI;

use glam::Vec3;

use crate::error::MeshError;
use crate::gpu::GpuContext;

/// Default sphere tessellation, in both latitude and longitude.
pub const DEFAULT_SPHERE_BANDS: u32 = 24;

/// Sphere radius. The normal is the position scaled by `1 / SPHERE_RADIUS`.
pub const SPHERE_RADIUS: f32 = 0.5;

/// A mesh vertex: model-space position and outward unit normal.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex3d {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl Vertex3d {
    /// The wgpu vertex buffer layout: 24-byte stride, position at location 0,
    /// normal at location 1.
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex3d>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[
            // position
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x3,
            },
            // normal
            wgpu::VertexAttribute {
                offset: 12,
                shader_location: 1,
                format: wgpu::VertexFormat::Float32x3,
            },
        ],
    };

    pub fn new(position: impl Into<[f32; 3]>, normal: impl Into<[f32; 3]>) -> Self {
        Self {
            position: position.into(),
            normal: normal.into(),
        }
    }
}

/// Identity of one of the three shared primitive meshes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Primitive {
    /// Unit box spanning `[0,1] × [0,1] × [-1,0]`.
    Box,
    /// Square pyramid on `[0,1] × {0} × [0,1]` with apex `(0.5, 1, 0.5)`.
    Pyramid,
    /// UV sphere of radius 0.5 centered at the origin.
    Sphere,
}

impl Primitive {
    pub fn label(self) -> &'static str {
        match self {
            Primitive::Box => "box",
            Primitive::Pyramid => "pyramid",
            Primitive::Sphere => "sphere",
        }
    }
}

/// An immutable triangle list held in CPU memory, ready for upload.
#[derive(Clone, Debug)]
pub struct MeshData {
    label: &'static str,
    vertices: Vec<Vertex3d>,
}

impl MeshData {
    /// Wraps a triangle list, rejecting empty or partial-triangle input.
    pub fn new(label: &'static str, vertices: Vec<Vertex3d>) -> Result<Self, MeshError> {
        if vertices.is_empty() || vertices.len() % 3 != 0 {
            return Err(MeshError::MalformedTriangleList {
                label,
                count: vertices.len(),
            });
        }
        Ok(Self { label, vertices })
    }

    /// The unit box: 6 faces × 2 triangles = 36 vertices, flat normals.
    pub fn cube() -> Self {
        #[rustfmt::skip]
        let faces: [(Vec3, [[f32; 3]; 6]); 6] = [
            // front (z = 0)
            (
                Vec3::Z,
                [
                    [0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0],
                    [0.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0],
                ],
            ),
            // back (z = -1)
            (
                Vec3::NEG_Z,
                [
                    [0.0, 0.0, -1.0], [1.0, 1.0, -1.0], [1.0, 0.0, -1.0],
                    [0.0, 0.0, -1.0], [0.0, 1.0, -1.0], [1.0, 1.0, -1.0],
                ],
            ),
            // top (y = 1)
            (
                Vec3::Y,
                [
                    [0.0, 1.0, 0.0], [1.0, 1.0, 0.0], [1.0, 1.0, -1.0],
                    [0.0, 1.0, 0.0], [1.0, 1.0, -1.0], [0.0, 1.0, -1.0],
                ],
            ),
            // bottom (y = 0)
            (
                Vec3::NEG_Y,
                [
                    [0.0, 0.0, 0.0], [1.0, 0.0, -1.0], [1.0, 0.0, 0.0],
                    [0.0, 0.0, 0.0], [0.0, 0.0, -1.0], [1.0, 0.0, -1.0],
                ],
            ),
            // left (x = 0)
            (
                Vec3::NEG_X,
                [
                    [0.0, 0.0, 0.0], [0.0, 1.0, -1.0], [0.0, 0.0, -1.0],
                    [0.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 1.0, -1.0],
                ],
            ),
            // right (x = 1)
            (
                Vec3::X,
                [
                    [1.0, 0.0, 0.0], [1.0, 0.0, -1.0], [1.0, 1.0, -1.0],
                    [1.0, 0.0, 0.0], [1.0, 1.0, -1.0], [1.0, 1.0, 0.0],
                ],
            ),
        ];

        Self::from_flat_faces("box", &faces)
    }

    /// The square pyramid: 4 sloped faces + 2 base triangles = 18 vertices.
    pub fn pyramid() -> Self {
        const APEX: [f32; 3] = [0.5, 1.0, 0.5];

        let faces: [(Vec3, [[f32; 3]; 3]); 6] = [
            // front (z = 0 edge)
            (
                Vec3::new(0.0, 1.0, -2.0).normalize(),
                [[1.0, 0.0, 0.0], [0.0, 0.0, 0.0], APEX],
            ),
            // right (x = 1 edge)
            (
                Vec3::new(2.0, 1.0, 0.0).normalize(),
                [[1.0, 0.0, 1.0], [1.0, 0.0, 0.0], APEX],
            ),
            // back (z = 1 edge)
            (
                Vec3::new(0.0, 1.0, 2.0).normalize(),
                [[0.0, 0.0, 1.0], [1.0, 0.0, 1.0], APEX],
            ),
            // left (x = 0 edge)
            (
                Vec3::new(-2.0, 1.0, 0.0).normalize(),
                [[0.0, 0.0, 0.0], [0.0, 0.0, 1.0], APEX],
            ),
            // base
            (
                Vec3::NEG_Y,
                [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 0.0, 1.0]],
            ),
            (
                Vec3::NEG_Y,
                [[0.0, 0.0, 0.0], [1.0, 0.0, 1.0], [0.0, 0.0, 1.0]],
            ),
        ];

        Self::from_flat_faces("pyramid", &faces)
    }

    /// A UV sphere of radius 0.5 with `6 × lat_bands × lon_bands` vertices.
    ///
    /// Each latitude/longitude quad is split into two triangles. The normal of
    /// every vertex is its position scaled by two, which is exactly unit length
    /// for a radius-0.5 sphere centered at the origin.
    pub fn sphere(lat_bands: u32, lon_bands: u32) -> Result<Self, MeshError> {
        if lat_bands == 0 || lon_bands == 0 {
            return Err(MeshError::InvalidBands {
                lat_bands,
                lon_bands,
            });
        }

        let point = |theta: f32, phi: f32| {
            Vec3::new(
                SPHERE_RADIUS * theta.sin() * phi.cos(),
                SPHERE_RADIUS * theta.cos(),
                SPHERE_RADIUS * theta.sin() * phi.sin(),
            )
        };
        let vertex = |p: Vec3| Vertex3d::new(p, p / SPHERE_RADIUS);

        let mut vertices = Vec::with_capacity(6 * lat_bands as usize * lon_bands as usize);

        for lat in 0..lat_bands {
            let theta1 = lat as f32 / lat_bands as f32 * PI;
            let theta2 = (lat + 1) as f32 / lat_bands as f32 * PI;

            for lon in 0..lon_bands {
                let phi1 = lon as f32 / lon_bands as f32 * 2.0 * PI;
                let phi2 = (lon + 1) as f32 / lon_bands as f32 * 2.0 * PI;

                let p00 = point(theta1, phi1);
                let p10 = point(theta1, phi2);
                let p01 = point(theta2, phi1);
                let p11 = point(theta2, phi2);

                vertices.extend([vertex(p00), vertex(p10), vertex(p01)]);
                vertices.extend([vertex(p10), vertex(p11), vertex(p01)]);
            }
        }

        Self::new("sphere", vertices)
    }

    fn from_flat_faces<const N: usize>(
        label: &'static str,
        faces: &[(Vec3, [[f32; 3]; N])],
    ) -> Self {
        let vertices = faces
            .iter()
            .flat_map(|(normal, corners)| {
                corners
                    .iter()
                    .map(move |corner| Vertex3d::new(*corner, *normal))
            })
            .collect();
        Self { label, vertices }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn vertices(&self) -> &[Vertex3d] {
        &self.vertices
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertices.len() as u32
    }

    /// Iterates the triangles as position triples.
    pub fn triangles(&self) -> impl Iterator<Item = [&Vertex3d; 3]> {
        self.vertices
            .chunks_exact(3)
            .map(|tri| [&tri[0], &tri[1], &tri[2]])
    }
}

/// A triangle list uploaded to a GPU vertex buffer.
///
/// Uploaded once at startup; every [`Drawable`](crate::Drawable) that refers to
/// this mesh reuses the same buffer.
#[derive(Debug)]
pub struct Mesh {
    pub(crate) vertex_buffer: wgpu::Buffer,
    pub(crate) vertex_count: u32,
}

impl Mesh {
    /// Uploads mesh data into a new vertex buffer.
    ///
    /// The allocation runs inside an out-of-memory error scope; a failed
    /// allocation is returned as [`MeshError::BufferAllocation`].
    pub fn upload(gpu: &GpuContext, data: &MeshData) -> Result<Self, MeshError> {
        use wgpu::util::DeviceExt;

        gpu.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let vertex_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(data.label()),
                contents: bytemuck::cast_slice(data.vertices()),
                usage: wgpu::BufferUsages::VERTEX,
            });
        if let Some(source) = pollster::block_on(gpu.device.pop_error_scope()) {
            return Err(MeshError::BufferAllocation {
                label: data.label(),
                source,
            });
        }

        Ok(Self {
            vertex_buffer,
            vertex_count: data.vertex_count(),
        })
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }
}

/// The three shared primitive meshes, uploaded once.
#[derive(Debug)]
pub struct MeshLibrary {
    cube: Mesh,
    pyramid: Mesh,
    sphere: Mesh,
}

impl MeshLibrary {
    /// Generates and uploads the box, pyramid and sphere.
    ///
    /// Band counts are validated before anything touches the GPU.
    pub fn new(gpu: &GpuContext, lat_bands: u32, lon_bands: u32) -> Result<Self, MeshError> {
        let sphere = MeshData::sphere(lat_bands, lon_bands)?;

        let library = Self {
            cube: Mesh::upload(gpu, &MeshData::cube())?,
            pyramid: Mesh::upload(gpu, &MeshData::pyramid())?,
            sphere: Mesh::upload(gpu, &sphere)?,
        };

        log::info!(
            "mesh library ready: box={} pyramid={} sphere={} vertices ({}x{} bands)",
            library.cube.vertex_count,
            library.pyramid.vertex_count,
            library.sphere.vertex_count,
            lat_bands,
            lon_bands,
        );

        Ok(library)
    }

    pub fn get(&self, primitive: Primitive) -> &Mesh {
        match primitive {
            Primitive::Box => &self.cube,
            Primitive::Pyramid => &self.pyramid,
            Primitive::Sphere => &self.sphere,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn assert_outward_winding(mesh: &MeshData) {
        for [a, b, c] in mesh.triangles() {
            let (pa, pb, pc) = (
                Vec3::from(a.position),
                Vec3::from(b.position),
                Vec3::from(c.position),
            );
            let face = (pb - pa).cross(pc - pa);
            // pole triangles of the sphere collapse to a line
            if face.length() < 1e-7 {
                continue;
            }
            for v in [a, b, c] {
                assert!(
                    face.dot(Vec3::from(v.normal)) > 0.0,
                    "{}: triangle {:?} is wound against its normal",
                    mesh.label(),
                    [pa, pb, pc]
                );
            }
        }
    }

    fn assert_unit_normals(mesh: &MeshData) {
        for v in mesh.vertices() {
            let len = Vec3::from(v.normal).length();
            assert!((len - 1.0).abs() < 1e-5, "{}: |n| = {len}", mesh.label());
        }
    }

    #[test]
    fn vertex_stride_is_six_floats() {
        assert_eq!(std::mem::size_of::<Vertex3d>(), 24);
        assert_eq!(Vertex3d::LAYOUT.array_stride, 24);
    }

    #[test]
    fn cube_has_36_flat_shaded_vertices() {
        let cube = MeshData::cube();
        assert_eq!(cube.vertex_count(), 36);
        assert_unit_normals(&cube);
        assert_outward_winding(&cube);

        for face in cube.vertices().chunks_exact(6) {
            assert!(face.iter().all(|v| v.normal == face[0].normal));
        }
    }

    #[test]
    fn cube_spans_unit_corner_box() {
        let cube = MeshData::cube();
        for v in cube.vertices() {
            let [x, y, z] = v.position;
            assert!((0.0..=1.0).contains(&x));
            assert!((0.0..=1.0).contains(&y));
            assert!((-1.0..=0.0).contains(&z));
        }
    }

    #[test]
    fn pyramid_has_18_vertices_and_outward_faces() {
        let pyramid = MeshData::pyramid();
        assert_eq!(pyramid.vertex_count(), 18);
        assert_unit_normals(&pyramid);
        assert_outward_winding(&pyramid);

        let apex_count = pyramid
            .vertices()
            .iter()
            .filter(|v| v.position == [0.5, 1.0, 0.5])
            .count();
        assert_eq!(apex_count, 4);
    }

    #[test_case(1, 1)]
    #[test_case(1, 3)]
    #[test_case(2, 2)]
    #[test_case(7, 5)]
    #[test_case(24, 24)]
    fn sphere_vertex_count_and_normals(lat: u32, lon: u32) {
        let sphere = MeshData::sphere(lat, lon).unwrap();
        assert_eq!(sphere.vertex_count() as usize, 6 * lat as usize * lon as usize);

        for v in sphere.vertices() {
            let p = Vec3::from(v.position);
            let n = Vec3::from(v.normal);
            assert!(n.dot(p) >= 0.0);
            assert!((p.length() - SPHERE_RADIUS).abs() < 1e-5);
        }
        assert_unit_normals(&sphere);
    }

    #[test]
    fn default_sphere_is_wound_outward() {
        let sphere = MeshData::sphere(DEFAULT_SPHERE_BANDS, DEFAULT_SPHERE_BANDS).unwrap();
        assert_eq!(sphere.vertex_count(), 3456);
        assert_outward_winding(&sphere);
    }

    #[test_case(0, 24)]
    #[test_case(24, 0)]
    #[test_case(0, 0)]
    fn sphere_rejects_zero_bands(lat: u32, lon: u32) {
        let err = MeshData::sphere(lat, lon).unwrap_err();
        assert!(matches!(
            err,
            MeshError::InvalidBands { lat_bands, lon_bands } if lat_bands == lat && lon_bands == lon
        ));
    }

    #[test]
    fn malformed_triangle_list_is_rejected() {
        assert!(MeshData::new("empty", Vec::new()).is_err());

        let two = vec![Vertex3d::new([0.0; 3], [0.0, 1.0, 0.0]); 2];
        let err = MeshData::new("partial", two).unwrap_err();
        assert!(matches!(err, MeshError::MalformedTriangleList { count: 2, .. }));
    }
}
