//! # Geometry Attributes
//!
//! The mesher's output format, a set of parallel vertex arrays plus a `u16` index
//! buffer. Hosts upload these arrays as-is, so every `Vec` holds exactly the data of
//! the mesh and nothing else.
//!
//! ## Layout
//! - `positions`: 3 floats per vertex
//! - `normals`: 3 floats per vertex, always `(0, 1, 0)`
//! - `colors`: 3 floats per vertex
//! - `uvs`: 2 floats per vertex
//! - `indices`: 6 per quad, `[0, 1, 2, 0, 3, 1]` offset by `4 * quad`

use crate::engine_state::error::MeshError;

use super::face::FaceGeometry;

/// Per-quad index pattern.
pub const FACE_INDICES: [u16; 6] = [0, 1, 2, 0, 3, 1];

/// Largest vertex count a `u16` index buffer can address.
pub const MAX_INDEXABLE_VERTICES: usize = u16::MAX as usize + 1;

/// Vertex data for one chunk mesh.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GeometryAttributes {
    pub positions: Vec<f32>,
    pub normals: Vec<f32>,
    pub colors: Vec<f32>,
    pub uvs: Vec<f32>,
    pub indices: Vec<u16>,
}

impl GeometryAttributes {
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn face_count(&self) -> usize {
        self.vertex_count() / 4
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn position_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.positions)
    }

    pub fn normal_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.normals)
    }

    pub fn color_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.colors)
    }

    pub fn uv_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.uvs)
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }
}

/// Accumulates quads and derives the index and normal buffers once meshing is done.
#[derive(Default)]
pub struct GeometryBuilder {
    positions: Vec<f32>,
    colors: Vec<f32>,
    uvs: Vec<f32>,
}

impl GeometryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one quad.
    ///
    /// # Arguments
    /// * `center` - Center of the voxel the face belongs to
    /// * `face` - Which face to emit
    /// * `colors` - rgb for each of the four vertices
    pub fn push_face(&mut self, center: [f32; 3], face: &FaceGeometry, colors: &[f32; 12]) {
        self.positions.extend_from_slice(&face.positions(center));
        self.uvs.extend_from_slice(&face.uvs);
        self.colors.extend_from_slice(colors);
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    /// Finishes the mesh.
    ///
    /// # Returns
    /// The finished attributes, or `MeshError::IndexOverflow` if the quads cannot be
    /// addressed with `u16` indices.
    pub fn build(self) -> Result<GeometryAttributes, MeshError> {
        let vertices = self.vertex_count();
        if vertices > MAX_INDEXABLE_VERTICES {
            return Err(MeshError::IndexOverflow { vertices });
        }

        let quads = vertices / 4;
        let mut indices = Vec::with_capacity(quads * FACE_INDICES.len());
        for quad in 0..quads {
            let base = (quad * 4) as u16;
            indices.extend(FACE_INDICES.iter().map(|i| base + i));
        }

        let mut normals = Vec::with_capacity(vertices * 3);
        for _ in 0..vertices {
            normals.extend_from_slice(&[0.0, 1.0, 0.0]);
        }

        Ok(GeometryAttributes {
            positions: self.positions,
            normals,
            colors: self.colors,
            uvs: self.uvs,
            indices,
        })
    }
}
