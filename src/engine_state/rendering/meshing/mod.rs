//! Mesh generation for voxel chunks.
//!
//! This module converts voxel data into the vertex arrays a renderer uploads. It emits
//! one quad per visible voxel face and shades each quad's corners with ambient
//! occlusion.
//!
//! # Architecture
//! - `culled`: The mesher itself (`mesh_chunk`, `mesh_voxels`)
//! - `face`: Static corner, uv and occluder tables for the six faces
//! - `occlusion`: The 16 precomputed shading patterns
//! - `geometry`: `GeometryAttributes`, the mesher's output

mod culled;
mod face;
mod geometry;
mod occlusion;

pub use culled::{mesh_chunk, mesh_voxels, MeshOptions, MAX_FACES_PER_CHUNK};
pub use face::{FaceGeometry, FACES};
pub use geometry::{GeometryAttributes, GeometryBuilder, FACE_INDICES, MAX_INDEXABLE_VERTICES};
pub use occlusion::{LIT_SHADE, OCCLUDED_SHADE, OCCLUSION_TABLE, UNSHADED};
