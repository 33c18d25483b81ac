//! # Voxel Core
//!
//! Voxel data and everything that reads or writes it without touching the renderer.
//!
//! ## Architecture
//!
//! * **Block**: Voxel materials and the six face directions
//! * **Chunk**: Fixed-size 16³ arrays of voxels, their keys and coordinate math
//! * **Terrain**: Generators that decide the material of every new voxel
//! * **World**: The chunk store, holding voxel data and per-chunk mesh state
//! * **Raycast**: Grid traversal for picking voxels
//!
//! ## Data Flow
//!
//! 1. The engine asks the world for a chunk, generating it if it is missing
//! 2. Voxel edits go through the world to the owning chunk
//! 3. Edits mark the chunk for re-meshing
//! 4. Mesh jobs take an occupancy snapshot from the world

pub mod block;
pub mod chunk;
pub mod raycast;
pub mod terrain;
pub mod world;
