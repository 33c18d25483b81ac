//! # Chunk Module
//!
//! This module provides the `Chunk` struct and related functionality for managing
//! 16x16x16 blocks of voxel data.
//!
//! ## Storage
//!
//! A chunk is a flat array of `CHUNK_SIZE` materials addressed by
//! [`index::voxel_index`]. Meshing never reads this array directly; it works on a
//! [`neighborhood::ChunkOccupancy`] bit grid built from the chunk (and optionally its
//! neighbours), which is what gets shipped to worker threads.

use cgmath::Point3;
use chunk_creation::ChunkCreationIterator;

use super::block::VoxelMaterial;
use super::terrain::{GlobalVariables, TerrainGenerator};
use crate::engine_state::error::TerrainError;

pub mod chunk_creation;
pub mod index;
mod key;
pub mod neighborhood;

pub use key::{ChunkKey, ChunkKeyParseError};

use index::{voxel_index, CHUNK_SIZE};

/// A 16x16x16 collection of voxels.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chunk {
    /// The position of this chunk in chunk coordinates (not voxel coordinates).
    pub position: ChunkKey,

    /// `CHUNK_SIZE` materials in index order.
    pub voxels: Box<[VoxelMaterial]>,
}

impl Chunk {
    /// Creates a new, completely empty chunk.
    pub fn empty(position: ChunkKey) -> Self {
        Chunk {
            position,
            voxels: vec![VoxelMaterial::Empty; CHUNK_SIZE].into_boxed_slice(),
        }
    }

    /// Creates a new chunk filled with a single material.
    pub fn solid(position: ChunkKey, material: VoxelMaterial) -> Self {
        Chunk {
            position,
            voxels: vec![material; CHUNK_SIZE].into_boxed_slice(),
        }
    }

    /// Fills a chunk by asking `generator` for every voxel in index order.
    ///
    /// # Arguments
    /// * `position` - The chunk to generate
    /// * `generator` - The terrain source, called once per voxel
    /// * `globals` - Script globals passed through to every call
    ///
    /// # Returns
    /// The finished chunk, or the first error the generator reported.
    pub fn generate(
        position: ChunkKey,
        generator: &dyn TerrainGenerator,
        globals: &GlobalVariables,
    ) -> Result<Self, TerrainError> {
        let mut cci = ChunkCreationIterator::new(position);
        while let Some(world) = cci.next_world() {
            cci.push_voxel(generator.generate(globals, world)?);
        }
        Ok(cci.return_chunk())
    }

    /// Material at local coordinates. Coordinates wrap into the chunk.
    pub fn get(&self, local: Point3<usize>) -> VoxelMaterial {
        self.voxels[voxel_index(local.x, local.y, local.z)]
    }

    /// Stores a material at local coordinates and returns the previous one.
    pub fn set(&mut self, local: Point3<usize>, material: VoxelMaterial) -> VoxelMaterial {
        std::mem::replace(
            &mut self.voxels[voxel_index(local.x, local.y, local.z)],
            material,
        )
    }

    /// Number of opaque voxels.
    pub fn solid_count(&self) -> usize {
        self.voxels.iter().filter(|v| v.is_opaque()).count()
    }
}
