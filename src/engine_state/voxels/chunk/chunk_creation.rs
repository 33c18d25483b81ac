//! # Chunk Creation Module
//!
//! Chunks are always filled front to back in index order (x fastest, then y, then z).
//! `ChunkCreationIterator` tracks the local position while voxels are pushed so callers
//! only supply materials.

use cgmath::Point3;

use crate::engine_state::voxels::block::VoxelMaterial;

use super::index::{CHUNK_DIMENSION, CHUNK_SIZE};
use super::{Chunk, ChunkKey};

/// A builder for filling a chunk one voxel at a time.
pub struct ChunkCreationIterator {
    /// The chunk being created
    position: ChunkKey,
    /// Voxels pushed so far, in index order
    voxels: Vec<VoxelMaterial>,
    /// Local coordinates of the next voxel to push
    local: Point3<i32>,
}

impl ChunkCreationIterator {
    /// Creates a new `ChunkCreationIterator` for building a chunk at the given position.
    pub fn new(position: ChunkKey) -> Self {
        ChunkCreationIterator {
            position,
            voxels: Vec::with_capacity(CHUNK_SIZE),
            local: Point3::new(0, 0, 0),
        }
    }

    /// Local coordinates of the voxel the next `push_voxel` call fills, or `None`
    /// once the chunk is full.
    pub fn next_local(&self) -> Option<Point3<i32>> {
        (!self.is_full()).then_some(self.local)
    }

    /// World voxel coordinates of the voxel the next `push_voxel` call fills.
    pub fn next_world(&self) -> Option<Point3<i32>> {
        let origin = self.position.0 * CHUNK_DIMENSION;
        self.next_local()
            .map(|l| Point3::new(origin.x + l.x, origin.y + l.y, origin.z + l.z))
    }

    pub fn is_full(&self) -> bool {
        self.voxels.len() == CHUNK_SIZE
    }

    /// Adds a voxel at the current position and advances the position.
    ///
    /// Pushing into a full chunk is ignored.
    pub fn push_voxel(&mut self, material: VoxelMaterial) {
        if self.is_full() {
            return;
        }
        self.voxels.push(material);

        self.local.x += 1;
        if self.local.x == CHUNK_DIMENSION {
            self.local.x = 0;
            self.local.y += 1;
            if self.local.y == CHUNK_DIMENSION {
                self.local.y = 0;
                self.local.z += 1;
            }
        }
    }

    /// Finalizes the chunk. Any voxels that were never pushed are empty.
    pub fn return_chunk(mut self) -> Chunk {
        self.voxels.resize(CHUNK_SIZE, VoxelMaterial::Empty);
        Chunk {
            position: self.position,
            voxels: self.voxels.into_boxed_slice(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walks_in_index_order() {
        let mut cci = ChunkCreationIterator::new(ChunkKey::new(1, 0, -1));
        assert_eq!(cci.next_local(), Some(Point3::new(0, 0, 0)));
        assert_eq!(cci.next_world(), Some(Point3::new(16, 0, -16)));
        for _ in 0..CHUNK_DIMENSION {
            cci.push_voxel(VoxelMaterial::Empty);
        }
        assert_eq!(cci.next_local(), Some(Point3::new(0, 1, 0)));
        for _ in CHUNK_DIMENSION..(CHUNK_DIMENSION * CHUNK_DIMENSION) {
            cci.push_voxel(VoxelMaterial::Empty);
        }
        assert_eq!(cci.next_local(), Some(Point3::new(0, 0, 1)));
    }

    #[test]
    fn partial_chunks_are_padded_with_air() {
        let mut cci = ChunkCreationIterator::new(ChunkKey::new(0, 0, 0));
        cci.push_voxel(VoxelMaterial::from_id(3));
        let chunk = cci.return_chunk();
        assert_eq!(chunk.voxels.len(), CHUNK_SIZE);
        assert_eq!(chunk.solid_count(), 1);
    }
}
