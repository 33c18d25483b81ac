//! # Chunk Neighbourhood
//!
//! The mesher only needs to know which voxels are solid. `ChunkOccupancy` stores that
//! as one bit per voxel over a padded `(CHUNK_DIMENSION + 2)³` grid: the chunk itself
//! plus a one-voxel halo borrowed from the 26 surrounding chunks. Lookups at the chunk
//! border therefore never branch on chunk boundaries.
//!
//! With an empty halo the mesh of a chunk depends on that chunk alone.

use bitvec::prelude::BitVec;
use cgmath::Vector3;

use crate::engine_state::voxels::block::VoxelMaterial;

use super::index::{neighbor_bit, voxel_index, CHUNK_DIMENSION, CHUNK_SIZE};
use super::Chunk;

/// The dimension of a chunk including an extra layer of voxels on each side.
pub const CHUNK_DIMENSION_WRAPPED: usize = (CHUNK_DIMENSION + 2) as usize;
/// The number of voxels in a wrapped 2D chunk plane.
pub const CHUNK_PLANE_SIZE_WRAPPED: usize = CHUNK_DIMENSION_WRAPPED * CHUNK_DIMENSION_WRAPPED;
/// The total number of voxels in a wrapped chunk.
pub const CHUNK_SIZE_WRAPPED: usize = CHUNK_PLANE_SIZE_WRAPPED * CHUNK_DIMENSION_WRAPPED;

/// Solidity of a chunk and its one-voxel halo.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChunkOccupancy {
    solid_array: BitVec,
}

#[inline]
fn wrapped_index(x: i32, y: i32, z: i32) -> usize {
    (x + 1) as usize
        + CHUNK_DIMENSION_WRAPPED * (y + 1) as usize
        + CHUNK_PLANE_SIZE_WRAPPED * (z + 1) as usize
}

/// -1, 0 or 1 depending on which side of the chunk a halo coordinate falls.
#[inline]
fn chunk_side(c: i32) -> i32 {
    if c < 0 {
        -1
    } else if c >= CHUNK_DIMENSION {
        1
    } else {
        0
    }
}

impl ChunkOccupancy {
    /// An all-empty grid.
    pub fn empty() -> Self {
        let mut solid_array = BitVec::with_capacity(CHUNK_SIZE_WRAPPED);
        solid_array.resize(CHUNK_SIZE_WRAPPED, false);
        ChunkOccupancy { solid_array }
    }

    /// Occupancy of a bare voxel array with an empty halo.
    ///
    /// Arrays shorter than `CHUNK_SIZE` are treated as empty past their end.
    pub fn from_voxels(voxels: &[VoxelMaterial]) -> Self {
        let mut occupancy = Self::empty();
        for z in 0..CHUNK_DIMENSION {
            for y in 0..CHUNK_DIMENSION {
                for x in 0..CHUNK_DIMENSION {
                    let index = voxel_index(x as usize, y as usize, z as usize);
                    if voxels.get(index).is_some_and(|v| v.is_opaque()) {
                        occupancy.solid_array.set(wrapped_index(x, y, z), true);
                    }
                }
            }
        }
        occupancy
    }

    /// Occupancy of `chunk` with the halo filled from whichever neighbours `neighbor`
    /// returns. Missing neighbours leave their part of the halo empty.
    ///
    /// # Arguments
    /// * `chunk` - The chunk to be meshed
    /// * `neighbor` - Looks up the chunk at a given offset (each component in `-1..=1`)
    pub fn with_neighbors<'a, F>(chunk: &Chunk, neighbor: F) -> Self
    where
        F: Fn(Vector3<i32>) -> Option<&'a Chunk>,
    {
        let mut occupancy = Self::from_voxels(&chunk.voxels);

        let mut neighbors: [Option<&'a Chunk>; 27] = [None; 27];
        for dz in -1..=1 {
            for dy in -1..=1 {
                for dx in -1..=1 {
                    if (dx, dy, dz) != (0, 0, 0) {
                        neighbors[neighbor_bit(dx, dy, dz) as usize] =
                            neighbor(Vector3::new(dx, dy, dz));
                    }
                }
            }
        }
        if neighbors.iter().all(Option::is_none) {
            return occupancy;
        }

        for z in -1..=CHUNK_DIMENSION {
            for y in -1..=CHUNK_DIMENSION {
                for x in -1..=CHUNK_DIMENSION {
                    let (sx, sy, sz) = (chunk_side(x), chunk_side(y), chunk_side(z));
                    if (sx, sy, sz) == (0, 0, 0) {
                        continue;
                    }
                    let Some(other) = neighbors[neighbor_bit(sx, sy, sz) as usize] else {
                        continue;
                    };
                    let index = voxel_index(
                        x.rem_euclid(CHUNK_DIMENSION) as usize,
                        y.rem_euclid(CHUNK_DIMENSION) as usize,
                        z.rem_euclid(CHUNK_DIMENSION) as usize,
                    );
                    if other.voxels[index].is_opaque() {
                        occupancy.solid_array.set(wrapped_index(x, y, z), true);
                    }
                }
            }
        }
        occupancy
    }

    /// Whether the voxel at `(x, y, z)` is solid. Coordinates range over `-1..=CHUNK_DIMENSION`.
    #[inline]
    pub fn is_solid(&self, x: i32, y: i32, z: i32) -> bool {
        self.solid_array[wrapped_index(x, y, z)]
    }

    /// Builds the full 27-bit neighbourhood mask of the voxel at `(x, y, z)`.
    pub fn neighborhood_mask(&self, x: i32, y: i32, z: i32) -> u32 {
        let mut mask = 0;
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    if self.is_solid(x + dx, y + dy, z + dz) {
                        mask |= 1 << neighbor_bit(dx, dy, dz);
                    }
                }
            }
        }
        mask
    }

    /// The nine bits of the `x + 1` plane, already shifted into their mask positions.
    ///
    /// `(previous >> 9) | leading_plane_mask(x, y, z)` is the mask of `(x, y, z)` when
    /// `previous` is the mask of `(x - 1, y, z)`.
    pub fn leading_plane_mask(&self, x: i32, y: i32, z: i32) -> u32 {
        let mut mask = 0;
        for dy in -1..=1 {
            for dz in -1..=1 {
                if self.is_solid(x + 1, y + dy, z + dz) {
                    mask |= 1 << neighbor_bit(1, dy, dz);
                }
            }
        }
        mask
    }

    /// Number of solid voxels inside the chunk, halo excluded.
    pub fn interior_solid_count(&self) -> usize {
        let mut count = 0;
        for z in 0..CHUNK_DIMENSION {
            for y in 0..CHUNK_DIMENSION {
                for x in 0..CHUNK_DIMENSION {
                    count += usize::from(self.is_solid(x, y, z));
                }
            }
        }
        count
    }
}
