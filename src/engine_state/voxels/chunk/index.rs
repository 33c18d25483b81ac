//! # Voxel Index Module
//!
//! Pure coordinate arithmetic shared by every other part of the engine. Nothing in here
//! allocates or fails; every function is total over its input domain.
//!
//! ## Coordinate Spaces
//! - **World**: continuous `f64` coordinates, one unit per `VOXEL_WIDTH`
//! - **Voxel**: integer world voxel coordinates (`floor(world / VOXEL_WIDTH)`)
//! - **Chunk**: integer chunk coordinates (`voxel >> CHUNK_SIZE_BITS`)
//! - **Local**: `0..CHUNK_DIMENSION` coordinates inside a chunk
//! - **Index**: `(z << 2·bits) | (y << bits) | x`, x fastest

use cgmath::Point3;

/// Number of bits needed to address one axis of a chunk.
pub const CHUNK_SIZE_BITS: u32 = 4;
/// The dimension (width, height, depth) of a chunk in voxels.
pub const CHUNK_DIMENSION: i32 = 1 << CHUNK_SIZE_BITS;
/// The number of voxels in a single 2D plane of a chunk (CHUNK_DIMENSION²).
pub const CHUNK_PLANE_SIZE: i32 = CHUNK_DIMENSION * CHUNK_DIMENSION;
/// The total number of voxels in a chunk (CHUNK_DIMENSION³).
pub const CHUNK_SIZE: usize = (CHUNK_PLANE_SIZE * CHUNK_DIMENSION) as usize;
/// Width of a single voxel in world units.
pub const VOXEL_WIDTH: f64 = 1.0;
/// Width of a whole chunk in world units.
pub const CHUNK_WIDTH: f64 = VOXEL_WIDTH * CHUNK_DIMENSION as f64;

const LOCAL_MASK: usize = (CHUNK_DIMENSION - 1) as usize;

/// Flattens local chunk coordinates into an index into the voxel array.
///
/// Coordinates must be in `0..CHUNK_DIMENSION`; higher bits are masked off.
#[inline]
pub const fn voxel_index(x: usize, y: usize, z: usize) -> usize {
    ((z & LOCAL_MASK) << (2 * CHUNK_SIZE_BITS))
        | ((y & LOCAL_MASK) << CHUNK_SIZE_BITS)
        | (x & LOCAL_MASK)
}

/// Inverse of [`voxel_index`].
#[inline]
pub fn voxel_index_to_xyz(index: usize) -> Point3<usize> {
    Point3::new(
        index & LOCAL_MASK,
        (index >> CHUNK_SIZE_BITS) & LOCAL_MASK,
        (index >> (2 * CHUNK_SIZE_BITS)) & LOCAL_MASK,
    )
}

/// Converts a world position to the integer voxel containing it.
pub fn world_to_voxel_coord(world: Point3<f64>) -> Point3<i32> {
    world.map(|c| (c / VOXEL_WIDTH).floor() as i32)
}

/// Converts integer voxel coordinates to the coordinates of the chunk containing them.
#[inline]
pub fn voxel_to_chunk_coord(voxel: Point3<i32>) -> Point3<i32> {
    voxel.map(|c| c >> CHUNK_SIZE_BITS)
}

/// Wraps integer voxel coordinates into `0..CHUNK_DIMENSION`, negatives included.
#[inline]
pub fn voxel_to_local(voxel: Point3<i32>) -> Point3<usize> {
    voxel.map(|c| c.rem_euclid(CHUNK_DIMENSION) as usize)
}

/// Converts a world position to the coordinates of the chunk containing it.
pub fn world_to_chunk_coord(world: Point3<f64>) -> Point3<i32> {
    voxel_to_chunk_coord(world_to_voxel_coord(world))
}

/// Converts a world position to local voxel coordinates within its chunk.
pub fn world_to_local_voxel(world: Point3<f64>) -> Point3<usize> {
    voxel_to_local(world_to_voxel_coord(world))
}

/// World-space position of a chunk's minimum corner.
pub fn chunk_coord_to_world(chunk: Point3<i32>) -> Point3<f64> {
    chunk.map(|c| c as f64 * CHUNK_WIDTH)
}

/// Bit of the 27-bit neighbourhood mask that holds the cell at offset `(dx, dy, dz)`.
///
/// Offsets are in `-1..=1`; the voxel itself lives at bit 13.
#[inline]
pub const fn neighbor_bit(dx: i32, dy: i32, dz: i32) -> u32 {
    (9 * (dx + 1) + 3 * (dy + 1) + (dz + 1)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_round_trips() {
        for i in 0..CHUNK_SIZE {
            let p = voxel_index_to_xyz(i);
            assert_eq!(voxel_index(p.x, p.y, p.z), i);
        }
    }

    #[test]
    fn x_is_fastest_axis() {
        assert_eq!(voxel_index(1, 0, 0), 1);
        assert_eq!(voxel_index(0, 1, 0), 16);
        assert_eq!(voxel_index(0, 0, 1), 256);
        assert_eq!(voxel_index(15, 15, 15), CHUNK_SIZE - 1);
    }

    #[test]
    fn negative_world_positions_wrap() {
        let world = Point3::new(-0.5, -16.0, -17.25);
        assert_eq!(world_to_voxel_coord(world), Point3::new(-1, -16, -18));
        assert_eq!(world_to_chunk_coord(world), Point3::new(-1, -1, -2));
        assert_eq!(world_to_local_voxel(world), Point3::new(15, 0, 14));
    }

    #[test]
    fn chunk_origin_maps_back() {
        let origin = chunk_coord_to_world(Point3::new(2, -1, 0));
        assert_eq!(origin, Point3::new(32.0, -16.0, 0.0));
        assert_eq!(world_to_chunk_coord(origin), Point3::new(2, -1, 0));
    }

    #[test]
    fn neighbourhood_bits() {
        assert_eq!(neighbor_bit(-1, -1, -1), 0);
        assert_eq!(neighbor_bit(0, 0, 0), 13);
        assert_eq!(neighbor_bit(1, 1, 1), 26);
    }
}
