use std::fmt;
use std::str::FromStr;

use cgmath::{Point3, Vector3};
use thiserror::Error;

use super::index::{chunk_coord_to_world, voxel_to_chunk_coord, world_to_chunk_coord};

/// Identifies a chunk by its chunk coordinates.
///
/// The canonical string form is `"x,y,z"`, which is what hosts use when they key
/// rendered meshes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ChunkKey(pub Point3<i32>);

/// Raised when a string is not of the form `"x,y,z"`.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid chunk key {0:?}, expected \"x,y,z\"")]
pub struct ChunkKeyParseError(pub String);

impl ChunkKey {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        ChunkKey(Point3::new(x, y, z))
    }

    /// The chunk containing the given world position.
    pub fn from_world(world: Point3<f64>) -> Self {
        ChunkKey(world_to_chunk_coord(world))
    }

    /// The chunk containing the given integer voxel coordinates.
    pub fn from_voxel(voxel: Point3<i32>) -> Self {
        ChunkKey(voxel_to_chunk_coord(voxel))
    }

    pub fn offset(self, delta: Vector3<i32>) -> Self {
        ChunkKey(self.0 + delta)
    }

    /// World-space position of the chunk's minimum corner.
    pub fn world_origin(self) -> Point3<f64> {
        chunk_coord_to_world(self.0)
    }

    /// The translation a renderer applies to this chunk's mesh.
    pub fn world_offset(self) -> [f32; 3] {
        let origin = self.world_origin();
        [origin.x as f32, origin.y as f32, origin.z as f32]
    }
}

impl From<Point3<i32>> for ChunkKey {
    fn from(position: Point3<i32>) -> Self {
        ChunkKey(position)
    }
}

impl fmt::Display for ChunkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.0.x, self.0.y, self.0.z)
    }
}

impl FromStr for ChunkKey {
    type Err = ChunkKeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ChunkKeyParseError(s.to_owned());
        let mut parts = s.split(',').map(|part| part.trim().parse::<i32>());
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(Ok(x)), Some(Ok(y)), Some(Ok(z)), None) => Ok(ChunkKey::new(x, y, z)),
            _ => Err(invalid()),
        }
    }
}
