//! # Block Module
//!
//! This module provides the voxel-level vocabulary of the engine: what a single voxel
//! holds (`VoxelMaterial`) and the six axis-aligned faces a voxel can expose (`BlockSide`).

use std::num::NonZeroU16;

use num_traits::FromPrimitive;

pub mod block_side;

/// The underlying integer type used to identify a material.
pub type MaterialId = u16;

/// The contents of a single voxel.
///
/// Id 0 is always empty space. Every other id is an opaque material; the id itself
/// only matters to the renderer, the mesher only cares whether a voxel occludes.
///
/// # Memory Layout
/// `Opaque` stores a `NonZeroU16`, so the enum keeps the size of a bare `u16`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum VoxelMaterial {
    /// Empty space (air).
    #[default]
    Empty,
    /// A solid, light-blocking material.
    Opaque(NonZeroU16),
}

impl VoxelMaterial {
    /// Converts a raw material id into a material. Id 0 maps to `Empty`.
    pub const fn from_id(id: MaterialId) -> Self {
        match NonZeroU16::new(id) {
            Some(id) => VoxelMaterial::Opaque(id),
            None => VoxelMaterial::Empty,
        }
    }

    /// Returns the raw material id, 0 for empty space.
    pub fn id(self) -> MaterialId {
        match self {
            VoxelMaterial::Empty => 0,
            VoxelMaterial::Opaque(id) => id.get(),
        }
    }

    /// Returns `true` for empty space.
    pub fn is_empty(self) -> bool {
        matches!(self, VoxelMaterial::Empty)
    }

    /// Returns `true` if the voxel hides the faces of its neighbours.
    pub fn is_opaque(self) -> bool {
        matches!(self, VoxelMaterial::Opaque(_))
    }
}

impl From<MaterialId> for VoxelMaterial {
    fn from(id: MaterialId) -> Self {
        VoxelMaterial::from_id(id)
    }
}

/// Scripted terrain hands back plain numbers; anything outside the id range is rejected.
impl FromPrimitive for VoxelMaterial {
    fn from_i64(n: i64) -> Option<Self> {
        MaterialId::try_from(n).ok().map(VoxelMaterial::from_id)
    }

    fn from_u64(n: u64) -> Option<Self> {
        MaterialId::try_from(n).ok().map(VoxelMaterial::from_id)
    }
}
