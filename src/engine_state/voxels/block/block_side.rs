//! # Block Side Module
//!
//! This module defines the six faces of a voxel and how each one maps onto the
//! 3x3x3 neighbourhood bitmask the mesher works with.

use cgmath::Vector3;
use num_derive::FromPrimitive;

use crate::engine_state::voxels::chunk::index::neighbor_bit;

/// Represents the six possible faces of a voxel block.
///
/// The discriminant is `axis + 3` for the negative faces, so `[RIGHT, TOP, FRONT]`
/// face along +x, +y, +z and `[LEFT, BOTTOM, BACK]` along -x, -y, -z. The mesher
/// emits faces in exactly this order.
#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug, FromPrimitive)]
pub enum BlockSide {
    /// The face pointing towards +x
    RIGHT = 0,

    /// The face pointing towards +y
    TOP = 1,

    /// The face pointing towards +z
    FRONT = 2,

    /// The face pointing towards -x
    LEFT = 3,

    /// The face pointing towards -y
    BOTTOM = 4,

    /// The face pointing towards -z
    BACK = 5,
}

impl BlockSide {
    /// Returns all six faces in emission order: +x, +y, +z, -x, -y, -z.
    pub const fn all() -> [BlockSide; 6] {
        [
            BlockSide::RIGHT,
            BlockSide::TOP,
            BlockSide::FRONT,
            BlockSide::LEFT,
            BlockSide::BOTTOM,
            BlockSide::BACK,
        ]
    }

    /// The axis (0 = x, 1 = y, 2 = z) this face is perpendicular to.
    pub const fn axis(self) -> usize {
        self as usize % 3
    }

    /// Whether the face normal points along the positive axis.
    pub const fn is_positive(self) -> bool {
        (self as usize) < 3
    }

    /// The outward unit normal of the face.
    pub fn normal(self) -> Vector3<i32> {
        let sign = if self.is_positive() { 1 } else { -1 };
        let mut normal = Vector3::new(0, 0, 0);
        normal[self.axis()] = sign;
        normal
    }

    /// The bit of the 27-bit neighbourhood mask holding the voxel this face looks at.
    ///
    /// A face is culled whenever this bit is set.
    pub const fn neighbor_bit(self) -> u32 {
        let sign = if self.is_positive() { 1 } else { -1 };
        match self.axis() {
            0 => neighbor_bit(sign, 0, 0),
            1 => neighbor_bit(0, sign, 0),
            _ => neighbor_bit(0, 0, sign),
        }
    }

    /// Looks up the face that points along `axis` in the given direction.
    pub fn from_axis(axis: usize, positive: bool) -> Option<BlockSide> {
        if axis > 2 {
            return None;
        }
        num_traits::FromPrimitive::from_usize(if positive { axis } else { axis + 3 })
    }
}
