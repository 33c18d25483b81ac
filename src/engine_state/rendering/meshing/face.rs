//! Static per-face geometry: corner positions, texture coordinates and the cells that
//! darken each corner when ambient occlusion is on.

use crate::engine_state::voxels::{block::block_side::BlockSide, chunk::index::neighbor_bit};

/// Half the width of a voxel.
const H: f32 = 0.5;

const THIRD: f32 = 1.0 / 3.0;

/// Texture coordinates of the bottom band `[0, 1/3]` of the block atlas.
const BOTTOM_UVS: [f32; 8] = [0.0, 0.0, 1.0, THIRD, 0.0, THIRD, 1.0, 0.0];

/// The same band shifted up by one third, used by the four side faces.
const SIDE_UVS: [f32; 8] = [0.0, THIRD, 1.0, 2.0 * THIRD, 0.0, 2.0 * THIRD, 1.0, THIRD];
/// The top band `[2/3, 1]`.
const TOP_UVS: [f32; 8] = [0.0, 2.0 * THIRD, 1.0, 1.0, 0.0, 1.0, 1.0, 2.0 * THIRD];

/// Geometry of one face of a unit voxel centred on the origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceGeometry {
    pub side: BlockSide,
    /// Corner signs; the vertex position is `center + H * corner`.
    pub corners: [[i8; 3]; 4],
    pub uvs: [f32; 8],
    /// Neighbourhood bits that shade each corner.
    pub occluders: [u32; 4],
}

/// The three cells of the outward layer that touch a corner: one along each tangent
/// and the diagonal between them.
const fn occluder_mask(side: BlockSide, corner: [i8; 3]) -> u32 {
    let axis = side.axis();
    let outward = if side.is_positive() { 1 } else { -1 };
    let t1 = (axis + 1) % 3;
    let t2 = (axis + 2) % 3;

    let mut along_t1 = [0i32; 3];
    along_t1[axis] = outward;
    along_t1[t1] = corner[t1] as i32;

    let mut along_t2 = [0i32; 3];
    along_t2[axis] = outward;
    along_t2[t2] = corner[t2] as i32;

    let mut diagonal = [0i32; 3];
    diagonal[axis] = outward;
    diagonal[t1] = corner[t1] as i32;
    diagonal[t2] = corner[t2] as i32;

    (1 << neighbor_bit(along_t1[0], along_t1[1], along_t1[2]))
        | (1 << neighbor_bit(along_t2[0], along_t2[1], along_t2[2]))
        | (1 << neighbor_bit(diagonal[0], diagonal[1], diagonal[2]))
}

impl FaceGeometry {
    const fn new(side: BlockSide, corners: [[i8; 3]; 4], uvs: [f32; 8]) -> Self {
        FaceGeometry {
            side,
            corners,
            uvs,
            occluders: [
                occluder_mask(side, corners[0]),
                occluder_mask(side, corners[1]),
                occluder_mask(side, corners[2]),
                occluder_mask(side, corners[3]),
            ],
        }
    }

    /// Looks up the geometry of a face.
    pub fn of(side: BlockSide) -> &'static FaceGeometry {
        &FACES[side as usize]
    }

    /// Writes the four corner positions of this face around `center`.
    pub fn positions(&self, center: [f32; 3]) -> [f32; 12] {
        let mut out = [0.0; 12];
        for (v, corner) in self.corners.iter().enumerate() {
            for axis in 0..3 {
                out[v * 3 + axis] = center[axis] + H * corner[axis] as f32;
            }
        }
        out
    }

    /// The 4-bit shading pattern for this face given the voxel's neighbourhood mask.
    ///
    /// Bit `j` is set (lit) when none of corner `j`'s occluders is solid. Faces on the
    /// negative side of an axis are always fully dark.
    pub fn occlusion_pattern(&self, mask: u32) -> usize {
        if !self.side.is_positive() {
            return 0;
        }
        self.occluders
            .iter()
            .enumerate()
            .fold(0, |pattern, (j, occluders)| {
                pattern | (usize::from(mask & occluders == 0) << j)
            })
    }
}

/// Face geometry indexed by `BlockSide as usize`.
pub static FACES: [FaceGeometry; 6] = [
    FaceGeometry::new(
        BlockSide::RIGHT,
        [[1, -1, 1], [1, 1, -1], [1, 1, 1], [1, -1, -1]],
        SIDE_UVS,
    ),
    FaceGeometry::new(
        BlockSide::TOP,
        [[-1, 1, -1], [1, 1, 1], [1, 1, -1], [-1, 1, 1]],
        TOP_UVS,
    ),
    FaceGeometry::new(
        BlockSide::FRONT,
        [[-1, -1, 1], [1, 1, 1], [-1, 1, 1], [1, -1, 1]],
        SIDE_UVS,
    ),
    FaceGeometry::new(
        BlockSide::LEFT,
        [[-1, -1, -1], [-1, 1, 1], [-1, 1, -1], [-1, -1, 1]],
        SIDE_UVS,
    ),
    FaceGeometry::new(
        BlockSide::BOTTOM,
        [[-1, -1, -1], [1, -1, 1], [-1, -1, 1], [1, -1, -1]],
        BOTTOM_UVS,
    ),
    FaceGeometry::new(
        BlockSide::BACK,
        [[1, -1, -1], [-1, 1, -1], [1, 1, -1], [-1, -1, -1]],
        SIDE_UVS,
    ),
];
