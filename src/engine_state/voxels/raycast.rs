//! Grid traversal (DDA) for picking the voxel a ray looks at.

use cgmath::{InnerSpace, Point3, Vector3};

use super::block::block_side::BlockSide;
use super::block::VoxelMaterial;
use super::chunk::index::{world_to_voxel_coord, VOXEL_WIDTH};

/// The first solid voxel along a ray.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RaycastHit {
    /// The solid voxel that was hit (the replacement target).
    pub voxel: Point3<i32>,
    /// The last empty voxel before the hit (the placement target).
    pub placement: Point3<i32>,
    /// The face of `voxel` the ray entered through; `None` if the ray started inside it.
    pub face: Option<BlockSide>,
    pub material: VoxelMaterial,
    /// Distance from the origin to the entry point, in world units.
    pub distance: f64,
}

/// Walks the voxel grid from `origin` along `direction` until `material_at` returns an
/// opaque voxel or `max_distance` is exceeded.
pub fn raycast<F>(
    origin: Point3<f64>,
    direction: Vector3<f64>,
    max_distance: f64,
    material_at: F,
) -> Option<RaycastHit>
where
    F: Fn(Point3<i32>) -> VoxelMaterial,
{
    if direction.magnitude2() == 0.0 || !max_distance.is_finite() {
        return None;
    }
    let dir = direction.normalize();

    let mut voxel = world_to_voxel_coord(origin);
    let mut placement = voxel;
    let mut face = None;
    let mut distance = 0.0;

    let mut step = [0i32; 3];
    let mut t_delta = [f64::INFINITY; 3];
    let mut t_max = [f64::INFINITY; 3];
    for axis in 0..3 {
        if dir[axis] == 0.0 {
            continue;
        }
        step[axis] = if dir[axis] > 0.0 { 1 } else { -1 };
        t_delta[axis] = VOXEL_WIDTH / dir[axis].abs();
        let boundary = if dir[axis] > 0.0 {
            (voxel[axis] + 1) as f64 * VOXEL_WIDTH
        } else {
            voxel[axis] as f64 * VOXEL_WIDTH
        };
        t_max[axis] = (boundary - origin[axis]) / dir[axis];
    }

    while distance <= max_distance {
        let material = material_at(voxel);
        if material.is_opaque() {
            return Some(RaycastHit {
                voxel,
                placement,
                face,
                material,
                distance,
            });
        }

        let axis = if t_max[0] < t_max[1] {
            if t_max[0] < t_max[2] { 0 } else { 2 }
        } else if t_max[1] < t_max[2] {
            1
        } else {
            2
        };
        if !t_max[axis].is_finite() {
            return None;
        }

        placement = voxel;
        distance = t_max[axis];
        voxel[axis] += step[axis];
        t_max[axis] += t_delta[axis];
        face = BlockSide::from_axis(axis, step[axis] < 0);
    }
    None
}
