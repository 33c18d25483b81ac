//! # Terrain Generation
//!
//! Chunks are filled by calling a `TerrainGenerator` once per voxel, in index order,
//! the first time a chunk is needed. Hosts usually install a scripted generator via
//! [`terrain_fn`]; the built-in generators cover demos, tests and benchmarks.
//!
//! ## Available Generators
//! - [`PerlinTerrain`]: 3D Perlin noise with caves and overhangs
//! - [`FlatTerrain`]: solid below a fixed height
//! - [`RandomTerrain`]: seeded white noise
//! - [`EmptyTerrain`]: nothing but air

use cgmath::Point3;
use noise::{NoiseFn, Perlin};
use num_traits::FromPrimitive;

use crate::engine_state::error::TerrainError;
use crate::engine_state::voxels::block::VoxelMaterial;

/// Global script variables handed to every generator call.
pub type GlobalVariables = serde_json::Map<String, serde_json::Value>;

/// Threshold above which Perlin noise is considered solid.
pub const PERLIN_POSITIVE_THRESHOLD: f64 = 0.2;
/// Threshold below which Perlin noise is considered solid.
pub const PERLIN_NEGATIVE_THRESHOLD: f64 = -0.2;
/// Scaling factor applied to world coordinates when sampling Perlin noise.
pub const PERLIN_SCALE_FACTOR: f64 = 0.02;

/// Produces the material of a voxel from its integer world position.
pub trait TerrainGenerator {
    fn generate(
        &self,
        globals: &GlobalVariables,
        position: Point3<i32>,
    ) -> Result<VoxelMaterial, TerrainError>;
}

/// Converts a number coming back from a script into a material.
///
/// Only whole numbers in the material id range are accepted.
pub fn material_from_script_value(value: f64) -> Result<VoxelMaterial, TerrainError> {
    if value.fract() != 0.0 {
        return Err(TerrainError::InvalidMaterial(value));
    }
    VoxelMaterial::from_f64(value).ok_or(TerrainError::InvalidMaterial(value))
}

/// Adapter that turns a closure into a `TerrainGenerator`.
pub struct TerrainFn<F>(F);

/// Wraps a closure as a terrain generator.
pub fn terrain_fn<F>(f: F) -> TerrainFn<F>
where
    F: Fn(&GlobalVariables, Point3<i32>) -> Result<VoxelMaterial, TerrainError>,
{
    TerrainFn(f)
}

impl<F> TerrainGenerator for TerrainFn<F>
where
    F: Fn(&GlobalVariables, Point3<i32>) -> Result<VoxelMaterial, TerrainError>,
{
    fn generate(
        &self,
        globals: &GlobalVariables,
        position: Point3<i32>,
    ) -> Result<VoxelMaterial, TerrainError> {
        (self.0)(globals, position)
    }
}

/// Natural-looking terrain from 3D Perlin noise.
///
/// A voxel is solid wherever the noise leaves the `[-0.2, 0.2]` band, which carves
/// long tunnels through otherwise solid ground.
pub struct PerlinTerrain {
    perlin: Perlin,
    scale: f64,
    material: VoxelMaterial,
}

impl PerlinTerrain {
    pub fn new(seed: u32, material: VoxelMaterial) -> Self {
        PerlinTerrain {
            perlin: Perlin::new(seed),
            scale: PERLIN_SCALE_FACTOR,
            material,
        }
    }

    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    fn to_perlin_pos(&self, pos: Point3<i32>) -> [f64; 3] {
        [
            pos.x as f64 * self.scale,
            pos.y as f64 * self.scale,
            pos.z as f64 * self.scale,
        ]
    }
}

impl Default for PerlinTerrain {
    fn default() -> Self {
        PerlinTerrain::new(0, VoxelMaterial::from_id(1))
    }
}

impl TerrainGenerator for PerlinTerrain {
    fn generate(
        &self,
        _globals: &GlobalVariables,
        position: Point3<i32>,
    ) -> Result<VoxelMaterial, TerrainError> {
        let sample = self.perlin.get(self.to_perlin_pos(position));
        if (PERLIN_NEGATIVE_THRESHOLD..=PERLIN_POSITIVE_THRESHOLD).contains(&sample) {
            Ok(VoxelMaterial::Empty)
        } else {
            Ok(self.material)
        }
    }
}

/// Solid ground below `height`, air above.
pub struct FlatTerrain {
    pub height: i32,
    pub material: VoxelMaterial,
}

impl TerrainGenerator for FlatTerrain {
    fn generate(
        &self,
        _globals: &GlobalVariables,
        position: Point3<i32>,
    ) -> Result<VoxelMaterial, TerrainError> {
        if position.y < self.height {
            Ok(self.material)
        } else {
            Ok(VoxelMaterial::Empty)
        }
    }
}

/// A world with no solid voxels at all.
pub struct EmptyTerrain;

impl TerrainGenerator for EmptyTerrain {
    fn generate(
        &self,
        _globals: &GlobalVariables,
        _position: Point3<i32>,
    ) -> Result<VoxelMaterial, TerrainError> {
        Ok(VoxelMaterial::Empty)
    }
}

/// Seeded white noise. Each position always gets the same material for a given seed.
pub struct RandomTerrain {
    pub seed: u64,
    /// Probability that a voxel stays empty.
    pub sparseness: f64,
    pub material: VoxelMaterial,
}

impl TerrainGenerator for RandomTerrain {
    fn generate(
        &self,
        _globals: &GlobalVariables,
        position: Point3<i32>,
    ) -> Result<VoxelMaterial, TerrainError> {
        let mixed = (position.x as u32 as u64)
            .wrapping_mul(0x9E37_79B9_7F4A_7C15)
            ^ (position.y as u32 as u64).wrapping_mul(0xC2B2_AE3D_27D4_EB4F)
            ^ (position.z as u32 as u64).wrapping_mul(0x1656_67B1_9E37_79F9);
        let mut rng = fastrand::Rng::with_seed(self.seed ^ mixed);
        if rng.f64() < self.sparseness {
            Ok(VoxelMaterial::Empty)
        } else {
            Ok(self.material)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn globals() -> GlobalVariables {
        GlobalVariables::new()
    }

    #[test]
    fn flat_terrain_splits_at_height() {
        let flat = FlatTerrain {
            height: 0,
            material: VoxelMaterial::from_id(2),
        };
        assert!(flat.generate(&globals(), Point3::new(5, -1, 5)).unwrap().is_opaque());
        assert!(flat.generate(&globals(), Point3::new(5, 0, 5)).unwrap().is_empty());
    }

    #[test]
    fn random_terrain_is_deterministic() {
        let random = RandomTerrain {
            seed: 42,
            sparseness: 0.5,
            material: VoxelMaterial::from_id(1),
        };
        for x in -8..8 {
            let p = Point3::new(x, x * 3, -x);
            assert_eq!(
                random.generate(&globals(), p).unwrap(),
                random.generate(&globals(), p).unwrap()
            );
        }
    }

    #[test]
    fn perlin_origin_is_empty() {
        // Perlin noise is zero on integer lattice points.
        let perlin = PerlinTerrain::default();
        assert!(perlin.generate(&globals(), Point3::new(0, 0, 0)).unwrap().is_empty());
    }

    #[test]
    fn closures_see_globals() {
        let generator = terrain_fn(|globals: &GlobalVariables, p: Point3<i32>| {
            let ground = globals.get("ground").and_then(|v| v.as_i64()).unwrap_or(0);
            Ok(VoxelMaterial::from_id(u16::from(i64::from(p.y) < ground)))
        });
        let mut globals = globals();
        globals.insert("ground".into(), serde_json::json!(4));
        assert!(generator.generate(&globals, Point3::new(0, 3, 0)).unwrap().is_opaque());
        assert!(generator.generate(&globals, Point3::new(0, 4, 0)).unwrap().is_empty());
    }

    #[test]
    fn script_values_must_be_whole_ids() {
        assert_eq!(material_from_script_value(3.0).unwrap(), VoxelMaterial::from_id(3));
        assert!(material_from_script_value(0.5).is_err());
        assert!(material_from_script_value(-2.0).is_err());
        assert!(material_from_script_value(70000.0).is_err());
    }
}
