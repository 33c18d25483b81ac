//! # Engine Configuration
//!
//! `EngineConfig` gathers the knobs a host can turn without touching code. It is read
//! from JSON; any key that is missing falls back to its default.
//!
//! ```
//! use voxel_chunk_engine::EngineConfig;
//!
//! let config = EngineConfig::from_json_str(r#"{ "worker_count": 2 }"#).unwrap();
//! assert_eq!(config.worker_count, 2);
//! assert_eq!(config.horizontal_radius, 3);
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::ConfigError;

/// Runtime configuration of an `EngineState`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of mesh worker threads.
    pub worker_count: usize,
    /// Resident radius along x and z, in chunks.
    pub horizontal_radius: i32,
    /// Resident radius along y, in chunks.
    pub vertical_radius: i32,
    /// Whether meshes carry ambient-occlusion vertex colors.
    pub ambient_occlusion: bool,
    /// Whether faces on chunk borders are culled against loaded neighbour chunks.
    pub cross_chunk_culling: bool,
    /// How many evicted chunks keep their voxel data around. 0 disables retention.
    pub retained_chunk_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            worker_count: 4,
            horizontal_radius: 3,
            vertical_radius: 1,
            ambient_occlusion: true,
            cross_chunk_culling: false,
            retained_chunk_capacity: 256,
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Checks the values that would leave the engine unable to make progress.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worker_count == 0 {
            return Err(ConfigError::Invalid("worker_count must be at least 1".into()));
        }
        if self.horizontal_radius < 0 || self.vertical_radius < 0 {
            return Err(ConfigError::Invalid("streaming radii must not be negative".into()));
        }
        Ok(())
    }
}
