//! # Engine Errors
//!
//! Every fallible operation in the crate reports through one of the enums below.
//! `EngineError` is what the public `EngineState` API returns; the others are
//! wrapped into it with `?`.

use std::io;

use thiserror::Error;

use crate::engine_state::voxels::chunk::ChunkKey;

/// Failure reported by a terrain generator.
#[derive(Debug, Error)]
pub enum TerrainError {
    /// The generator itself failed (typically a script error).
    #[error("terrain generator failed: {0}")]
    Generator(String),

    /// The generator produced a value that is not a valid material id.
    #[error("terrain generator returned invalid material {0}")]
    InvalidMaterial(f64),
}

/// Failure while building a chunk mesh.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MeshError {
    /// The mesh would need more vertices than a `u16` index can address.
    #[error("mesh needs {vertices} vertices, more than u16 indices can address")]
    IndexOverflow { vertices: usize },

    /// The job's cancel flag was raised before meshing finished.
    #[error("mesh generation cancelled")]
    Cancelled,
}

/// Failure while loading an `EngineConfig`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level error type of the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to generate terrain for chunk {key}")]
    Terrain {
        key: ChunkKey,
        #[source]
        source: TerrainError,
    },

    #[error(transparent)]
    Mesh(#[from] MeshError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to spawn mesh worker: {0}")]
    WorkerSpawn(#[source] io::Error),
}
