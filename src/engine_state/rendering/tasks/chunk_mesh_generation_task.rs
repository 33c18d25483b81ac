//! Task for generating mesh data for chunks in a background thread.
//!
//! This module contains the `ChunkMeshGenerationTask` which is responsible for
//! turning a snapshot of a chunk's occupancy into geometry on a worker thread. This
//! keeps the control thread responsive while meshing runs.

use crate::engine_state::{
    error::MeshError,
    rendering::meshing::{mesh_chunk, GeometryAttributes, MeshOptions},
    task_management::task::{CancelFlag, Task},
    voxels::chunk::{neighborhood::ChunkOccupancy, ChunkKey},
};

/// A task that meshes one chunk in a background thread.
///
/// The task owns a copy of everything it reads, so the chunk can keep changing on
/// the control thread while the worker runs.
pub struct ChunkMeshGenerationTask {
    /// The chunk being meshed
    key: ChunkKey,
    /// Snapshot of the chunk's solidity, halo included
    occupancy: ChunkOccupancy,
    options: MeshOptions,
    /// Raised by the control thread when the result is no longer wanted
    cancel: CancelFlag,
}

impl ChunkMeshGenerationTask {
    /// Creates a new chunk mesh generation task.
    ///
    /// # Arguments
    /// * `key` - The chunk being meshed
    /// * `occupancy` - Solidity snapshot taken on the control thread
    /// * `options` - Mesh options
    /// * `cancel` - Flag shared with the control thread
    pub fn new(
        key: ChunkKey,
        occupancy: ChunkOccupancy,
        options: MeshOptions,
        cancel: CancelFlag,
    ) -> Self {
        ChunkMeshGenerationTask {
            key,
            occupancy,
            options,
            cancel,
        }
    }
}

/// The result of a chunk mesh generation task.
#[derive(Debug)]
pub struct ChunkMeshOutput {
    pub key: ChunkKey,
    pub result: Result<GeometryAttributes, MeshError>,
}

impl Task for ChunkMeshGenerationTask {
    type Output = ChunkMeshOutput;

    /// Checks the cancel flag, then meshes the chunk.
    fn process(self) -> ChunkMeshOutput {
        let result = if self.cancel.is_cancelled() {
            Err(MeshError::Cancelled)
        } else {
            mesh_chunk(&self.occupancy, self.options, Some(&self.cancel))
        };
        ChunkMeshOutput {
            key: self.key,
            result,
        }
    }
}
