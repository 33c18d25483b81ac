#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::invalid_rust_codeblocks)]

//! # Voxel Chunk Engine
//!
//! A chunked voxel world with background mesh generation.
//!
//! The world is split into 16³ chunks. Chunks are generated from a pluggable terrain
//! function as a controller moves through the world, meshed into culled, ambient
//! occluded quads on a pool of worker threads, and handed to the host renderer as
//! plain vertex arrays.
//!
//! ## Key Modules
//!
//! * `engine_state` - The engine itself: configuration, streaming, meshing, task management and voxel data
//!
//! ## Architecture
//!
//! The engine follows a modular architecture with clear separation between:
//! * Voxel data (chunks, materials, terrain generators and the chunk store)
//! * Meshing (pure functions from an occupancy snapshot to geometry)
//! * Task scheduling and execution on worker threads
//! * Streaming, which decides which chunks are resident
//!
//! The host owns rendering. It calls [`EngineState::tick`] once per frame and applies
//! the drained removals and installs to its scene.
//!
//! ## Usage
//!
//! ```no_run
//! fn main() {
//!     voxel_chunk_engine::run();
//! }
//! ```

use std::time::Duration;

use cgmath::{Point3, Vector3};
use log::{error, info, warn};

pub mod engine_state;

pub use engine_state::config::EngineConfig;
pub use engine_state::error::{ConfigError, EngineError, MeshError, TerrainError};
pub use engine_state::rendering::meshing::{mesh_chunk, mesh_voxels, GeometryAttributes, MeshOptions};
pub use engine_state::streaming::StreamingManager;
pub use engine_state::voxels::block::block_side::BlockSide;
pub use engine_state::voxels::block::{MaterialId, VoxelMaterial};
pub use engine_state::voxels::chunk::{Chunk, ChunkKey};
pub use engine_state::voxels::raycast::RaycastHit;
pub use engine_state::voxels::terrain::{
    terrain_fn, EmptyTerrain, FlatTerrain, GlobalVariables, PerlinTerrain, RandomTerrain, TerrainGenerator,
};
pub use engine_state::voxels::world::ChunkMeshStatus;
pub use engine_state::{CompletedMesh, EngineState, StreamingUpdate};

/// Chunks the demo controller walks along +x.
const DEMO_WALK_CHUNKS: i32 = 6;
/// How long the demo waits for the mesh workers to catch up at each step.
const DEMO_SETTLE_TIMEOUT: Duration = Duration::from_secs(10);

/// Runs a headless demo: streams Perlin terrain around a controller walking along +x,
/// carves a tunnel in front of it and logs mesh statistics.
///
/// The first command line argument, if present, is a JSON configuration file.
pub fn run() {
    let mut log_builder = env_logger::Builder::new();
    log_builder
        .target(env_logger::Target::Stdout)
        .parse_env("RUST_LOG")
        .init();

    info!("Logger initialized");

    if let Err(err) = run_demo() {
        error!("Demo failed: {}", err);
    }
}

fn run_demo() -> Result<(), EngineError> {
    let config = match std::env::args().nth(1) {
        Some(path) => {
            info!("Loading configuration from {}", path);
            EngineConfig::from_json_file(path)?
        }
        None => EngineConfig::default(),
    };
    let mut engine = EngineState::new(config, Box::new(PerlinTerrain::default()))?;

    let mut total_faces = 0;
    for step in 0..DEMO_WALK_CHUNKS {
        let position = Point3::new(step as f64 * 16.0 + 8.0, 8.0, 8.0);
        let update = engine.observe_position(position);
        for key in &update.failed {
            warn!("Chunk {} could not be generated", key);
        }

        // Carve a small tunnel ahead of the controller.
        for dx in 0..4 {
            let target = position + Vector3::new(dx as f64, 0.0, 0.0);
            engine.set_voxel(target, VoxelMaterial::Empty)?;
        }
        if let Some(hit) = engine.raycast(position, Vector3::new(0.0, -1.0, 0.0), 64.0) {
            info!("Ground below step {} at {:?} ({:?})", step, hit.voxel, hit.material);
        }

        let faces = settle(&mut engine, DEMO_SETTLE_TIMEOUT);
        total_faces += faces;
        info!(
            "Step {}: {} chunks loaded, {} faces meshed, {} removed",
            step,
            engine.world().chunk_count(),
            faces,
            engine.drain_removed_meshes().len()
        );
    }

    info!("Demo finished, {} faces meshed in total", total_faces);
    engine.stop();
    Ok(())
}

/// Ticks until no mesh work is left or `timeout` passes. Returns the faces meshed.
fn settle(engine: &mut EngineState, timeout: Duration) -> usize {
    let deadline = web_time::Instant::now() + timeout;
    let mut faces = 0;
    loop {
        engine.wait_for_meshes(Duration::from_millis(50));
        faces += engine
            .drain_completed_meshes()
            .iter()
            .map(|mesh| mesh.geometry.face_count())
            .sum::<usize>();
        if !engine.is_busy() {
            return faces;
        }
        if web_time::Instant::now() >= deadline {
            warn!("{} meshes still pending after {:?}", engine.pending_mesh_count(), timeout);
            return faces;
        }
    }
}
