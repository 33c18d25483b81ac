//! # Engine State Module
//!
//! The core engine module that manages the state and functionality of the voxel engine.
//!
//! ## Key Components
//!
//! * `EngineState` - The main state container for the engine
//! * `config` - Runtime configuration
//! * `streaming` - Decides which chunks are resident around the controller
//! * `rendering` - Chunk meshing and the background mesh task
//! * `task_management` - Manages background tasks and worker threads
//! * `voxels` - Handles voxel data, chunks, terrain and the chunk store
//!
//! ## Architecture
//!
//! Everything runs on one control thread, driven by the host calling `tick()` once per
//! frame. Worker threads only ever see owned snapshots of chunk occupancy; every state
//! transition happens here, when their results are drained.
//!
//! ## Frame Flow
//!
//! 1. Completed meshes are drained from the worker pool and installed or discarded
//! 2. Chunks changed since the last frame are re-meshed (only while the host is active)
//! 3. Queued mesh jobs are handed to idle workers
//! 4. The host drains removals, then installs, and applies them to its scene
//!
//! ## Mesh Event Ordering
//!
//! A removal for a chunk purges any install for that chunk still waiting to be
//! drained, and a newer install replaces an older one. Hosts apply removals before
//! installs, and must tolerate removals for chunks they never received.

use std::time::Duration;

use cgmath::{Point3, Vector3};
use log::{debug, error, info, trace, warn};

use rendering::meshing::{GeometryAttributes, MeshOptions};
use rendering::tasks::chunk_mesh_generation_task::{ChunkMeshGenerationTask, ChunkMeshOutput};
use task_management::task::{CancelFlag, CompletedTask, Task};
use task_management::TaskManager;
use voxels::block::VoxelMaterial;
use voxels::chunk::index::{voxel_to_local, world_to_voxel_coord, CHUNK_DIMENSION};
use voxels::chunk::{Chunk, ChunkKey};
use voxels::raycast::{raycast, RaycastHit};
use voxels::terrain::{GlobalVariables, TerrainGenerator};
use voxels::world::{ChunkMeshStatus, InstallOutcome, World};

pub mod config;
pub mod error;
pub mod rendering;
pub mod streaming;
pub mod task_management;
pub mod voxels;

use config::EngineConfig;
use error::{EngineError, MeshError};
use streaming::StreamingManager;

/// The worker pool that meshes chunks.
pub type MeshWorkerPool = TaskManager<ChunkMeshGenerationTask>;

/// Name prefix of mesh worker threads.
const MESH_WORKER_NAME: &str = "mesh-worker";

/// A finished mesh, ready for the renderer.
#[derive(Clone, Debug)]
pub struct CompletedMesh {
    pub key: ChunkKey,
    pub geometry: GeometryAttributes,
    /// Translation to apply to the mesh, the world position of the chunk's origin.
    pub world_offset: [f32; 3],
    pub version: u64,
}

/// What a streaming pass did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StreamingUpdate {
    /// Chunks whose voxel data was created or restored.
    pub loaded: usize,
    /// Mesh jobs published.
    pub dispatched: usize,
    /// Chunks that left the resident set.
    pub evicted: usize,
    /// Chunks whose terrain generation failed; they are retried on the next pass.
    pub failed: Vec<ChunkKey>,
}

/// The main state container for the voxel engine.
///
/// One `EngineState` owns one world: chunk data, mesh state, the streaming box and the
/// mesh worker pool.
///
/// # Examples
///
/// ```no_run
/// use voxel_chunk_engine::{EngineConfig, EngineState, PerlinTerrain};
/// use cgmath::Point3;
///
/// let mut engine = EngineState::new(EngineConfig::default(), Box::new(PerlinTerrain::default()))?;
/// engine.observe_position(Point3::new(0.0, 0.0, 0.0));
///
/// // Main loop
/// for _frame in 0..600 {
///     engine.tick();
///     for _key in engine.drain_removed_meshes() {
///         // remove the chunk's mesh from the scene
///     }
///     for _mesh in engine.drain_completed_meshes() {
///         // upload mesh.geometry at mesh.world_offset
///     }
/// }
/// # Ok::<(), voxel_chunk_engine::EngineError>(())
/// ```
pub struct EngineState {
    config: EngineConfig,
    /// The voxel world containing all chunk data and mesh state
    world: World,
    streaming: StreamingManager,
    /// Task manager for background meshing
    task_manager: MeshWorkerPool,
    terrain: Box<dyn TerrainGenerator>,
    globals: GlobalVariables,
    /// Host activity probe; results arriving while it reports `false` are dropped
    is_active: Box<dyn Fn() -> bool>,
    /// Chunks mutated since the last frame, in order of first mutation
    changes: Vec<ChunkKey>,
    completed_meshes: Vec<CompletedMesh>,
    removed_meshes: Vec<ChunkKey>,
}

impl EngineState {
    /// Creates a new engine and starts its mesh workers.
    ///
    /// # Arguments
    /// * `config` - Engine configuration; validated before anything is started
    /// * `terrain` - Generator used for every chunk created from now on
    pub fn new(config: EngineConfig, terrain: Box<dyn TerrainGenerator>) -> Result<Self, EngineError> {
        config.validate()?;
        let task_manager = MeshWorkerPool::new(MESH_WORKER_NAME, config.worker_count)?;
        info!(
            "Engine started: {} workers, radius {}x{}, ambient occlusion {}",
            config.worker_count, config.horizontal_radius, config.vertical_radius, config.ambient_occlusion
        );

        Ok(EngineState {
            world: World::new(config.retained_chunk_capacity),
            streaming: StreamingManager::new(config.horizontal_radius, config.vertical_radius),
            task_manager,
            terrain,
            globals: GlobalVariables::new(),
            is_active: Box::new(|| true),
            changes: Vec::new(),
            completed_meshes: Vec::new(),
            removed_meshes: Vec::new(),
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Read access to the chunk store.
    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn streaming_center(&self) -> Option<ChunkKey> {
        self.streaming.center()
    }

    fn mesh_options(&self) -> MeshOptions {
        MeshOptions {
            ambient_occlusion: self.config.ambient_occlusion,
        }
    }

    /// Installs the probe that tells the engine whether its host is running.
    pub fn set_activity_probe(&mut self, probe: impl Fn() -> bool + 'static) {
        self.is_active = Box::new(probe);
    }

    fn host_active(&self) -> bool {
        (self.is_active)()
    }

    /// Replaces the terrain generator and refreshes the resident set.
    ///
    /// Chunks that already exist keep their voxels; only chunks created from now on
    /// use the new generator.
    pub fn set_terrain_generator(&mut self, terrain: Box<dyn TerrainGenerator>) -> StreamingUpdate {
        self.terrain = terrain;
        self.refresh_streaming()
    }

    /// Sets a global variable visible to the terrain generator.
    pub fn set_global_variable(&mut self, name: impl Into<String>, value: serde_json::Value) {
        self.globals.insert(name.into(), value);
    }

    pub fn global_variables(&self) -> &GlobalVariables {
        &self.globals
    }

    fn queue_change(&mut self, key: ChunkKey) {
        if !self.changes.contains(&key) {
            self.changes.push(key);
        }
    }

    /// Every chunk offset that touches the given chunk, the chunk itself excluded.
    fn neighbor_offsets() -> impl Iterator<Item = Vector3<i32>> {
        (-1..=1).flat_map(|dx| {
            (-1..=1).flat_map(move |dy| {
                (-1..=1)
                    .map(move |dz| Vector3::new(dx, dy, dz))
                    .filter(|o| *o != Vector3::new(0, 0, 0))
            })
        })
    }

    /// Makes sure the voxel data of `key` exists, restoring it from the retained cache
    /// or generating it.
    ///
    /// # Returns
    /// `EngineError::Terrain` if generation failed. Nothing is inserted in that case and
    /// the next call tries again.
    pub fn ensure_chunk_loaded(&mut self, key: ChunkKey) -> Result<(), EngineError> {
        if self.world.contains_chunk(key) {
            return Ok(());
        }

        let chunk = match self.world.take_retired(key) {
            Some(chunk) => {
                trace!("Restored retained chunk {}", key);
                chunk
            }
            None => Chunk::generate(key, self.terrain.as_ref(), &self.globals).map_err(|source| {
                warn!("Terrain generation failed for chunk {}: {}", key, source);
                EngineError::Terrain { key, source }
            })?,
        };
        self.world.insert_chunk(chunk);

        if self.config.cross_chunk_culling {
            for offset in Self::neighbor_offsets() {
                let neighbor = key.offset(offset);
                if self.world.mesh_status(neighbor) != ChunkMeshStatus::None {
                    self.queue_change(neighbor);
                }
            }
        }
        Ok(())
    }

    /// The loaded chunk at `key`, if any.
    pub fn chunk(&self, key: ChunkKey) -> Option<&Chunk> {
        self.world.get_chunk(key)
    }

    /// Material at a world position. Unloaded chunks read as empty.
    pub fn get_voxel(&self, position: Point3<f64>) -> VoxelMaterial {
        self.world.voxel_at(world_to_voxel_coord(position))
    }

    /// Writes a voxel, loading its chunk first if needed.
    ///
    /// The chunk is re-meshed on the next frame even if the material did not change.
    ///
    /// # Returns
    /// The key of the modified chunk.
    pub fn set_voxel(&mut self, position: Point3<f64>, material: VoxelMaterial) -> Result<ChunkKey, EngineError> {
        let voxel = world_to_voxel_coord(position);
        let key = ChunkKey::from_voxel(voxel);
        self.ensure_chunk_loaded(key)?;
        self.world.set_voxel(voxel, material);
        self.queue_change(key);

        if self.config.cross_chunk_culling {
            let local = voxel_to_local(voxel);
            let edge = |c: usize| -> (i32, i32) {
                (
                    if c == 0 { -1 } else { 0 },
                    if c == CHUNK_DIMENSION as usize - 1 { 1 } else { 0 },
                )
            };
            let (x, y, z) = (edge(local.x), edge(local.y), edge(local.z));
            for offset in Self::neighbor_offsets() {
                let touches = |o: i32, (low, high): (i32, i32)| o == 0 || o == low || o == high;
                if touches(offset.x, x) && touches(offset.y, y) && touches(offset.z, z) {
                    let neighbor = key.offset(offset);
                    if self.world.contains_chunk(neighbor)
                        && self.world.mesh_status(neighbor) != ChunkMeshStatus::None
                    {
                        self.queue_change(neighbor);
                    }
                }
            }
        }
        Ok(key)
    }

    /// Moves the streaming box to `center`. Does nothing if the center is unchanged.
    pub fn update_streaming(&mut self, center: ChunkKey) -> StreamingUpdate {
        match self.streaming.recenter(center) {
            Some(resident) => self.apply_resident_set(center, resident),
            None => StreamingUpdate::default(),
        }
    }

    /// Moves the streaming box to the chunk containing a world position.
    pub fn observe_position(&mut self, position: Point3<f64>) -> StreamingUpdate {
        self.update_streaming(ChunkKey::from_world(position))
    }

    /// Re-runs the current streaming pass, loading and meshing anything missing.
    pub fn refresh_streaming(&mut self) -> StreamingUpdate {
        match self.streaming.center() {
            Some(center) => {
                let resident = self.streaming.resident_set_around(center);
                self.apply_resident_set(center, resident)
            }
            None => StreamingUpdate::default(),
        }
    }

    fn apply_resident_set(&mut self, center: ChunkKey, resident: Vec<ChunkKey>) -> StreamingUpdate {
        let mut update = StreamingUpdate {
            evicted: self.evict_outside(center),
            ..StreamingUpdate::default()
        };

        // Load everything first so cross-chunk halos see the whole box.
        for &key in &resident {
            if self.world.contains_chunk(key) {
                continue;
            }
            match self.ensure_chunk_loaded(key) {
                Ok(()) => update.loaded += 1,
                Err(_) => update.failed.push(key),
            }
        }

        for &key in &resident {
            if self.world.contains_chunk(key) && self.world.mesh_status(key) == ChunkMeshStatus::None {
                if self.dispatch_mesh(key) {
                    update.dispatched += 1;
                }
            }
        }

        debug!(
            "Streaming around {}: {} loaded, {} dispatched, {} evicted, {} failed",
            center,
            update.loaded,
            update.dispatched,
            update.evicted,
            update.failed.len()
        );
        update
    }

    /// Evicts every chunk outside the box around `center`.
    fn evict_outside(&mut self, center: ChunkKey) -> usize {
        let meshed: Vec<ChunkKey> = self
            .world
            .mesh_records()
            .map(|(key, _)| *key)
            .filter(|key| !self.streaming.in_range(center, *key))
            .collect();
        for key in meshed {
            if let Some(record) = self.world.evict_mesh(key) {
                if record.displayed {
                    self.push_removal(key);
                }
                debug!("Evicted mesh of chunk {} ({:?})", key, record.status);
            }
        }

        let loaded: Vec<ChunkKey> = self
            .world
            .chunk_keys()
            .filter(|key| !self.streaming.in_range(center, *key))
            .collect();
        for &key in &loaded {
            self.world.retire_chunk(key);
        }
        self.changes.retain(|key| self.streaming.in_range(center, *key));
        loaded.len()
    }

    /// Publishes a mesh job for `key` with a fresh snapshot of its voxels.
    fn dispatch_mesh(&mut self, key: ChunkKey) -> bool {
        let Some(occupancy) = self.world.occupancy_for(key, self.config.cross_chunk_culling) else {
            return false;
        };
        let cancel = CancelFlag::new();
        let task = ChunkMeshGenerationTask::new(key, occupancy, self.mesh_options(), cancel.clone());
        let ticket = self.task_manager.publish_task(task);
        self.world.mark_pending(key, ticket, cancel);
        debug!("Dispatched mesh of chunk {} as version {}", key, ticket.version);
        true
    }

    fn push_removal(&mut self, key: ChunkKey) {
        self.completed_meshes.retain(|mesh| mesh.key != key);
        if !self.removed_meshes.contains(&key) {
            self.removed_meshes.push(key);
        }
    }

    fn push_install(&mut self, mesh: CompletedMesh) {
        self.completed_meshes.retain(|queued| queued.key != mesh.key);
        self.completed_meshes.push(mesh);
    }

    fn handle_completed(&mut self, done: CompletedTask<<ChunkMeshGenerationTask as Task>::Output>) {
        let ticket = done.ticket;
        let ChunkMeshOutput { key, result } = match done.output {
            Ok(output) => output,
            Err(panicked) => {
                error!("{}", panicked);
                if let Some(key) = self.world.key_for_ticket(ticket) {
                    self.world.reject_mesh(key);
                }
                return;
            }
        };

        if !self.world.is_in_flight(key, ticket) {
            trace!("Discarding result {} for chunk {}, no longer current", ticket.version, key);
            return;
        }

        let active = self.host_active();
        let retry = match result {
            Ok(_) if self.world.is_in_flight_cancelled(key) => {
                self.world.reject_mesh(key);
                true
            }
            Ok(geometry) if active => {
                match self.world.try_install(key, ticket) {
                    InstallOutcome::Installed { replaced } => {
                        debug!(
                            "Installed mesh of chunk {} v{} ({} faces, {:?}, replaced: {})",
                            key,
                            ticket.version,
                            geometry.face_count(),
                            done.elapsed,
                            replaced
                        );
                        self.push_install(CompletedMesh {
                            key,
                            world_offset: key.world_offset(),
                            version: ticket.version,
                            geometry,
                        });
                    }
                    InstallOutcome::Stale => {
                        trace!("Dropping stale mesh {} for chunk {}", ticket.version, key);
                    }
                }
                false
            }
            Ok(_) => {
                debug!("Host inactive, rejecting mesh of chunk {}", key);
                self.world.reject_mesh(key);
                true
            }
            Err(MeshError::Cancelled) => {
                self.world.reject_mesh(key);
                true
            }
            Err(err) => {
                error!("Failed to mesh chunk {}: {}", key, err);
                self.world.reject_mesh(key);
                false
            }
        };

        let dirty = self.world.mesh_record(key).is_some_and(|r| r.dirty);
        if (dirty || retry) && self.streaming.is_resident(key) {
            if dirty && active {
                self.dispatch_mesh(key);
            } else {
                self.queue_change(key);
            }
        }
    }

    /// Re-meshes every chunk changed since the last flush.
    fn flush_changes(&mut self) {
        for key in std::mem::take(&mut self.changes) {
            if !self.world.contains_chunk(key) || !self.streaming.is_resident(key) {
                continue;
            }
            if self.world.mesh_status(key) == ChunkMeshStatus::Pending {
                self.world.mark_dirty(key);
            } else {
                self.dispatch_mesh(key);
            }
        }
    }

    /// Advances the engine by one frame without blocking.
    ///
    /// # Returns
    /// The number of worker results processed.
    pub fn tick(&mut self) -> usize {
        let completed = self.task_manager.process_completed_tasks();
        self.after_completions(completed)
    }

    /// Like `tick`, but waits up to `timeout` for a worker result if none is ready.
    pub fn wait_for_meshes(&mut self, timeout: Duration) -> usize {
        let completed = self.task_manager.wait_for_completed_tasks(timeout);
        self.after_completions(completed)
    }

    fn after_completions(&mut self, completed: Vec<CompletedTask<ChunkMeshOutput>>) -> usize {
        let count = completed.len();
        for done in completed {
            self.handle_completed(done);
        }
        if self.host_active() {
            self.flush_changes();
        }
        self.task_manager.process_queued_tasks();
        count
    }

    /// Takes every mesh finished since the last call.
    pub fn drain_completed_meshes(&mut self) -> Vec<CompletedMesh> {
        std::mem::take(&mut self.completed_meshes)
    }

    /// Takes every chunk whose mesh must leave the scene since the last call.
    pub fn drain_removed_meshes(&mut self) -> Vec<ChunkKey> {
        std::mem::take(&mut self.removed_meshes)
    }

    pub fn mesh_status(&self, key: ChunkKey) -> ChunkMeshStatus {
        self.world.mesh_status(key)
    }

    /// Version of the mesh installed for `key`, if any.
    pub fn mesh_version(&self, key: ChunkKey) -> Option<u64> {
        self.world
            .mesh_record(key)
            .filter(|record| record.displayed)
            .map(|record| record.version)
    }

    pub fn pending_mesh_count(&self) -> usize {
        self.world.pending_mesh_count()
    }

    /// Whether any mesh work is outstanding: jobs in flight or changes not yet flushed.
    pub fn is_busy(&self) -> bool {
        self.pending_mesh_count() > 0 || !self.changes.is_empty()
    }

    /// Finds the first solid voxel along a ray, in world coordinates.
    pub fn raycast(
        &self,
        origin: Point3<f64>,
        direction: Vector3<f64>,
        max_distance: f64,
    ) -> Option<RaycastHit> {
        raycast(origin, direction, max_distance, |voxel| self.world.voxel_at(voxel))
    }

    /// Cancels every mesh job in flight.
    ///
    /// Chunks keep their displayed meshes. Cancelled chunks are re-meshed once the host
    /// is active again.
    pub fn stop(&mut self) {
        let dropped = self.task_manager.clear_queue();
        let cancelled = self.world.cancel_all_meshes();
        info!("Stopped: {} mesh jobs cancelled, {} never started", cancelled.len(), dropped);
        for key in cancelled {
            self.queue_change(key);
        }
    }

    /// Drops all voxel data, mesh state and pending changes.
    ///
    /// Removals are emitted for every displayed mesh. The next streaming call reloads
    /// the resident set from scratch.
    pub fn reset_chunks(&mut self) {
        self.task_manager.clear_queue();
        let displayed = self.world.clear();
        info!("Reset chunks, {} meshes removed", displayed.len());
        self.completed_meshes.clear();
        for key in displayed {
            self.push_removal(key);
        }
        self.changes.clear();
        self.streaming.clear_center();
    }
}
