//! # World Module
//!
//! This module provides the `World` struct, the chunk store of the engine. It owns the
//! voxel data of every resident chunk and the mesh state of every chunk the engine
//! has tried to mesh.
//!
//! ## Mesh State Machine
//!
//! ```text
//! None ──dispatch──▶ Pending ──install──▶ Loaded
//!  ▲                   │                     │
//!  └──reject/evict─────┘◀──────re-mesh───────┘
//! ```
//!
//! A result is installed only if its version is at least the version of the mesh
//! already installed. A rejected result leaves a previously installed mesh alone.
//!
//! ## Retained Chunks
//!
//! Chunks that leave the streaming radius are retired into a bounded LRU cache instead
//! of being dropped, so walking back into an area restores its edits.

use std::collections::HashMap;
use std::num::NonZeroUsize;

use cgmath::{Point3, Vector3};
use log::trace;
use lru::LruCache;

use crate::engine_state::task_management::task::{CancelFlag, TaskTicket};
use crate::engine_state::voxels::block::VoxelMaterial;
use crate::engine_state::voxels::chunk::index::voxel_to_local;
use crate::engine_state::voxels::chunk::neighborhood::ChunkOccupancy;
use crate::engine_state::voxels::chunk::{Chunk, ChunkKey};

/// Where a chunk's mesh is in its lifecycle.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum ChunkMeshStatus {
    /// No mesh has been requested, or the last request was dropped.
    #[default]
    None,
    /// A mesh job is on a worker or in the queue.
    Pending,
    /// A mesh is installed and nothing is in flight.
    Loaded,
}

/// The job currently meshing a chunk.
#[derive(Clone, Debug)]
pub struct InFlightMesh {
    pub ticket: TaskTicket,
    pub cancel: CancelFlag,
}

/// Mesh bookkeeping for one chunk.
#[derive(Clone, Debug, Default)]
pub struct ChunkMeshRecord {
    pub status: ChunkMeshStatus,
    /// Version of the last installed mesh, 0 if none.
    pub version: u64,
    /// Whether a mesh for this chunk is currently handed out to the renderer.
    pub displayed: bool,
    pub in_flight: Option<InFlightMesh>,
    /// The voxels changed after the in-flight job took its snapshot.
    pub dirty: bool,
}

impl ChunkMeshRecord {
    fn settled_status(&self) -> ChunkMeshStatus {
        if self.displayed {
            ChunkMeshStatus::Loaded
        } else {
            ChunkMeshStatus::None
        }
    }
}

/// What `World::try_install` decided about a finished mesh.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum InstallOutcome {
    /// The mesh is now current. `replaced` is set when an older mesh was displayed.
    Installed { replaced: bool },
    /// A newer mesh is already installed; the result must be dropped.
    Stale,
}

/// The chunk store: voxel data plus per-chunk mesh state.
pub struct World {
    chunks: HashMap<ChunkKey, Chunk>,
    meshes: HashMap<ChunkKey, ChunkMeshRecord>,
    retired: Option<LruCache<ChunkKey, Chunk>>,
}

impl World {
    /// Creates a new, empty world.
    ///
    /// # Arguments
    /// * `retained_chunk_capacity` - How many evicted chunks keep their voxel data; 0
    ///   disables retention
    pub fn new(retained_chunk_capacity: usize) -> Self {
        World {
            chunks: HashMap::new(),
            meshes: HashMap::new(),
            retired: NonZeroUsize::new(retained_chunk_capacity).map(LruCache::new),
        }
    }

    pub fn get_chunk(&self, key: ChunkKey) -> Option<&Chunk> {
        self.chunks.get(&key)
    }

    pub fn contains_chunk(&self, key: ChunkKey) -> bool {
        self.chunks.contains_key(&key)
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn chunk_keys(&self) -> impl Iterator<Item = ChunkKey> + '_ {
        self.chunks.keys().copied()
    }

    pub fn insert_chunk(&mut self, chunk: Chunk) {
        self.chunks.insert(chunk.position, chunk);
    }

    /// Moves a chunk's voxel data out of the resident set into the retained cache.
    pub fn retire_chunk(&mut self, key: ChunkKey) {
        if let Some(chunk) = self.chunks.remove(&key) {
            if let Some(retired) = &mut self.retired {
                trace!("Retiring chunk {}", key);
                retired.put(key, chunk);
            }
        }
    }

    /// Takes a previously retired chunk back out of the cache.
    pub fn take_retired(&mut self, key: ChunkKey) -> Option<Chunk> {
        self.retired.as_mut().and_then(|retired| retired.pop(&key))
    }

    pub fn retired_count(&self) -> usize {
        self.retired.as_ref().map_or(0, LruCache::len)
    }

    /// Material at integer world voxel coordinates. Unloaded chunks read as empty.
    pub fn voxel_at(&self, voxel: Point3<i32>) -> VoxelMaterial {
        self.chunks
            .get(&ChunkKey::from_voxel(voxel))
            .map_or(VoxelMaterial::Empty, |chunk| chunk.get(voxel_to_local(voxel)))
    }

    /// Writes a voxel in a loaded chunk.
    ///
    /// # Returns
    /// The previous material, or `None` if the chunk is not loaded.
    pub fn set_voxel(&mut self, voxel: Point3<i32>, material: VoxelMaterial) -> Option<VoxelMaterial> {
        self.chunks
            .get_mut(&ChunkKey::from_voxel(voxel))
            .map(|chunk| chunk.set(voxel_to_local(voxel), material))
    }

    /// Snapshot of a chunk's occupancy for meshing.
    ///
    /// With `cross_chunk` set the halo is taken from loaded neighbours.
    pub fn occupancy_for(&self, key: ChunkKey, cross_chunk: bool) -> Option<ChunkOccupancy> {
        let chunk = self.chunks.get(&key)?;
        if cross_chunk {
            Some(ChunkOccupancy::with_neighbors(chunk, |offset: Vector3<i32>| {
                self.chunks.get(&key.offset(offset))
            }))
        } else {
            Some(ChunkOccupancy::from_voxels(&chunk.voxels))
        }
    }

    pub fn mesh_record(&self, key: ChunkKey) -> Option<&ChunkMeshRecord> {
        self.meshes.get(&key)
    }

    pub fn mesh_status(&self, key: ChunkKey) -> ChunkMeshStatus {
        self.meshes.get(&key).map_or(ChunkMeshStatus::None, |r| r.status)
    }

    pub fn mesh_records(&self) -> impl Iterator<Item = (&ChunkKey, &ChunkMeshRecord)> {
        self.meshes.iter()
    }

    pub fn pending_mesh_count(&self) -> usize {
        self.meshes
            .values()
            .filter(|r| r.status == ChunkMeshStatus::Pending)
            .count()
    }

    /// Records a freshly dispatched mesh job. A job still in flight for the same
    /// chunk is cancelled; its result will no longer match.
    pub fn mark_pending(&mut self, key: ChunkKey, ticket: TaskTicket, cancel: CancelFlag) {
        let record = self.meshes.entry(key).or_default();
        if let Some(previous) = record.in_flight.replace(InFlightMesh { ticket, cancel }) {
            previous.cancel.cancel();
        }
        record.status = ChunkMeshStatus::Pending;
        record.dirty = false;
    }

    /// Flags a chunk whose voxels changed so it gets meshed again.
    ///
    /// A job already in flight is cancelled, since its snapshot is out of date.
    pub fn mark_dirty(&mut self, key: ChunkKey) {
        let record = self.meshes.entry(key).or_default();
        if let Some(in_flight) = &record.in_flight {
            in_flight.cancel.cancel();
        }
        record.dirty = true;
    }

    /// Whether `ticket` is the job the chunk is waiting for.
    pub fn is_in_flight(&self, key: ChunkKey, ticket: TaskTicket) -> bool {
        self.meshes
            .get(&key)
            .and_then(|r| r.in_flight.as_ref())
            .is_some_and(|in_flight| in_flight.ticket == ticket)
    }

    /// The chunk whose in-flight job holds `ticket`.
    pub fn key_for_ticket(&self, ticket: TaskTicket) -> Option<ChunkKey> {
        self.meshes.iter().find_map(|(key, record)| {
            record
                .in_flight
                .as_ref()
                .is_some_and(|in_flight| in_flight.ticket == ticket)
                .then_some(*key)
        })
    }

    /// Whether the in-flight job of `key` has been asked to stop.
    pub fn is_in_flight_cancelled(&self, key: ChunkKey) -> bool {
        self.meshes
            .get(&key)
            .and_then(|r| r.in_flight.as_ref())
            .is_some_and(|in_flight| in_flight.cancel.is_cancelled())
    }

    /// Installs a finished mesh if it is not older than the one already installed.
    pub fn try_install(&mut self, key: ChunkKey, ticket: TaskTicket) -> InstallOutcome {
        let record = self.meshes.entry(key).or_default();
        record.in_flight = None;
        if ticket.version < record.version {
            record.status = record.settled_status();
            return InstallOutcome::Stale;
        }
        let replaced = record.displayed;
        record.version = ticket.version;
        record.displayed = true;
        record.status = ChunkMeshStatus::Loaded;
        InstallOutcome::Installed { replaced }
    }

    /// Drops the in-flight job's result. A mesh that is still displayed stays loaded.
    pub fn reject_mesh(&mut self, key: ChunkKey) {
        if let Some(record) = self.meshes.get_mut(&key) {
            record.in_flight = None;
            record.status = record.settled_status();
        }
    }

    /// Forgets a chunk's mesh state, cancelling any job in flight.
    ///
    /// # Returns
    /// The removed record, so the caller can tell whether a mesh was displayed.
    pub fn evict_mesh(&mut self, key: ChunkKey) -> Option<ChunkMeshRecord> {
        let record = self.meshes.remove(&key)?;
        if let Some(in_flight) = &record.in_flight {
            in_flight.cancel.cancel();
        }
        Some(record)
    }

    /// Cancels every in-flight job.
    ///
    /// Chunks that still display a mesh go back to `Loaded` and are marked dirty so
    /// they are meshed again later; the rest go back to `None`.
    ///
    /// # Returns
    /// The chunks whose jobs were cancelled.
    pub fn cancel_all_meshes(&mut self) -> Vec<ChunkKey> {
        let mut cancelled = Vec::new();
        for (key, record) in self.meshes.iter_mut() {
            if let Some(in_flight) = record.in_flight.take() {
                in_flight.cancel.cancel();
                cancelled.push(*key);
                record.dirty |= record.displayed;
                record.status = record.settled_status();
            }
        }
        cancelled
    }

    /// Drops all voxel data and mesh state, retained chunks included.
    ///
    /// # Returns
    /// The chunks whose meshes were displayed.
    pub fn clear(&mut self) -> Vec<ChunkKey> {
        let displayed = self
            .meshes
            .drain()
            .filter_map(|(key, record)| {
                if let Some(in_flight) = &record.in_flight {
                    in_flight.cancel.cancel();
                }
                record.displayed.then_some(key)
            })
            .collect();
        self.chunks.clear();
        if let Some(retired) = &mut self.retired {
            retired.clear();
        }
        displayed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticket(version: u64) -> TaskTicket {
        TaskTicket { version }
    }

    #[test]
    fn voxel_access_across_chunks() {
        let mut world = World::new(0);
        world.insert_chunk(Chunk::empty(ChunkKey::new(-1, 0, 0)));
        let voxel = Point3::new(-1, 3, 15);
        assert_eq!(world.set_voxel(voxel, VoxelMaterial::from_id(4)), Some(VoxelMaterial::Empty));
        assert_eq!(world.voxel_at(voxel), VoxelMaterial::from_id(4));
        assert_eq!(world.set_voxel(Point3::new(0, 0, 0), VoxelMaterial::from_id(1)), None);
        assert_eq!(world.voxel_at(Point3::new(0, 0, 0)), VoxelMaterial::Empty);
    }

    #[test]
    fn newer_mesh_replaces_older() {
        let mut world = World::new(0);
        let key = ChunkKey::new(0, 0, 0);
        world.mark_pending(key, ticket(1), CancelFlag::new());
        assert_eq!(world.mesh_status(key), ChunkMeshStatus::Pending);
        assert_eq!(world.try_install(key, ticket(1)), InstallOutcome::Installed { replaced: false });
        world.mark_pending(key, ticket(4), CancelFlag::new());
        assert_eq!(world.try_install(key, ticket(4)), InstallOutcome::Installed { replaced: true });
        assert_eq!(world.mesh_record(key).map(|r| r.version), Some(4));
    }

    #[test]
    fn older_mesh_leaves_installed_one_alone() {
        let mut world = World::new(0);
        let key = ChunkKey::new(0, 0, 0);
        world.mark_pending(key, ticket(5), CancelFlag::new());
        world.try_install(key, ticket(5));
        world.mark_pending(key, ticket(3), CancelFlag::new());
        assert_eq!(world.try_install(key, ticket(3)), InstallOutcome::Stale);
        let record = world.mesh_record(key).unwrap();
        assert_eq!(record.version, 5);
        assert_eq!(record.status, ChunkMeshStatus::Loaded);
    }

    #[test]
    fn reject_keeps_displayed_mesh() {
        let mut world = World::new(0);
        let key = ChunkKey::new(0, 0, 0);
        world.mark_pending(key, ticket(1), CancelFlag::new());
        world.reject_mesh(key);
        assert_eq!(world.mesh_status(key), ChunkMeshStatus::None);

        world.mark_pending(key, ticket(2), CancelFlag::new());
        world.try_install(key, ticket(2));
        world.mark_pending(key, ticket(3), CancelFlag::new());
        world.reject_mesh(key);
        assert_eq!(world.mesh_status(key), ChunkMeshStatus::Loaded);
    }

    #[test]
    fn dirty_cancels_in_flight_job() {
        let mut world = World::new(0);
        let key = ChunkKey::new(0, 0, 0);
        let cancel = CancelFlag::new();
        world.mark_pending(key, ticket(1), cancel.clone());
        world.mark_dirty(key);
        assert!(cancel.is_cancelled());
        assert!(world.mesh_record(key).unwrap().dirty);
        assert!(world.is_in_flight(key, ticket(1)));
    }

    #[test]
    fn redispatch_cancels_previous_job() {
        let mut world = World::new(0);
        let key = ChunkKey::new(0, 0, 0);
        let first = CancelFlag::new();
        world.mark_pending(key, ticket(1), first.clone());
        world.mark_pending(key, ticket(2), CancelFlag::new());
        assert!(first.is_cancelled());
        assert!(!world.is_in_flight(key, ticket(1)));
        assert_eq!(world.key_for_ticket(ticket(2)), Some(key));
        assert_eq!(world.key_for_ticket(ticket(1)), None);
    }

    #[test]
    fn eviction_cancels_and_forgets() {
        let mut world = World::new(0);
        let key = ChunkKey::new(2, 0, 0);
        let cancel = CancelFlag::new();
        world.mark_pending(key, ticket(7), cancel.clone());
        let record = world.evict_mesh(key).unwrap();
        assert!(!record.displayed);
        assert!(cancel.is_cancelled());
        assert_eq!(world.mesh_status(key), ChunkMeshStatus::None);
        assert!(!world.is_in_flight(key, ticket(7)));
    }

    #[test]
    fn retired_chunks_come_back() {
        let mut world = World::new(2);
        for x in 0..3 {
            let mut chunk = Chunk::empty(ChunkKey::new(x, 0, 0));
            chunk.set(Point3::new(0, 0, 0), VoxelMaterial::from_id(x as u16 + 1));
            world.insert_chunk(chunk);
        }
        for x in 0..3 {
            world.retire_chunk(ChunkKey::new(x, 0, 0));
        }
        assert_eq!(world.chunk_count(), 0);
        assert_eq!(world.retired_count(), 2);
        // The least recently retired chunk was dropped.
        assert!(world.take_retired(ChunkKey::new(0, 0, 0)).is_none());
        let chunk = world.take_retired(ChunkKey::new(2, 0, 0)).unwrap();
        assert_eq!(chunk.get(Point3::new(0, 0, 0)), VoxelMaterial::from_id(3));
    }

    #[test]
    fn cancel_all_restores_settled_states() {
        let mut world = World::new(0);
        let shown = ChunkKey::new(0, 0, 0);
        let fresh = ChunkKey::new(1, 0, 0);
        world.mark_pending(shown, ticket(1), CancelFlag::new());
        world.try_install(shown, ticket(1));
        world.mark_pending(shown, ticket(2), CancelFlag::new());
        world.mark_pending(fresh, ticket(3), CancelFlag::new());

        assert_eq!(world.cancel_all_meshes().len(), 2);
        assert_eq!(world.mesh_status(shown), ChunkMeshStatus::Loaded);
        assert!(world.mesh_record(shown).unwrap().dirty);
        assert_eq!(world.mesh_status(fresh), ChunkMeshStatus::None);
        assert_eq!(world.pending_mesh_count(), 0);
    }
}
