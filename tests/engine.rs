//! # Engine Integration Tests
//!
//! Drives `EngineState` through its public API with real worker threads.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cgmath::{Point3, Vector3};
use voxel_chunk_engine::{
    mesh_voxels, terrain_fn, BlockSide, ChunkKey, ChunkMeshStatus, CompletedMesh, EmptyTerrain,
    EngineConfig, EngineState, FlatTerrain, GlobalVariables, MeshOptions, PerlinTerrain,
    TerrainError, VoxelMaterial,
};

const STONE: VoxelMaterial = VoxelMaterial::from_id(1);
const GRASS: VoxelMaterial = VoxelMaterial::from_id(2);

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn small_config() -> EngineConfig {
    EngineConfig {
        worker_count: 3,
        horizontal_radius: 1,
        vertical_radius: 0,
        ..EngineConfig::default()
    }
}

fn flat_ground() -> Box<FlatTerrain> {
    Box::new(FlatTerrain {
        height: 8,
        material: STONE,
    })
}

/// Ticks until no mesh work is left, collecting every install.
fn settle(engine: &mut EngineState) -> Vec<CompletedMesh> {
    let mut meshes = Vec::new();
    for _ in 0..1000 {
        engine.wait_for_meshes(Duration::from_millis(50));
        meshes.extend(engine.drain_completed_meshes());
        if !engine.is_busy() {
            return meshes;
        }
    }
    panic!("{} meshes never finished", engine.pending_mesh_count());
}

#[test]
fn default_radius_streams_147_chunks() {
    init_logger();
    let mut engine = EngineState::new(EngineConfig::default(), Box::new(PerlinTerrain::default())).unwrap();
    let update = engine.observe_position(Point3::new(8.0, 8.0, 8.0));
    assert_eq!(update.loaded, 147);
    assert_eq!(update.dispatched, 147);
    assert!(update.failed.is_empty());

    let meshes = settle(&mut engine);
    let keys: HashSet<ChunkKey> = meshes.iter().map(|mesh| mesh.key).collect();
    assert_eq!(keys.len(), 147);
    assert_eq!(meshes.len(), 147);
    for mesh in &meshes {
        let origin = mesh.key.world_origin();
        assert_eq!(mesh.world_offset, [origin.x as f32, origin.y as f32, origin.z as f32]);
        assert_eq!(engine.mesh_status(mesh.key), ChunkMeshStatus::Loaded);
    }
}

#[test]
fn voxel_edit_remeshes_chunk() {
    init_logger();
    let mut engine = EngineState::new(small_config(), flat_ground()).unwrap();
    engine.update_streaming(ChunkKey::new(0, 0, 0));
    settle(&mut engine);
    let key = ChunkKey::new(0, 0, 0);
    let before = engine.mesh_version(key).unwrap();

    // Place a block on top of the ground.
    let edited = engine.set_voxel(Point3::new(4.5, 8.5, 4.5), GRASS).unwrap();
    assert_eq!(edited, key);
    assert_eq!(engine.get_voxel(Point3::new(4.5, 8.5, 4.5)), GRASS);

    let meshes = settle(&mut engine);
    assert_eq!(meshes.len(), 1);
    assert_eq!(meshes[0].key, key);
    assert!(meshes[0].version > before);
    // Ground without walls: top and bottom, plus the four sides of every border column.
    let ground_faces = 2 * 16 * 16 + 4 * 16 * 8;
    assert_eq!(meshes[0].geometry.face_count(), ground_faces + 4);
    assert_eq!(engine.mesh_version(key), Some(meshes[0].version));
}

#[test]
fn unchanged_voxel_write_still_remeshes_identically() {
    init_logger();
    let mut engine = EngineState::new(small_config(), flat_ground()).unwrap();
    let key = engine.set_voxel(Point3::new(1.0, 1.0, 1.0), STONE).unwrap();
    let first = settle(&mut engine);
    assert_eq!(first.len(), 1);

    engine.set_voxel(Point3::new(1.0, 1.0, 1.0), STONE).unwrap();
    let second = settle(&mut engine);
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].key, key);
    assert!(second[0].version > first[0].version);
    assert_eq!(second[0].geometry, first[0].geometry);
}

#[test]
fn edits_while_pending_end_up_in_the_mesh() {
    init_logger();
    let mut engine = EngineState::new(small_config(), Box::new(EmptyTerrain)).unwrap();
    let key = engine.set_voxel(Point3::new(0.5, 0.5, 0.5), STONE).unwrap();
    engine.tick();
    assert_eq!(engine.mesh_status(key), ChunkMeshStatus::Pending);

    for x in 1..8 {
        engine.set_voxel(Point3::new(x as f64 + 0.5, 0.5, 0.5), STONE).unwrap();
        engine.tick();
    }
    let meshes = settle(&mut engine);
    let last = meshes.iter().rev().find(|mesh| mesh.key == key).unwrap();

    let expected = mesh_voxels(&engine.chunk(key).unwrap().voxels, MeshOptions::default()).unwrap();
    assert_eq!(last.geometry, expected);
    // A row of 8 voxels: 4 long sides of 8 faces plus 2 caps.
    assert_eq!(expected.face_count(), 34);
    assert_eq!(engine.mesh_status(key), ChunkMeshStatus::Loaded);
}

#[test]
fn leaving_chunks_emits_removals() {
    init_logger();
    let mut engine = EngineState::new(small_config(), flat_ground()).unwrap();
    engine.update_streaming(ChunkKey::new(0, 0, 0));
    settle(&mut engine);
    assert!(engine.drain_removed_meshes().is_empty());

    let update = engine.update_streaming(ChunkKey::new(1, 0, 0));
    assert_eq!(update.evicted, 3);
    assert_eq!(update.loaded, 3);
    let removed: HashSet<ChunkKey> = engine.drain_removed_meshes().into_iter().collect();
    let expected: HashSet<ChunkKey> = (-1..=1).map(|z| ChunkKey::new(-1, 0, z)).collect();
    assert_eq!(removed, expected);
    for key in &removed {
        assert_eq!(engine.mesh_status(*key), ChunkMeshStatus::None);
        assert!(engine.chunk(*key).is_none());
    }

    let meshes = settle(&mut engine);
    assert_eq!(meshes.len(), 3);
    assert!(meshes.iter().all(|mesh| mesh.key.0.x == 2));
}

#[test]
fn terrain_errors_stay_with_their_chunk() {
    init_logger();
    let broken = terrain_fn(|_: &GlobalVariables, p: Point3<i32>| {
        if p.x >= 16 {
            Err(TerrainError::Generator("no terrain east of x=16".into()))
        } else {
            Ok(STONE)
        }
    });
    let mut engine = EngineState::new(small_config(), Box::new(broken)).unwrap();
    let update = engine.update_streaming(ChunkKey::new(0, 0, 0));
    assert_eq!(update.failed.len(), 3);
    assert!(update.failed.iter().all(|key| key.0.x == 1));
    assert_eq!(update.loaded, 6);

    let meshes = settle(&mut engine);
    assert_eq!(meshes.len(), 6);
    assert!(engine.chunk(ChunkKey::new(1, 0, 0)).is_none());
    assert_eq!(engine.get_voxel(Point3::new(20.0, 1.0, 1.0)), VoxelMaterial::Empty);
    assert!(engine.set_voxel(Point3::new(20.0, 1.0, 1.0), STONE).is_err());

    // A working generator fills the gap on the next pass without touching the rest.
    let update = engine.set_terrain_generator(Box::new(EmptyTerrain));
    assert_eq!(update.loaded, 3);
    assert_eq!(update.dispatched, 3);
    assert_eq!(engine.get_voxel(Point3::new(1.0, 1.0, 1.0)), STONE);
    assert_eq!(engine.get_voxel(Point3::new(20.0, 1.0, 1.0)), VoxelMaterial::Empty);
    assert_eq!(settle(&mut engine).len(), 3);
}

#[test]
fn global_variables_reach_the_generator() {
    init_logger();
    let scripted = terrain_fn(|globals: &GlobalVariables, p: Point3<i32>| {
        let height = globals.get("height").and_then(|v| v.as_i64()).unwrap_or(0);
        Ok(if (p.y as i64) < height { STONE } else { VoxelMaterial::Empty })
    });
    let mut engine = EngineState::new(small_config(), Box::new(scripted)).unwrap();
    engine.set_global_variable("height", serde_json::json!(4));
    engine.set_voxel(Point3::new(0.0, 15.0, 0.0), GRASS).unwrap();
    assert_eq!(engine.get_voxel(Point3::new(0.0, 3.0, 0.0)), STONE);
    assert_eq!(engine.get_voxel(Point3::new(0.0, 4.0, 0.0)), VoxelMaterial::Empty);
}

#[test]
fn inactive_host_drops_results_until_resumed() {
    init_logger();
    let active = Arc::new(AtomicBool::new(false));
    let probe = active.clone();
    let mut engine = EngineState::new(small_config(), flat_ground()).unwrap();
    engine.set_activity_probe(move || probe.load(Ordering::SeqCst));

    // Streaming still dispatches, but every result is rejected.
    assert_eq!(engine.update_streaming(ChunkKey::new(0, 0, 0)).dispatched, 9);
    for _ in 0..1000 {
        engine.wait_for_meshes(Duration::from_millis(50));
        if engine.pending_mesh_count() == 0 {
            break;
        }
    }
    assert_eq!(engine.pending_mesh_count(), 0);
    assert!(engine.drain_completed_meshes().is_empty());
    assert_eq!(engine.mesh_status(ChunkKey::new(0, 0, 0)), ChunkMeshStatus::None);
    assert!(engine.is_busy());

    active.store(true, Ordering::SeqCst);
    assert_eq!(settle(&mut engine).len(), 9);
    assert_eq!(engine.mesh_status(ChunkKey::new(0, 0, 0)), ChunkMeshStatus::Loaded);
}

#[test]
fn stop_cancels_in_flight_work() {
    init_logger();
    let mut engine = EngineState::new(small_config(), flat_ground()).unwrap();
    engine.update_streaming(ChunkKey::new(0, 0, 0));
    engine.stop();
    assert_eq!(engine.pending_mesh_count(), 0);
    // Late results of cancelled jobs are discarded; the chunks are meshed again.
    let meshes = settle(&mut engine);
    let keys: HashSet<ChunkKey> = meshes.iter().map(|mesh| mesh.key).collect();
    assert_eq!(keys.len(), 9);
}

#[test]
fn reset_starts_from_scratch() {
    init_logger();
    let mut engine = EngineState::new(small_config(), flat_ground()).unwrap();
    engine.update_streaming(ChunkKey::new(0, 0, 0));
    settle(&mut engine);
    engine.set_voxel(Point3::new(0.0, 0.0, 0.0), VoxelMaterial::Empty).unwrap();

    engine.reset_chunks();
    assert_eq!(engine.drain_removed_meshes().len(), 9);
    assert!(engine.drain_completed_meshes().is_empty());
    assert_eq!(engine.world().chunk_count(), 0);
    assert_eq!(engine.streaming_center(), None);

    let update = engine.update_streaming(ChunkKey::new(0, 0, 0));
    assert_eq!(update.loaded, 9);
    assert_eq!(settle(&mut engine).len(), 9);
    // The edit was dropped along with the chunk.
    assert_eq!(engine.get_voxel(Point3::new(0.0, 0.0, 0.0)), STONE);
}

#[test]
fn raycast_hits_ground_and_places_above_it() {
    init_logger();
    let mut engine = EngineState::new(small_config(), flat_ground()).unwrap();
    engine.update_streaming(ChunkKey::new(0, 0, 0));
    let hit = engine
        .raycast(Point3::new(3.5, 14.5, 3.5), Vector3::new(0.0, -1.0, 0.0), 32.0)
        .unwrap();
    assert_eq!(hit.voxel, Point3::new(3, 7, 3));
    assert_eq!(hit.placement, Point3::new(3, 8, 3));
    assert_eq!(hit.face, Some(BlockSide::TOP));
    assert_eq!(hit.material, STONE);

    let target = Point3::new(hit.placement.x as f64, hit.placement.y as f64, hit.placement.z as f64);
    engine.set_voxel(target, GRASS).unwrap();
    let again = engine
        .raycast(Point3::new(3.5, 14.5, 3.5), Vector3::new(0.0, -1.0, 0.0), 32.0)
        .unwrap();
    assert_eq!(again.voxel, Point3::new(3, 8, 3));
    assert_eq!(again.material, GRASS);
}

#[test]
fn cross_chunk_culling_hides_shared_borders() {
    init_logger();
    let config = EngineConfig {
        cross_chunk_culling: true,
        ..small_config()
    };
    let solid = || {
        Box::new(FlatTerrain {
            height: 16,
            material: STONE,
        })
    };
    let center = ChunkKey::new(0, 0, 0);

    let mut engine = EngineState::new(config.clone(), solid()).unwrap();
    engine.update_streaming(center);
    let meshes = settle(&mut engine);
    let mesh = meshes.iter().find(|mesh| mesh.key == center).unwrap();
    // Only the top and bottom are exposed; the unloaded chunks above and below are empty.
    assert_eq!(mesh.geometry.face_count(), 2 * 16 * 16);

    let mut isolated = EngineState::new(small_config(), solid()).unwrap();
    isolated.update_streaming(center);
    let meshes = settle(&mut isolated);
    let mesh = meshes.iter().find(|mesh| mesh.key == center).unwrap();
    assert_eq!(mesh.geometry.face_count(), 6 * 16 * 16);
}

#[test]
fn cross_chunk_edit_remeshes_neighbor() {
    init_logger();
    let config = EngineConfig {
        cross_chunk_culling: true,
        ..small_config()
    };
    let mut engine = EngineState::new(config, flat_ground()).unwrap();
    engine.update_streaming(ChunkKey::new(0, 0, 0));
    settle(&mut engine);

    // Digging at x = 15 exposes a face of the neighbouring chunk at x = 16.
    engine.set_voxel(Point3::new(15.5, 7.5, 4.5), VoxelMaterial::Empty).unwrap();
    let keys: HashSet<ChunkKey> = settle(&mut engine).iter().map(|mesh| mesh.key).collect();
    let expected: HashSet<ChunkKey> = [ChunkKey::new(0, 0, 0), ChunkKey::new(1, 0, 0)].into_iter().collect();
    assert_eq!(keys, expected);
}

#[test]
fn retained_chunks_keep_their_edits() {
    init_logger();
    let edit = Point3::new(2.5, 2.5, 2.5);
    for (capacity, expected) in [(64, VoxelMaterial::Empty), (0, STONE)] {
        let config = EngineConfig {
            retained_chunk_capacity: capacity,
            ..small_config()
        };
        let mut engine = EngineState::new(config, flat_ground()).unwrap();
        engine.update_streaming(ChunkKey::new(0, 0, 0));
        engine.set_voxel(edit, VoxelMaterial::Empty).unwrap();
        settle(&mut engine);

        engine.update_streaming(ChunkKey::new(10, 0, 0));
        assert!(engine.chunk(ChunkKey::new(0, 0, 0)).is_none());
        assert_eq!(engine.get_voxel(edit), VoxelMaterial::Empty);
        settle(&mut engine);

        engine.update_streaming(ChunkKey::new(0, 0, 0));
        assert_eq!(engine.get_voxel(edit), expected);
        settle(&mut engine);
    }
}

#[test]
fn config_round_trips_through_json() {
    let config = EngineConfig {
        worker_count: 2,
        cross_chunk_culling: true,
        ..EngineConfig::default()
    };
    let json = serde_json::to_string(&config).unwrap();
    assert_eq!(EngineConfig::from_json_str(&json).unwrap(), config);
}
