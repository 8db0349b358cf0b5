use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    sync::atomic::{AtomicUsize, Ordering},
};

use cgmath::{Matrix4, Point3, Vector3};
use voxel_instancing::{
    config::{StoreConfig, TerrainConfig},
    engine_state::{
        buffer_state::{DeviceBuffer, HostAllocator},
        instancing::{InstanceModel, InstanceNormal},
        voxels::{
            block::block_type::BlockType,
            components::{BoundingVolume, Position},
        },
        TerrainStore,
    },
};

/// Unique save path under the temp dir, removed on drop.
struct TempSave(PathBuf);

impl TempSave {
    fn new(name: &str) -> Self {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);
        let path = std::env::temp_dir().join(format!(
            "voxel-instancing-{}-{}-{}.bin",
            name,
            std::process::id(),
            COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        let _ = std::fs::remove_file(&path);
        Self(path)
    }

    fn path(&self) -> &Path {
        &self.0
    }
}

impl Drop for TempSave {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.0);
    }
}

fn config(save: &TempSave, terrain: TerrainConfig) -> StoreConfig {
    StoreConfig {
        save_path: save.path().to_path_buf(),
        terrain,
    }
}

fn flat(width: u32, median_height: f32) -> TerrainConfig {
    TerrainConfig {
        width,
        depth: width,
        amplitude: 0.0,
        median_height,
        min_height: 0.0,
        seed: Some(7),
        ..TerrainConfig::default()
    }
}

fn hilly() -> TerrainConfig {
    TerrainConfig {
        width: 8,
        depth: 8,
        amplitude: 4.0,
        median_height: 3.0,
        min_height: -4.0,
        seed: Some(1234),
        ..TerrainConfig::default()
    }
}

fn positions(store: &TerrainStore<HostAllocator>, block_type: BlockType) -> Vec<[i32; 3]> {
    let mut positions: Vec<[i32; 3]> = store
        .models(block_type)
        .iter()
        .map(|model| {
            let t = model.translation() * 2.0;
            [t.x as i32, t.y as i32, t.z as i32]
        })
        .collect();
    positions.sort();
    positions
}

fn assert_mirror_matches_registry(store: &TerrainStore<HostAllocator>) {
    for block_type in BlockType::ALL {
        let tracked = store
            .registry()
            .view2::<Position, BlockType>()
            .filter(|(_, _, t)| **t == block_type)
            .count();
        let instances = store.instances();
        assert_eq!(instances.mirror().models(block_type).len(), tracked);
        assert_eq!(instances.mirror().normals(block_type).len(), tracked);
        assert_eq!(store.num_objects(block_type), tracked);

        let buffers = instances.buffers(block_type);
        assert!(buffers.models.buffer().size() > 0);
        assert!(buffers.normals.buffer().size() > 0);
        let uploaded: Vec<InstanceModel> = buffers.models.buffer().read(tracked);
        assert_eq!(&uploaded, instances.mirror().models(block_type));
    }
}

#[test]
fn flat_terrain_scenario() {
    let save = TempSave::new("flat");
    let store = TerrainStore::new(&HostAllocator, config(&save, flat(4, 5.0))).unwrap();

    assert_eq!(store.num_objects(BlockType::Grass), 16);
    assert_eq!(store.num_objects(BlockType::Dirt), 16 * 5);
    assert_eq!(store.num_objects(BlockType::Cobblestone), 0);
    assert_mirror_matches_registry(&store);
}

#[test]
fn columns_below_min_height_produce_nothing() {
    let save = TempSave::new("sunken");
    let store = TerrainStore::new(&HostAllocator, config(&save, flat(2, -5.0))).unwrap();

    assert!(store.registry().is_empty());
    assert_mirror_matches_registry(&store);
}

#[test]
fn mirror_tracks_random_edits() {
    let save = TempSave::new("edits");
    let mut store = TerrainStore::new(&HostAllocator, config(&save, hilly())).unwrap();
    fastrand::seed(5);

    let mut placed = Vec::new();
    for step in 0..300 {
        if placed.is_empty() || fastrand::u8(..3) > 0 {
            let position = Position::new(
                fastrand::i32(-20..20) as f32 + 0.5,
                fastrand::i32(-20..20) as f32 + 0.5,
                fastrand::i32(-20..20) as f32 + 0.5,
            );
            placed.push(store.place_block(position, BlockType::random()).unwrap());
        } else {
            let entity = placed.swap_remove(fastrand::usize(..placed.len()));
            assert!(store.remove_block(entity));
        }
        if step % 50 == 0 {
            assert_mirror_matches_registry(&store);
        }
    }

    // some generated terrain goes too
    let terrain: Vec<_> = store.registry().entities().take(10).collect();
    for entity in terrain {
        store.remove_block(entity);
    }
    assert_mirror_matches_registry(&store);
}

#[test]
fn removal_keeps_the_remaining_positions() {
    let save = TempSave::new("removal");
    let mut store = TerrainStore::new(&HostAllocator, config(&save, flat(2, 1.0))).unwrap();
    let before: HashSet<_> = positions(&store, BlockType::Dirt).into_iter().collect();

    let victim = store
        .registry()
        .view2::<Position, BlockType>()
        .find(|(_, _, t)| **t == BlockType::Dirt)
        .map(|(entity, position, _)| (entity, *position));
    let (entity, position) = victim.unwrap();
    store.remove_block(entity);

    let after: HashSet<_> = positions(&store, BlockType::Dirt).into_iter().collect();
    let mut expected = before;
    expected.remove(&[
        (position.x * 2.0) as i32,
        (position.y * 2.0) as i32,
        (position.z * 2.0) as i32,
    ]);
    assert_eq!(after, expected);
    assert_mirror_matches_registry(&store);
}

#[test]
fn position_alone_is_not_drawn() {
    let save = TempSave::new("position-only");
    let mut store = TerrainStore::new(&HostAllocator, config(&save, flat(2, 1.0))).unwrap();
    let counts = BlockType::ALL.map(|t| store.num_objects(t));

    let entity = store.registry_mut().create();
    store
        .registry_mut()
        .insert(entity, Position::new(0.5, 10.5, 0.5))
        .unwrap();
    store
        .registry_mut()
        .insert(entity, BoundingVolume::unit_block())
        .unwrap();

    assert_eq!(BlockType::ALL.map(|t| store.num_objects(t)), counts);
}

#[test]
fn detaching_position_drops_the_instance() {
    let save = TempSave::new("detach");
    let mut store = TerrainStore::new(&HostAllocator, config(&save, flat(2, 1.0))).unwrap();
    let grass = store.num_objects(BlockType::Grass);

    let entity = store.registry_mut().create();
    store
        .registry_mut()
        .insert(entity, Position::new(0.5, 10.5, 0.5))
        .unwrap();
    store
        .registry_mut()
        .insert(entity, BlockType::Grass)
        .unwrap();
    assert_eq!(store.num_objects(BlockType::Grass), grass + 1);

    store.registry_mut().remove::<Position>(entity);
    assert_eq!(store.num_objects(BlockType::Grass), grass);

    store.registry_mut().remove::<BlockType>(entity);
    assert_eq!(store.num_objects(BlockType::Grass), grass);
    assert_mirror_matches_registry(&store);
}

#[test]
fn rebuild_twice_is_identical() {
    let save = TempSave::new("rebuild");
    let mut store = TerrainStore::new(&HostAllocator, config(&save, hilly())).unwrap();
    store.update_normal_mats(&Matrix4::from_angle_x(cgmath::Deg(30.0)));

    store.rebuild_instances();
    let first: Vec<(Vec<InstanceModel>, Vec<InstanceNormal>)> = BlockType::ALL
        .iter()
        .map(|t| {
            let instances = store.instances();
            (
                instances.mirror().models(*t).clone(),
                instances.mirror().normals(*t).clone(),
            )
        })
        .collect();
    store.rebuild_instances();
    let second: Vec<(Vec<InstanceModel>, Vec<InstanceNormal>)> = BlockType::ALL
        .iter()
        .map(|t| {
            let instances = store.instances();
            (
                instances.mirror().models(*t).clone(),
                instances.mirror().normals(*t).clone(),
            )
        })
        .collect();

    assert_eq!(first, second);
}

#[test]
fn dropping_the_store_saves_and_a_new_store_restores() {
    let save = TempSave::new("round-trip");
    let original: Vec<_>;
    {
        let mut store = TerrainStore::new(&HostAllocator, config(&save, hilly())).unwrap();
        store
            .place_block(Position::new(0.5, 30.5, 0.5), BlockType::Cobblestone)
            .unwrap();
        original = BlockType::ALL.map(|t| positions(&store, t)).to_vec();
    }
    assert!(save.path().exists());

    // a different seed proves the world came from the file
    let terrain = TerrainConfig {
        seed: Some(4321),
        ..hilly()
    };
    let restored = TerrainStore::new(&HostAllocator, config(&save, terrain)).unwrap();

    assert_eq!(BlockType::ALL.map(|t| positions(&restored, t)).to_vec(), original);
    assert_mirror_matches_registry(&restored);
}

#[test]
fn restored_store_keeps_tracking_edits() {
    let save = TempSave::new("restored-edits");
    {
        TerrainStore::new(&HostAllocator, config(&save, flat(2, 2.0))).unwrap();
    }
    let mut store = TerrainStore::new(&HostAllocator, config(&save, flat(2, 2.0))).unwrap();

    let entity = store
        .place_block(Position::new(5.5, 0.5, 5.5), BlockType::Cobblestone)
        .unwrap();
    assert_eq!(store.num_objects(BlockType::Cobblestone), 1);
    store.remove_block(entity);
    assert_eq!(store.num_objects(BlockType::Cobblestone), 0);
    assert_mirror_matches_registry(&store);
}

#[test]
fn corrupt_save_falls_back_to_generation() {
    let save = TempSave::new("corrupt");
    std::fs::write(save.path(), b"not a world").unwrap();

    let store = TerrainStore::new(&HostAllocator, config(&save, flat(4, 5.0))).unwrap();

    assert_eq!(store.num_objects(BlockType::Grass), 16);
    assert_mirror_matches_registry(&store);
}

#[test]
fn reset_deletes_the_save_and_regenerates() {
    let save = TempSave::new("reset");
    let mut store = TerrainStore::new(&HostAllocator, config(&save, flat(4, 5.0))).unwrap();
    store
        .place_block(Position::new(0.5, 30.5, 0.5), BlockType::Cobblestone)
        .unwrap();
    store.save().unwrap();
    assert!(save.path().exists());

    store.reset().unwrap();

    assert!(!save.path().exists());
    assert!(store.is_connected());
    assert_eq!(store.num_objects(BlockType::Cobblestone), 0);
    assert_eq!(store.num_objects(BlockType::Grass), 16);
    assert_mirror_matches_registry(&store);

    // hooks are live again after the reset
    store
        .place_block(Position::new(0.5, 30.5, 0.5), BlockType::Cobblestone)
        .unwrap();
    assert_eq!(store.num_objects(BlockType::Cobblestone), 1);
}

#[test]
fn explicit_load_replaces_the_world() {
    let save = TempSave::new("load");
    let mut store = TerrainStore::new(&HostAllocator, config(&save, flat(2, 1.0))).unwrap();
    store.save().unwrap();
    let saved = BlockType::ALL.map(|t| positions(&store, t));

    store
        .place_block(Position::new(3.5, 3.5, 3.5), BlockType::Cobblestone)
        .unwrap();
    assert!(store.load().unwrap());

    assert_eq!(BlockType::ALL.map(|t| positions(&store, t)), saved);
    assert_mirror_matches_registry(&store);
}

#[test]
fn disconnected_store_ignores_edits_until_rebuilt() {
    let save = TempSave::new("disconnected");
    let mut store = TerrainStore::new(&HostAllocator, config(&save, flat(2, 1.0))).unwrap();
    store.disconnect();
    assert!(!store.is_connected());

    store
        .place_block(Position::new(0.5, 9.5, 0.5), BlockType::Cobblestone)
        .unwrap();
    assert_eq!(store.num_objects(BlockType::Cobblestone), 0);

    store.rebuild_instances();
    store.connect();
    assert_eq!(store.num_objects(BlockType::Cobblestone), 1);
    assert_mirror_matches_registry(&store);
}

#[test]
fn normal_refresh_uses_the_view() {
    let save = TempSave::new("normals");
    let mut store = TerrainStore::new(&HostAllocator, config(&save, flat(2, 1.0))).unwrap();
    let view = Matrix4::look_at_rh(
        Point3::new(4.0, 6.0, 4.0),
        Point3::new(0.0, 0.0, 0.0),
        Vector3::unit_y(),
    );

    store.update_normal_mats(&view);

    let instances = store.instances();
    let normals = instances.mirror().normals(BlockType::Grass);
    assert!(!normals.is_empty());
    assert!(normals.iter().all(|n| *n != InstanceNormal::identity()));
    let uploaded: Vec<InstanceNormal> = instances
        .buffers(BlockType::Grass)
        .normals
        .buffer()
        .read(normals.len());
    assert_eq!(&uploaded, normals);
}

#[test]
fn growth_reallocates_rarely() {
    let save = TempSave::new("growth");
    let mut store = TerrainStore::new(&HostAllocator, config(&save, flat(2, 1.0))).unwrap();
    let before = store.buffer_analytics(BlockType::Cobblestone).0;

    for i in 0..200 {
        store
            .place_block(Position::new(i as f32 + 0.5, 20.5, 0.5), BlockType::Cobblestone)
            .unwrap();
    }

    let after = store.buffer_analytics(BlockType::Cobblestone).0;
    assert!(after.reallocations - before.reallocations < 12);
    assert!(after.times_written - before.times_written >= 200);
    assert_eq!(
        after.allocated_memory,
        store.instances().mirror().models(BlockType::Cobblestone).capacity() as u64 * 64
    );
}

#[test]
fn invalid_config_is_rejected() {
    let save = TempSave::new("invalid");
    let result = TerrainStore::new(&HostAllocator, config(&save, flat(3, 1.0)));

    assert!(result.is_err());
}

#[test]
fn moved_store_keeps_tracking_edits() {
    let save = TempSave::new("moved");
    let store = TerrainStore::new(&HostAllocator, config(&save, flat(2, 1.0))).unwrap();

    let mut boxed = Box::new(store);
    let entity = boxed
        .place_block(Position::new(2.5, 4.5, 2.5), BlockType::Cobblestone)
        .unwrap();
    assert_eq!(boxed.num_objects(BlockType::Cobblestone), 1);

    let mut stores = vec![*boxed];
    let store = &mut stores[0];
    assert!(store.is_connected());
    assert!(store.remove_block(entity));
    assert_eq!(store.num_objects(BlockType::Cobblestone), 0);
    store
        .place_block(Position::new(-2.5, 4.5, 2.5), BlockType::Grass)
        .unwrap();
    assert_eq!(store.num_objects(BlockType::Grass), 5);
    assert_mirror_matches_registry(store);
}

#[test]
fn unreachable_heights_are_rejected() {
    let save = TempSave::new("deep");
    let terrain = TerrainConfig {
        min_height: -1.0e8,
        ..flat(2, 0.0)
    };

    assert!(TerrainStore::new(&HostAllocator, config(&save, terrain)).is_err());
}
