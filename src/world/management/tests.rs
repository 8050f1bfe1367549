use std::sync::Arc;

use glam::{Mat4, Vec3};
use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};

use super::{StreamingPolicy, World, WorldError};
use crate::config::WorldConfig;
use crate::persistence::{ChunkPersistence, MemoryStore, PersistenceError, PersistenceResult};
use crate::world::core::{BlockData, BlockId, ChunkPos, VoxelPos};
use crate::world::generation::{FlatGenerator, WorldGenerator};
use crate::world::interfaces::{HeadlessAssets, RecordingRenderer};
use crate::world::storage::Chunk;

/// Flat generator that records how often each chunk was generated
struct TrackingGenerator {
    inner: FlatGenerator,
    calls: Mutex<FxHashMap<ChunkPos, usize>>,
}

impl TrackingGenerator {
    fn new() -> Self {
        Self {
            inner: FlatGenerator::new(7),
            calls: Mutex::new(FxHashMap::default()),
        }
    }

    fn calls_for(&self, pos: ChunkPos) -> usize {
        self.calls.lock().get(&pos).copied().unwrap_or(0)
    }

    fn max_calls(&self) -> usize {
        self.calls.lock().values().copied().max().unwrap_or(0)
    }
}

impl WorldGenerator for TrackingGenerator {
    fn populate(&self, position: ChunkPos) -> Chunk {
        *self.calls.lock().entry(position).or_insert(0) += 1;
        self.inner.populate(position)
    }

    fn seed(&self) -> u32 {
        7
    }

    fn surface_height(&self, _world_x: i32, _world_z: i32) -> i32 {
        64
    }
}

/// Store whose writes always fail
struct ReadOnlyStore;

impl ChunkPersistence for ReadOnlyStore {
    fn load(&self, _position: ChunkPos) -> PersistenceResult<Option<Vec<u8>>> {
        Ok(None)
    }

    fn save(&self, _position: ChunkPos, _data: &[u8]) -> PersistenceResult<()> {
        Err(PersistenceError::Unavailable("read-only".to_string()))
    }
}

fn config(view_distance: i32) -> WorldConfig {
    WorldConfig {
        view_distance,
        seed: 7,
        ..WorldConfig::default()
    }
}

fn test_world(view_distance: i32) -> (World, Arc<TrackingGenerator>, Arc<MemoryStore>) {
    let generator = Arc::new(TrackingGenerator::new());
    let store = Arc::new(MemoryStore::new());
    let world = World::with_parts(
        config(view_distance),
        Arc::new(HeadlessAssets::new()),
        generator.clone(),
        store.clone(),
    )
    .expect("World should build");
    (world, generator, store)
}

fn observer_at(ix: i32, iz: i32) -> Vec3 {
    Vec3::new(ix as f32 * 16.0 + 8.0, 80.0, iz as f32 * 16.0 + 8.0)
}

fn sorted(mut positions: Vec<ChunkPos>) -> Vec<ChunkPos> {
    positions.sort();
    positions
}

#[test]
fn test_update_loads_the_load_disc() {
    let (mut world, _, _) = test_world(3);
    let report = world.update(observer_at(0, 0), 0.016);

    let expected = sorted(StreamingPolicy::new(3).load_candidates(ChunkPos::from_index(0, 0)));
    assert_eq!(world.resident_chunks(), expected);
    assert_eq!(sorted(report.created), expected);
    assert!(report.evicted.is_empty());
    assert_eq!(report.observer_chunk, Some(ChunkPos::from_index(0, 0)));
}

#[test]
fn test_resident_set_is_exact_after_moves() {
    let (mut world, _, _) = test_world(3);
    let policy = StreamingPolicy::new(3);
    let path = [(0, 0), (1, 0), (2, 1), (2, 3), (-4, 3), (-4, -6), (9, 9)];

    world.update(observer_at(0, 0), 0.1);
    for &(ix, iz) in &path[1..] {
        let before: FxHashSet<ChunkPos> = world.resident_chunks().into_iter().collect();
        let center = ChunkPos::from_index(ix, iz);
        world.update(observer_at(ix, iz), 0.1);

        let mut expected: FxHashSet<ChunkPos> = policy.load_candidates(center).into_iter().collect();
        expected.extend(before.into_iter().filter(|&pos| !policy.should_evict(pos, center)));

        let resident: FxHashSet<ChunkPos> = world.resident_chunks().into_iter().collect();
        assert_eq!(resident, expected, "observer at chunk ({ix}, {iz})");
        assert!(resident.iter().all(|&pos| pos.distance_to(center) <= policy.unload_distance()));
    }
}

#[test]
fn test_hysteresis_keeps_chunk_in_band() {
    let (mut world, generator, _) = test_world(4);
    let watched = ChunkPos::from_index(4, 0);

    // 64 blocks away: inside the load distance of 72
    world.update(observer_at(0, 0), 0.1);
    assert!(world.is_chunk_loaded(watched));

    // 80 blocks away: past the load distance, short of the unload distance of 88
    let report = world.update(observer_at(-1, 0), 0.1);
    assert!(world.is_chunk_loaded(watched));
    assert!(!report.evicted.contains(&watched));

    world.update(observer_at(0, 0), 0.1);
    world.update(observer_at(-1, 0), 0.1);
    assert_eq!(generator.calls_for(watched), 1);

    // 96 blocks away: evicted
    let report = world.update(observer_at(-2, 0), 0.1);
    assert!(report.evicted.contains(&watched));
    assert!(!world.is_chunk_loaded(watched));
}

#[test]
fn test_generation_dirties_resident_neighbors_only() {
    let (mut world, _, _) = test_world(2);
    let origin = ChunkPos::from_index(0, 0);
    let east = origin.offset(1, 0);
    let far = origin.offset(5, 5);

    world.get_chunk(east);
    world.get_chunk(far);
    world.clear_dirty();

    world.get_chunk(origin);
    assert_eq!(world.dirty_chunks(), sorted(vec![origin, east]));

    // No resident neighbours: only the new chunk is dirty
    world.clear_dirty();
    let lonely = origin.offset(-10, -10);
    world.get_chunk(lonely);
    assert_eq!(world.dirty_chunks(), vec![lonely]);
}

#[test]
fn test_edge_placement_dirties_the_touching_neighbor() {
    let (mut world, _, _) = test_world(2);
    world.update(observer_at(0, 0), 0.1);
    world.clear_dirty();

    let stone = BlockData::new(BlockId::STONE);
    assert!(world.place_block(stone, VoxelPos::new(15, 70, 5)));
    assert_eq!(
        world.dirty_chunks(),
        sorted(vec![ChunkPos::from_index(0, 0), ChunkPos::from_index(1, 0)])
    );
}

#[test]
fn test_interior_placement_dirties_only_owner() {
    let (mut world, _, _) = test_world(2);
    world.update(observer_at(0, 0), 0.1);
    world.clear_dirty();

    assert!(world.place_block(BlockData::new(BlockId::GLASS), VoxelPos::new(8, 70, 8)));
    assert_eq!(world.dirty_chunks(), vec![ChunkPos::from_index(0, 0)]);
}

#[test]
fn test_corner_placement_with_negative_coordinates() {
    let (mut world, _, _) = test_world(2);
    world.update(observer_at(0, 0), 0.1);
    world.clear_dirty();

    // World (-16, y, -1) is local (0, y, 15) of chunk (-16, -16)
    assert!(world.place_block(BlockData::new(BlockId::SAND), VoxelPos::new(-16, 64, -1)));
    assert_eq!(
        world.dirty_chunks(),
        sorted(vec![
            ChunkPos::from_index(-1, -1),
            ChunkPos::from_index(-2, -1),
            ChunkPos::from_index(-1, 0),
        ])
    );
    assert_eq!(
        world.get_block_at_if_loaded(VoxelPos::new(-16, 64, -1)).map(|b| b.id),
        Some(BlockId::SAND)
    );
}

#[test]
fn test_edge_placement_loads_missing_neighbor() {
    let (mut world, _, _) = test_world(2);
    assert_eq!(world.chunk_count(), 0);

    assert!(world.place_block(BlockData::new(BlockId::STONE), VoxelPos::new(0, 100, 7)));
    assert!(world.is_chunk_loaded(ChunkPos::from_index(0, 0)));
    assert!(world.is_chunk_loaded(ChunkPos::from_index(-1, 0)));
    assert!(world.dirty_chunks().contains(&ChunkPos::from_index(-1, 0)));
}

#[test]
fn test_out_of_range_placement_is_rejected() {
    let (mut world, _, _) = test_world(1);
    world.update(observer_at(0, 0), 0.1);
    world.clear_dirty();
    let before = world.resident_chunks();

    let stone = BlockData::new(BlockId::STONE);
    assert!(!world.place_block(stone, VoxelPos::new(3, -1, 3)));
    assert!(!world.place_block(stone, VoxelPos::new(3, 256, 3)));
    assert!(!world.place_block(stone, VoxelPos::new(500, 300, 500)));
    assert_eq!(world.remove_block(VoxelPos::new(0, -5, 0)), None);

    assert_eq!(world.resident_chunks(), before);
    assert!(world.dirty_chunks().is_empty());
    assert!(!world.is_chunk_loaded(ChunkPos::from_index(31, 31)));
}

#[test]
fn test_placement_at_the_horizontal_limit() {
    use crate::constants::core::WORLD_HORIZONTAL_LIMIT;

    let (mut world, _, _) = test_world(1);
    let stone = BlockData::new(BlockId::STONE);

    let outside = VoxelPos::new(i32::MAX, 10, 0);
    assert!(!World::is_valid_block_position(outside));
    assert!(!world.place_block(stone, outside));
    assert_eq!(world.get_block_at(VoxelPos::new(i32::MIN, 10, 0)), None);
    assert_eq!(world.chunk_count(), 0);

    // The last valid column sits on a +x chunk face
    let edge = VoxelPos::new(WORLD_HORIZONTAL_LIMIT, 10, 0);
    assert_eq!(edge.to_local().x, 15);
    assert!(world.place_block(stone, edge));
    let beyond = edge.chunk_pos().offset(1, 0);
    assert!(world.is_chunk_loaded(beyond));
    assert!(world.dirty_chunks().contains(&beyond));
    assert_eq!(world.get_block_at(edge).map(|b| b.id), Some(BlockId::STONE));

    world.update(Vec3::new(3.0e9, 64.0, 0.0), 0.1);
    assert!(world.chunk_count() > 0);
}

#[test]
fn test_block_lookups() {
    let (mut world, _, _) = test_world(1);
    let pos = VoxelPos::new(100, 64, -100);

    assert_eq!(world.get_block_at_if_loaded(pos), None);
    assert!(!world.is_chunk_loaded(World::chunk_index(pos)));

    // Flat world: grass cap at y = 64
    assert_eq!(world.get_block_at(pos).map(|b| b.id), Some(BlockId::GRASS));
    assert!(world.is_chunk_loaded(World::chunk_index(pos)));
    assert_eq!(world.get_block_at_if_loaded(pos).map(|b| b.id), Some(BlockId::GRASS));
    assert_eq!(world.get_block_at(VoxelPos::new(100, 256, -100)), None);

    assert_eq!(world.remove_block(pos).map(|b| b.id), Some(BlockId::GRASS));
    assert!(world.get_block_at(pos).is_some_and(|b| b.is_air()));
    assert!(!World::is_valid_block_position(VoxelPos::new(0, -1, 0)));
    assert_eq!(World::chunk_index(VoxelPos::new(-1, 0, 16)), ChunkPos::containing(-16, 16));
}

#[test]
fn test_edits_survive_eviction() {
    let (mut world, generator, store) = test_world(2);
    let edit = VoxelPos::new(3, 90, 3);
    let edited_chunk = edit.chunk_pos();

    world.update(observer_at(0, 0), 0.1);
    assert!(world.place_block(BlockData::new(BlockId::COBBLESTONE), edit));

    let report = world.update(observer_at(20, 0), 0.1);
    assert!(report.evicted.contains(&edited_chunk));
    assert_eq!(report.saved, 1);
    assert!(report.save_failures.is_empty());
    // Only the edited chunk was written
    assert_eq!(store.len(), 1);
    assert!(store.contains(edited_chunk));

    world.update(observer_at(0, 0), 0.1);
    assert_eq!(
        world.get_block_at_if_loaded(edit).map(|b| b.id),
        Some(BlockId::COBBLESTONE)
    );
    assert_eq!(generator.calls_for(edited_chunk), 1);
    assert_eq!(world.stats().chunks_loaded, 1);
    assert_eq!(world.stats().chunks_saved, 1);
}

#[test]
fn test_eviction_without_persistence_regenerates() {
    let generator = Arc::new(TrackingGenerator::new());
    let store = Arc::new(MemoryStore::new());
    let mut world = World::with_parts(
        WorldConfig {
            persist_on_eviction: false,
            ..config(2)
        },
        Arc::new(HeadlessAssets::new()),
        generator.clone(),
        store.clone(),
    )
    .expect("World should build");

    let edit = VoxelPos::new(3, 90, 3);
    world.update(observer_at(0, 0), 0.1);
    world.place_block(BlockData::new(BlockId::COBBLESTONE), edit);
    world.update(observer_at(20, 0), 0.1);
    world.update(observer_at(0, 0), 0.1);

    assert!(store.is_empty());
    assert!(world.get_block_at_if_loaded(edit).is_some_and(|b| b.is_air()));
    assert_eq!(generator.calls_for(edit.chunk_pos()), 2);
}

#[test]
fn test_save_failure_is_reported_and_harmless() {
    let mut world = World::with_parts(
        config(2),
        Arc::new(HeadlessAssets::new()),
        Arc::new(FlatGenerator::new(7)),
        Arc::new(ReadOnlyStore),
    )
    .expect("World should build");

    let edit = VoxelPos::new(3, 90, 3);
    world.update(observer_at(0, 0), 0.1);
    world.place_block(BlockData::new(BlockId::COBBLESTONE), edit);

    let report = world.update(observer_at(20, 0), 0.1);
    assert_eq!(report.save_failures, vec![edit.chunk_pos()]);
    assert_eq!(report.saved, 0);
    assert!(!world.is_chunk_loaded(edit.chunk_pos()));

    let expected = sorted(StreamingPolicy::new(2).load_candidates(ChunkPos::from_index(20, 0)));
    assert_eq!(world.resident_chunks(), expected);
    assert_eq!(world.stats().save_failures, 1);
}

#[test]
fn test_save_all_persists_only_edits() {
    let (mut world, _, store) = test_world(1);
    world.update(observer_at(0, 0), 0.1);
    world.place_block(BlockData::new(BlockId::GLASS), VoxelPos::new(1, 70, 1));
    world.place_block(BlockData::new(BlockId::GLASS), VoxelPos::new(17, 70, 1));

    assert!(world.save_all().is_empty());
    assert_eq!(store.len(), 2);

    // Nothing left to save
    assert!(world.save_all().is_empty());
    assert_eq!(world.stats().chunks_saved, 2);
}

#[test]
fn test_add_chunk() {
    let (mut world, _, _) = test_world(1);
    let origin = ChunkPos::from_index(0, 0);
    world.get_chunk(origin);
    world.clear_dirty();

    let east = origin.offset(1, 0);
    assert!(matches!(
        world.add_chunk(east, Chunk::new(origin)),
        Err(WorldError::ChunkMismatch { .. })
    ));

    let replaced = world.add_chunk(east, Chunk::new(east)).expect("Chunk should be added");
    assert!(replaced.is_none());
    assert_eq!(world.dirty_chunks(), vec![origin, east]);

    let mut marked = Chunk::new(east);
    marked.place_block(BlockData::new(BlockId::LAVA), VoxelPos::new(20, 5, 3).to_local());
    let replaced = world.add_chunk(east, marked).expect("Chunk should be replaced");
    assert!(replaced.is_some());
    assert_eq!(
        world.get_block_at_if_loaded(VoxelPos::new(20, 5, 3)).map(|b| b.id),
        Some(BlockId::LAVA)
    );
}

#[test]
fn test_resident_chunk_is_reused() {
    let (mut world, generator, _) = test_world(1);
    let origin = ChunkPos::from_index(0, 0);
    world.get_chunk(origin);
    assert!(world.place_block(BlockData::new(BlockId::GLASS), VoxelPos::new(4, 80, 4)));
    world.get_chunk(origin);

    assert_eq!(generator.calls_for(origin), 1);
    assert_eq!(world.stats().chunks_generated, 1);
    assert_eq!(
        world.get_chunk(origin).get_block(VoxelPos::new(4, 80, 4).to_local()).map(|b| b.id),
        Some(BlockId::GLASS)
    );
}

#[test]
fn test_render_far_to_near_and_clears_dirty() {
    let (mut world, _, _) = test_world(2);
    world.update(observer_at(0, 0), 0.75);
    let mut renderer = RecordingRenderer::new();

    renderer.begin_frame();
    let drawn = world.render(observer_at(0, 0), Mat4::IDENTITY, &mut renderer);
    assert_eq!(drawn, world.chunk_count());
    assert_eq!(renderer.rebuilt.len(), drawn);
    assert_eq!(renderer.drawn.last(), Some(&ChunkPos::from_index(0, 0)));

    let observer = observer_at(0, 0);
    let distance = |pos: &ChunkPos| Vec3::new(pos.x() as f32 + 8.0, observer.y, pos.z() as f32 + 8.0).distance(observer);
    for pair in renderer.drawn.windows(2) {
        assert!(distance(&pair[0]) >= distance(&pair[1]));
    }

    // 0.75s at two frames per second is animation frame 1
    let frame = renderer.last_frame.expect("A frame was drawn");
    assert_eq!(frame.texture_offset, [1.0, 0.0]);
    assert!(frame.use_ambient_occlusion);
    assert_eq!(frame.texture_atlas, world.texture_atlas());

    assert!(world.dirty_chunks().is_empty());
    world.place_block(BlockData::new(BlockId::STONE), VoxelPos::new(8, 70, 8));
    renderer.begin_frame();
    world.render(observer_at(0, 0), Mat4::IDENTITY, &mut renderer);
    assert_eq!(renderer.rebuilt, vec![ChunkPos::from_index(0, 0)]);
}

#[test]
fn test_texture_atlas_swap() {
    let assets = Arc::new(HeadlessAssets::new());
    let mut world = World::with_parts(
        config(1),
        assets.clone(),
        Arc::new(FlatGenerator::new(7)),
        Arc::new(MemoryStore::new()),
    )
    .expect("World should build");
    let original = world.texture_atlas();

    assets.mark_missing("missing.png");
    assert!(world.set_texture_atlas("missing.png").is_err());
    assert_eq!(world.texture_atlas(), original);

    world.set_texture_atlas("other.png").expect("Atlas should load");
    assert_ne!(world.texture_atlas(), original);
    assert_eq!(world.texture_atlas_path(), std::path::Path::new("other.png"));
}

#[test]
fn test_missing_startup_atlas_is_fatal() {
    let assets = Arc::new(HeadlessAssets::new());
    let config = config(1);
    assets.mark_missing(config.texture_atlas.clone());
    let result = World::with_parts(
        config,
        assets,
        Arc::new(FlatGenerator::new(7)),
        Arc::new(MemoryStore::new()),
    );
    assert!(matches!(result, Err(WorldError::Asset(_))));
}

#[test]
fn test_settings() {
    let (mut world, _, _) = test_world(1);
    world.update(observer_at(0, 0), 0.1);
    world.clear_dirty();

    world.set_view_distance(100);
    assert_eq!(world.view_distance(), 32);
    world.set_view_distance(-3);
    assert_eq!(world.view_distance(), 1);

    world.set_use_ambient_occlusion(true);
    assert!(world.dirty_chunks().is_empty());
    world.set_use_ambient_occlusion(false);
    assert!(!world.use_ambient_occlusion());
    assert_eq!(world.dirty_chunks().len(), world.chunk_count());
}

#[test]
fn test_animation_accumulates() {
    let (mut world, _, _) = test_world(1);
    world.update(observer_at(0, 0), 0.5);
    world.update(observer_at(0, 0), 0.25);
    assert!((world.texture_animation() - 1.5).abs() < 1e-6);
}

fn parallel_world(view_distance: i32) -> (World, Arc<TrackingGenerator>) {
    let generator = Arc::new(TrackingGenerator::new());
    let mut config = config(view_distance);
    config.streaming.parallel = true;
    config.streaming.worker_threads = 3;
    config.streaming.max_requests_per_tick = 8;
    let world = World::with_parts(
        config,
        Arc::new(HeadlessAssets::new()),
        generator.clone(),
        Arc::new(MemoryStore::new()),
    )
    .expect("World should build");
    (world, generator)
}

#[test]
fn test_parallel_matches_inline_streaming() {
    let (mut inline, _, _) = test_world(3);
    let (mut parallel, generator) = parallel_world(3);

    for (ix, iz) in [(0, 0), (2, 0), (2, 2)] {
        inline.update(observer_at(ix, iz), 0.1);
        parallel.update(observer_at(ix, iz), 0.1);
        parallel.finish_pending().expect("Loader should finish");
        assert_eq!(parallel.resident_chunks(), inline.resident_chunks());
    }
    assert_eq!(generator.max_calls(), 1);
    assert_eq!(parallel.stats().pending_chunks, 0);
}

#[test]
fn test_parallel_budget_defers_requests() {
    let (mut world, _) = parallel_world(3);
    let report = world.update(observer_at(0, 0), 0.1);
    assert_eq!(report.requested, 8);
    assert!(report.deferred > 0);
    assert!(world.stats().pending_chunks <= 8);
}

#[test]
fn test_sync_access_supersedes_pending_request() {
    let (mut world, generator) = parallel_world(2);
    let center = ChunkPos::from_index(0, 0);
    world.update(observer_at(0, 0), 0.1);

    // Nearest chunks are requested first and stay pending until the next drain
    assert!(world.is_chunk_pending(center));
    assert!(!world.is_chunk_loaded(center));

    world.get_chunk(center);
    assert!(world.is_chunk_loaded(center));
    assert!(!world.is_chunk_pending(center));

    world.finish_pending().expect("Loader should finish");

    // Once inline, once by the superseded task whose result was dropped
    assert_eq!(generator.calls_for(center), 2);
    let expected = sorted(StreamingPolicy::new(2).load_candidates(center));
    assert_eq!(world.resident_chunks(), expected);
    assert_eq!(world.stats().chunks_generated as usize, expected.len());
}

#[test]
fn test_stale_completions_are_dropped() {
    let (mut world, _) = parallel_world(2);
    world.update(observer_at(0, 0), 0.1);
    world.update(observer_at(40, 40), 0.1);
    world.finish_pending().expect("Loader should finish");

    let expected = sorted(StreamingPolicy::new(2).load_candidates(ChunkPos::from_index(40, 40)));
    assert_eq!(world.resident_chunks(), expected);
}

#[test]
fn test_terrain_world_end_to_end() {
    let mut world = World::new(config(1), Arc::new(HeadlessAssets::new())).expect("World should build");
    assert_eq!(world.seed(), 7);
    world.update(Vec3::new(0.0, 100.0, 0.0), 0.1);

    let surface = world.generator().surface_height(5, 5);
    assert!(world
        .get_block_at_if_loaded(VoxelPos::new(5, surface, 5))
        .is_some_and(|b| !b.is_air()));
    assert_eq!(
        world.get_block_at_if_loaded(VoxelPos::new(5, 0, 5)).map(|b| b.id),
        Some(BlockId::BEDROCK)
    );
}
