use std::collections::hash_map::Entry;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use glam::{Mat4, Vec3};
use rustc_hash::FxHashMap;

use super::loader::{load_or_generate, ChunkLoader, ChunkSource, Completion, LoaderError};
use super::streaming::StreamingPolicy;
use crate::config::{clamp_view_distance, ConfigError, WorldConfig};
use crate::constants::animation::TEXTURE_ANIMATION_SPEED;
use crate::constants::core::CHUNK_WIDTH;
use crate::persistence::{
    ChunkPersistence, ChunkSerializer, MemoryStore, PersistenceError, PersistenceResult, WorldSave,
};
use crate::world::core::{BlockData, ChunkPos, VoxelPos, PLANAR_NEIGHBORS};
use crate::world::generation::{TerrainGenerator, WorldGenerator};
use crate::world::interfaces::{
    atlas_frame_offset, AssetError, AssetLoader, ChunkRenderer, FrameContext, ShaderHandle,
    TextureHandle,
};
use crate::world::storage::Chunk;

/// World construction and management errors
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Required asset failed to load: {0}")]
    Asset(#[from] AssetError),

    #[error("Persistence initialization failed: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Chunk loader failed: {0}")]
    Loader(#[from] LoaderError),

    #[error("Chunk {found} cannot be stored at {expected}")]
    ChunkMismatch { expected: ChunkPos, found: ChunkPos },
}

/// Lifetime counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorldStats {
    pub chunks_generated: u64,
    pub chunks_loaded: u64,
    pub chunks_evicted: u64,
    pub chunks_saved: u64,
    pub save_failures: u64,
    pub resident_chunks: usize,
    pub pending_chunks: usize,
}

/// What one `update` call did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub observer_chunk: Option<ChunkPos>,
    pub evicted: Vec<ChunkPos>,
    /// Chunks that became resident this tick
    pub created: Vec<ChunkPos>,
    /// Requests handed to the loader this tick
    pub requested: usize,
    /// Wanted chunks left for a later tick by the request budget
    pub deferred: usize,
    pub saved: usize,
    pub save_failures: Vec<ChunkPos>,
}

/// The streaming voxel world.
///
/// Owns every resident chunk, keyed by grid-aligned [`ChunkPos`]. Chunks are
/// handed out only as borrows, so nothing outside the map can hold one across
/// an eviction.
pub struct World {
    chunks: FxHashMap<ChunkPos, Chunk>,
    generator: Arc<dyn WorldGenerator>,
    persistence: Arc<dyn ChunkPersistence>,
    serializer: ChunkSerializer,
    loader: Option<ChunkLoader>,
    assets: Arc<dyn AssetLoader>,

    view_distance: i32,
    use_ambient_occlusion: bool,
    persist_on_eviction: bool,
    max_requests_per_tick: usize,

    texture_atlas: TextureHandle,
    texture_atlas_path: PathBuf,
    shader: ShaderHandle,
    texture_animation: f32,

    last_observer_chunk: Option<ChunkPos>,
    stats: WorldStats,
}

impl World {
    /// World with seeded terrain, storing chunks under `config.save_dir` or
    /// in memory when no directory is configured
    pub fn new(config: WorldConfig, assets: Arc<dyn AssetLoader>) -> Result<Self, WorldError> {
        let generator = Arc::new(TerrainGenerator::new(config.seed));
        Self::with_generator(config, assets, generator)
    }

    pub fn with_generator(
        config: WorldConfig,
        assets: Arc<dyn AssetLoader>,
        generator: Arc<dyn WorldGenerator>,
    ) -> Result<Self, WorldError> {
        let persistence: Arc<dyn ChunkPersistence> = match &config.save_dir {
            Some(dir) => Arc::new(WorldSave::new(dir, config.compression)?),
            None => Arc::new(MemoryStore::new()),
        };
        Self::with_parts(config, assets, generator, persistence)
    }

    /// Fully injected construction
    pub fn with_parts(
        config: WorldConfig,
        assets: Arc<dyn AssetLoader>,
        generator: Arc<dyn WorldGenerator>,
        persistence: Arc<dyn ChunkPersistence>,
    ) -> Result<Self, WorldError> {
        config.validate()?;

        if generator.seed() != config.seed {
            log::debug!(
                "[World] Injected generator seed {} overrides configured seed {}",
                generator.seed(),
                config.seed
            );
        }

        let texture_atlas = assets.load_texture(&config.texture_atlas)?;
        let shader = assets.load_shader(&config.shader)?;

        let serializer = ChunkSerializer::adaptive();
        let loader = if config.streaming.parallel {
            Some(ChunkLoader::new(
                Arc::clone(&generator),
                Arc::clone(&persistence),
                serializer,
                config.streaming.resolved_worker_threads(),
                config.streaming.max_requests_per_tick * 4,
            )?)
        } else {
            None
        };

        let view_distance = clamp_view_distance(config.view_distance);
        log::info!(
            "[World] Created world (seed {}, view distance {}, {} streaming)",
            generator.seed(),
            view_distance,
            if loader.is_some() { "parallel" } else { "inline" }
        );

        Ok(Self {
            chunks: FxHashMap::default(),
            generator,
            persistence,
            serializer,
            loader,
            assets,
            view_distance,
            use_ambient_occlusion: config.use_ambient_occlusion,
            persist_on_eviction: config.persist_on_eviction,
            max_requests_per_tick: config.streaming.max_requests_per_tick,
            texture_atlas,
            texture_atlas_path: config.texture_atlas,
            shader,
            texture_animation: 0.0,
            last_observer_chunk: None,
            stats: WorldStats::default(),
        })
    }

    /// Advance one simulation tick around `observer`.
    ///
    /// Evicts chunks beyond the unload distance (saving edited ones when
    /// configured), then makes every chunk within the load distance
    /// resident. Eviction always completes before anything is loaded.
    pub fn update(&mut self, observer: Vec3, delta_time: f32) -> TickReport {
        self.texture_animation += delta_time * TEXTURE_ANIMATION_SPEED;

        let policy = StreamingPolicy::new(self.view_distance);
        let center = policy.observer_chunk(observer);
        self.last_observer_chunk = Some(center);

        let mut report = TickReport {
            observer_chunk: Some(center),
            ..TickReport::default()
        };

        // Eviction over a snapshot of the keys
        let snapshot: Vec<ChunkPos> = self.chunks.keys().copied().collect();
        for pos in policy.chunks_to_evict(snapshot, center) {
            self.evict_chunk(pos, &mut report);
        }

        if self.loader.is_some() {
            self.integrate_completions(&policy, center, &mut report);
            self.submit_requests(&policy, center, &mut report);
        } else {
            for pos in policy.load_candidates(center) {
                if !self.chunks.contains_key(&pos) {
                    self.generate_or_load_chunk(pos);
                    report.created.push(pos);
                }
            }
        }

        if !report.evicted.is_empty() || !report.created.is_empty() {
            log::debug!(
                "[World] Tick at {}: evicted {}, created {}, requested {}, resident {}",
                center,
                report.evicted.len(),
                report.created.len(),
                report.requested,
                self.chunks.len()
            );
        }
        report
    }

    /// Block until all background work is integrated and every chunk the
    /// last observer position wants is resident. No-op for inline streaming.
    pub fn finish_pending(&mut self) -> Result<usize, WorldError> {
        let Some(center) = self.last_observer_chunk else {
            if let Some(loader) = self.loader.as_mut() {
                loader.wait_all()?;
            }
            return Ok(0);
        };

        let policy = StreamingPolicy::new(self.view_distance);
        let mut integrated = 0;
        loop {
            let completions = match self.loader.as_mut() {
                Some(loader) => loader.wait_all()?,
                None => return Ok(integrated),
            };
            let mut report = TickReport::default();
            for completion in completions {
                self.integrate_completion(completion, &policy, center, &mut report);
            }
            integrated += report.created.len();

            self.submit_requests(&policy, center, &mut report);
            if report.requested == 0 {
                return Ok(integrated);
            }
        }
    }

    /// Produce a chunk from storage or the generator and make it resident.
    /// Resident planar neighbours are marked dirty.
    fn generate_or_load_chunk(&mut self, position: ChunkPos) -> &mut Chunk {
        let (chunk, source) = load_or_generate(
            position,
            self.generator.as_ref(),
            self.persistence.as_ref(),
            &self.serializer,
        );
        record_source(&mut self.stats, position, source);
        self.insert_chunk(position, chunk)
    }

    fn mark_neighbors_dirty(&mut self, position: ChunkPos) {
        for (dx, dz) in PLANAR_NEIGHBORS {
            if let Some(neighbor) = self.chunks.get_mut(&position.offset(dx, dz)) {
                neighbor.set_dirty();
            }
        }
    }

    fn insert_chunk(&mut self, position: ChunkPos, chunk: Chunk) -> &mut Chunk {
        self.mark_neighbors_dirty(position);
        match self.chunks.entry(position) {
            Entry::Occupied(mut entry) => {
                entry.insert(chunk);
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(chunk),
        }
    }

    /// Resident chunk at `position`, produced inline when absent
    fn resident_chunk(&mut self, position: ChunkPos) -> &mut Chunk {
        if !self.chunks.contains_key(&position) {
            if let Some(loader) = self.loader.as_mut() {
                loader.cancel(position);
            }
            self.mark_neighbors_dirty(position);
        }
        match self.chunks.entry(position) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let (chunk, source) = load_or_generate(
                    position,
                    self.generator.as_ref(),
                    self.persistence.as_ref(),
                    &self.serializer,
                );
                record_source(&mut self.stats, position, source);
                entry.insert(chunk)
            }
        }
    }

    fn integrate_completions(&mut self, policy: &StreamingPolicy, center: ChunkPos, report: &mut TickReport) {
        let completions = match self.loader.as_mut() {
            Some(loader) => loader.drain(),
            None => return,
        };
        for completion in completions {
            self.integrate_completion(completion, policy, center, report);
        }
    }

    fn integrate_completion(
        &mut self,
        completion: Completion,
        policy: &StreamingPolicy,
        center: ChunkPos,
        report: &mut TickReport,
    ) {
        let Completion { position, chunk, source } = completion;
        if self.chunks.contains_key(&position) {
            log::trace!("[World] Chunk {} already resident, dropping loader result", position);
            return;
        }
        if policy.should_evict(position, center) {
            log::trace!("[World] Chunk {} left the unload radius while loading", position);
            return;
        }
        record_source(&mut self.stats, position, source);
        self.insert_chunk(position, chunk);
        report.created.push(position);
    }

    fn submit_requests(&mut self, policy: &StreamingPolicy, center: ChunkPos, report: &mut TickReport) {
        let Some(loader) = self.loader.as_mut() else {
            return;
        };
        let budget = self.max_requests_per_tick;
        for pos in policy.load_candidates(center) {
            if self.chunks.contains_key(&pos) || loader.is_pending(pos) {
                continue;
            }
            if report.requested >= budget {
                report.deferred += 1;
                continue;
            }
            if loader.request(pos) {
                report.requested += 1;
            }
        }
        if report.deferred > 0 {
            log::warn!(
                "[World] Loader budget reached, deferred {} chunks to later ticks",
                report.deferred
            );
        }
    }

    fn evict_chunk(&mut self, position: ChunkPos, report: &mut TickReport) {
        let Some(chunk) = self.chunks.remove(&position) else {
            return;
        };
        if self.persist_on_eviction && chunk.is_modified() {
            match self.persist_chunk(&chunk) {
                Ok(()) => {
                    self.stats.chunks_saved += 1;
                    report.saved += 1;
                }
                Err(e) => {
                    log::error!("[World] Failed to save chunk {} on eviction: {}", position, e);
                    self.stats.save_failures += 1;
                    report.save_failures.push(position);
                }
            }
        }
        self.stats.chunks_evicted += 1;
        report.evicted.push(position);
    }

    fn persist_chunk(&self, chunk: &Chunk) -> PersistenceResult<()> {
        let data = self.serializer.serialize(chunk)?;
        self.persistence.save(chunk.position(), &data)
    }

    /// Save every edited resident chunk. Returns the chunks that failed.
    pub fn save_all(&mut self) -> Vec<ChunkPos> {
        let mut failed = Vec::new();
        let mut positions: Vec<ChunkPos> = self
            .chunks
            .iter()
            .filter(|(_, chunk)| chunk.is_modified())
            .map(|(pos, _)| *pos)
            .collect();
        positions.sort();

        for pos in positions {
            let result = match self.chunks.get(&pos) {
                Some(chunk) => self.persist_chunk(chunk),
                None => continue,
            };
            match result {
                Ok(()) => {
                    self.stats.chunks_saved += 1;
                    if let Some(chunk) = self.chunks.get_mut(&pos) {
                        chunk.clear_modified();
                    }
                }
                Err(e) => {
                    log::error!("[World] Failed to save chunk {}: {}", pos, e);
                    self.stats.save_failures += 1;
                    failed.push(pos);
                }
            }
        }
        log::info!("[World] Saved world ({} failures)", failed.len());
        failed
    }

    /// Resident chunk, generated or loaded on demand. Supersedes any
    /// background request for the same chunk.
    pub fn get_chunk(&mut self, position: ChunkPos) -> &Chunk {
        self.resident_chunk(position)
    }

    /// Insert an externally produced chunk, replacing any resident one.
    /// Resident neighbours are marked dirty.
    pub fn add_chunk(&mut self, position: ChunkPos, chunk: Chunk) -> Result<Option<Chunk>, WorldError> {
        if chunk.position() != position {
            return Err(WorldError::ChunkMismatch {
                expected: position,
                found: chunk.position(),
            });
        }
        if let Some(loader) = self.loader.as_mut() {
            loader.cancel(position);
        }
        let previous = self.chunks.remove(&position);
        self.insert_chunk(position, chunk);
        Ok(previous)
    }

    pub fn is_chunk_loaded(&self, position: ChunkPos) -> bool {
        self.chunks.contains_key(&position)
    }

    /// A background request for this chunk is outstanding
    pub fn is_chunk_pending(&self, position: ChunkPos) -> bool {
        self.loader
            .as_ref()
            .is_some_and(|loader| loader.is_pending(position))
    }

    /// Chunk owning a world block position
    pub fn chunk_index(position: VoxelPos) -> ChunkPos {
        position.chunk_pos()
    }

    pub fn is_valid_block_position(position: VoxelPos) -> bool {
        position.is_valid()
    }

    /// Block at a world position, loading its chunk if needed. `None` only
    /// for positions outside the vertical range.
    pub fn get_block_at(&mut self, position: VoxelPos) -> Option<BlockData> {
        if !position.is_valid() {
            return None;
        }
        self.resident_chunk(position.chunk_pos())
            .get_block(position.to_local())
    }

    /// Block at a world position if its chunk is resident. Never loads.
    pub fn get_block_at_if_loaded(&self, position: VoxelPos) -> Option<BlockData> {
        if !position.is_valid() {
            return None;
        }
        self.chunks
            .get(&position.chunk_pos())?
            .get_block(position.to_local())
    }

    /// Write a block. Fails for positions outside the vertical range.
    ///
    /// Marks the owning chunk dirty, and each planar neighbour whose shared
    /// face the block touches (loading that neighbour if needed).
    pub fn place_block(&mut self, block: BlockData, position: VoxelPos) -> bool {
        self.write_block(block, position).is_some()
    }

    /// Replace a block with air. Returns the removed block.
    pub fn remove_block(&mut self, position: VoxelPos) -> Option<BlockData> {
        self.write_block(BlockData::AIR, position)
    }

    fn write_block(&mut self, block: BlockData, position: VoxelPos) -> Option<BlockData> {
        if !Self::is_valid_block_position(position) {
            return None;
        }
        let chunk_pos = position.chunk_pos();
        let local = position.to_local();
        let previous = self.resident_chunk(chunk_pos).place_block(block, local)?;

        for (dx, dz) in PLANAR_NEIGHBORS {
            if !local.offset(dx, 0, dz).is_in_bounds() {
                self.resident_chunk(chunk_pos.offset(dx, dz)).set_dirty();
            }
        }
        Some(previous)
    }

    /// Submit resident chunks to `renderer`, farthest first.
    ///
    /// Each chunk is lent for the duration of its call together with whether
    /// it is stale; chunks the renderer accepts are no longer dirty.
    /// Returns the number of chunks submitted.
    pub fn render(&mut self, observer: Vec3, view_projection: Mat4, renderer: &mut dyn ChunkRenderer) -> usize {
        let frame = FrameContext {
            observer,
            view_projection,
            texture_offset: atlas_frame_offset(self.texture_animation),
            use_ambient_occlusion: self.use_ambient_occlusion,
            texture_atlas: self.texture_atlas,
            shader: self.shader,
        };

        let half = CHUNK_WIDTH as f32 * 0.5;
        let distance_sq = |pos: &ChunkPos| {
            let dx = pos.x() as f32 + half - observer.x;
            let dz = pos.z() as f32 + half - observer.z;
            dx * dx + dz * dz
        };
        let mut order: Vec<ChunkPos> = self.chunks.keys().copied().collect();
        order.sort_by(|a, b| distance_sq(b).total_cmp(&distance_sq(a)).then_with(|| a.cmp(b)));

        for pos in &order {
            if let Some(chunk) = self.chunks.get_mut(pos) {
                let stale = chunk.is_dirty();
                if renderer.draw_chunk(chunk, stale, &frame) {
                    chunk.clear_dirty();
                }
            }
        }
        order.len()
    }

    pub fn view_distance(&self) -> i32 {
        self.view_distance
    }

    /// Takes effect on the next `update`
    pub fn set_view_distance(&mut self, view_distance: i32) {
        self.view_distance = clamp_view_distance(view_distance);
        log::debug!("[World] View distance set to {}", self.view_distance);
    }

    pub fn use_ambient_occlusion(&self) -> bool {
        self.use_ambient_occlusion
    }

    /// Toggling marks every resident chunk dirty
    pub fn set_use_ambient_occlusion(&mut self, enabled: bool) {
        if self.use_ambient_occlusion == enabled {
            return;
        }
        self.use_ambient_occlusion = enabled;
        for chunk in self.chunks.values_mut() {
            chunk.set_dirty();
        }
    }

    /// Swap the texture atlas. On failure the current atlas stays bound.
    pub fn set_texture_atlas(&mut self, path: impl AsRef<Path>) -> Result<(), AssetError> {
        let path = path.as_ref();
        match self.assets.load_texture(path) {
            Ok(handle) => {
                self.texture_atlas = handle;
                self.texture_atlas_path = path.to_path_buf();
                log::info!("[World] Texture atlas set to {}", path.display());
                Ok(())
            }
            Err(e) => {
                log::warn!(
                    "[World] Keeping texture atlas {}: {}",
                    self.texture_atlas_path.display(),
                    e
                );
                Err(e)
            }
        }
    }

    pub fn texture_atlas(&self) -> TextureHandle {
        self.texture_atlas
    }

    pub fn texture_atlas_path(&self) -> &Path {
        &self.texture_atlas_path
    }

    pub fn shader(&self) -> ShaderHandle {
        self.shader
    }

    pub fn texture_animation(&self) -> f32 {
        self.texture_animation
    }

    pub fn seed(&self) -> u32 {
        self.generator.seed()
    }

    pub fn generator(&self) -> &dyn WorldGenerator {
        self.generator.as_ref()
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Resident chunk positions, sorted
    pub fn resident_chunks(&self) -> Vec<ChunkPos> {
        let mut positions: Vec<ChunkPos> = self.chunks.keys().copied().collect();
        positions.sort();
        positions
    }

    /// Resident chunks whose derived state is stale, sorted
    pub fn dirty_chunks(&self) -> Vec<ChunkPos> {
        let mut positions: Vec<ChunkPos> = self
            .chunks
            .iter()
            .filter(|(_, chunk)| chunk.is_dirty())
            .map(|(pos, _)| *pos)
            .collect();
        positions.sort();
        positions
    }

    /// Clear every dirty flag, as if a renderer had caught up
    pub fn clear_dirty(&mut self) {
        for chunk in self.chunks.values_mut() {
            chunk.clear_dirty();
        }
    }

    pub fn stats(&self) -> WorldStats {
        WorldStats {
            resident_chunks: self.chunks.len(),
            pending_chunks: self
                .loader
                .as_ref()
                .map_or(0, |loader| loader.pending().count()),
            ..self.stats
        }
    }
}

fn record_source(stats: &mut WorldStats, position: ChunkPos, source: ChunkSource) {
    match source {
        ChunkSource::Generated => {
            stats.chunks_generated += 1;
            log::debug!("[World] Generated chunk {}", position);
        }
        ChunkSource::Loaded => {
            stats.chunks_loaded += 1;
            log::debug!("[World] Loaded chunk {}", position);
        }
    }
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("seed", &self.generator.seed())
            .field("view_distance", &self.view_distance)
            .field("resident", &self.chunks.len())
            .field("loader", &self.loader)
            .finish()
    }
}
