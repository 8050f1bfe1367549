use glam::Vec3;

use crate::constants::core::CHUNK_WIDTH;
use crate::constants::streaming::DISTANCE_MARGIN;
use crate::world::core::ChunkPos;

/// Load/unload policy for one view distance.
///
/// A chunk is wanted when its origin is within `load_distance` of the
/// observer's chunk and is dropped only once it is beyond `unload_distance`,
/// one chunk width further out. Distances are planar, in blocks, measured
/// between chunk origins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamingPolicy {
    view_distance: i32,
}

impl StreamingPolicy {
    pub fn new(view_distance: i32) -> Self {
        Self {
            view_distance: view_distance.max(0),
        }
    }

    pub fn view_distance(&self) -> i32 {
        self.view_distance
    }

    pub fn load_distance(&self) -> f32 {
        (self.view_distance * CHUNK_WIDTH) as f32 + DISTANCE_MARGIN
    }

    pub fn unload_distance(&self) -> f32 {
        ((self.view_distance + 1) * CHUNK_WIDTH) as f32 + DISTANCE_MARGIN
    }

    /// Chunk under the observer (horizontal position floored to the grid),
    /// pulled back inside the valid horizontal band
    pub fn observer_chunk(&self, observer: Vec3) -> ChunkPos {
        ChunkPos::from_world_position(observer).clamped_to_world()
    }

    pub fn should_load(&self, position: ChunkPos, center: ChunkPos) -> bool {
        position.distance_to(center) <= self.load_distance()
    }

    pub fn should_evict(&self, position: ChunkPos, center: ChunkPos) -> bool {
        position.distance_to(center) > self.unload_distance()
    }

    /// Resident chunks to drop, evaluated over a snapshot taken by the caller
    pub fn chunks_to_evict(
        &self,
        resident: impl IntoIterator<Item = ChunkPos>,
        center: ChunkPos,
    ) -> Vec<ChunkPos> {
        resident
            .into_iter()
            .filter(|&pos| self.should_evict(pos, center))
            .collect()
    }

    /// Every chunk within load distance, nearest first.
    ///
    /// Scans the square of `view_distance` chunks around the center in each
    /// direction, which covers the whole load circle, and filters by distance.
    pub fn load_candidates(&self, center: ChunkPos) -> Vec<ChunkPos> {
        let v = self.view_distance;
        let mut candidates: Vec<ChunkPos> = (-v..=v)
            .flat_map(|dx| (-v..=v).map(move |dz| center.offset(dx, dz)))
            .filter(|&pos| self.should_load(pos, center))
            .collect();
        candidates.sort_by(|a, b| {
            a.distance_to(center)
                .total_cmp(&b.distance_to(center))
                .then_with(|| a.cmp(b))
        });
        candidates
    }
}
