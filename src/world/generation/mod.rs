//! Procedural chunk generation.
//!
//! A generator is a pure mapping `(seed, ChunkPos) -> Chunk`: it holds no
//! mutable state and never looks at other chunks, so evicted chunks can be
//! regenerated bit-for-bit and generation can run on any thread.

mod flat;
mod terrain;

pub use flat::FlatGenerator;
pub use terrain::TerrainGenerator;

use crate::constants::terrain::{BASE_HEIGHT, CAVE_THRESHOLD, DEFAULT_SEED, SEA_LEVEL};
use crate::world::core::ChunkPos;
use crate::world::storage::Chunk;

/// Universal world generation interface
pub trait WorldGenerator: Send + Sync {
    /// Produce the chunk at `position`. Must be deterministic in
    /// (seed, position) and independent of any other chunk.
    fn populate(&self, position: ChunkPos) -> Chunk;

    fn seed(&self) -> u32;

    /// Height of the topmost generated block of a column
    fn surface_height(&self, world_x: i32, world_z: i32) -> i32;
}

/// Terrain generation parameters
#[derive(Debug, Clone, Copy)]
pub struct TerrainParams {
    pub seed: u32,
    pub sea_level: i32,
    pub base_height: f64,
    pub terrain_scale: f64,
    pub caves: bool,
    pub cave_threshold: f64,
    /// One tree per this many eligible columns, on average; 0 disables trees
    pub tree_rarity: u32,
}

impl Default for TerrainParams {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            sea_level: SEA_LEVEL,
            base_height: BASE_HEIGHT,
            terrain_scale: 0.01,
            caves: true,
            cave_threshold: CAVE_THRESHOLD,
            tree_rarity: 97,
        }
    }
}
