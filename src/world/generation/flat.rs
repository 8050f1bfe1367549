use super::WorldGenerator;
use crate::constants::core::CHUNK_WIDTH;
use crate::world::core::{BlockData, BlockId, ChunkPos};
use crate::world::storage::{BlockStore, Chunk};

/// Layered flat world: bedrock, stone, dirt, then a grass cap.
///
/// Useful for tests and debugging since every chunk is identical.
#[derive(Debug, Clone)]
pub struct FlatGenerator {
    seed: u32,
    layers: Vec<(BlockId, i32)>,
}

impl FlatGenerator {
    pub fn new(seed: u32) -> Self {
        Self::with_layers(
            seed,
            vec![
                (BlockId::BEDROCK, 1),
                (BlockId::STONE, 60),
                (BlockId::DIRT, 3),
                (BlockId::GRASS, 1),
            ],
        )
    }

    /// Layers listed bottom to top as (block, thickness)
    pub fn with_layers(seed: u32, layers: Vec<(BlockId, i32)>) -> Self {
        Self { seed, layers }
    }

    fn height(&self) -> i32 {
        self.layers.iter().map(|(_, thickness)| thickness).sum()
    }
}

impl WorldGenerator for FlatGenerator {
    fn populate(&self, position: ChunkPos) -> Chunk {
        let mut store = BlockStore::new();
        for x in 0..CHUNK_WIDTH {
            for z in 0..CHUNK_WIDTH {
                let mut y = 0;
                for &(block, thickness) in &self.layers {
                    store.fill_column(x, z, y..y + thickness, BlockData::new(block));
                    y += thickness;
                }
            }
        }
        Chunk::from_store(position, store)
    }

    fn seed(&self) -> u32 {
        self.seed
    }

    fn surface_height(&self, _world_x: i32, _world_z: i32) -> i32 {
        self.height() - 1
    }
}
