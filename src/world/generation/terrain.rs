use noise::{NoiseFn, Perlin};

use super::{TerrainParams, WorldGenerator};
use crate::constants::core::{CHUNK_HEIGHT, CHUNK_WIDTH};
use crate::constants::terrain::*;
use crate::world::core::{BlockData, BlockId, ChunkPos};
use crate::world::storage::{BlockStore, Chunk};

/// Seeded noise heightmap with caves, shorelines, snow caps and trees.
///
/// Every sample is taken at absolute world coordinates, so a chunk's content
/// depends only on the seed and its own position.
pub struct TerrainGenerator {
    params: TerrainParams,
    height_noise: Perlin,
    detail_noise: Perlin,
    cave_noise: Perlin,
}

impl TerrainGenerator {
    pub fn new(seed: u32) -> Self {
        Self::with_params(TerrainParams {
            seed,
            ..TerrainParams::default()
        })
    }

    pub fn with_params(params: TerrainParams) -> Self {
        Self {
            height_noise: Perlin::new(params.seed),
            detail_noise: Perlin::new(params.seed.wrapping_add(1)),
            cave_noise: Perlin::new(params.seed.wrapping_add(2)),
            params,
        }
    }

    pub fn params(&self) -> &TerrainParams {
        &self.params
    }

    pub fn get_height(&self, world_x: f64, world_z: f64) -> i32 {
        let scale = self.params.terrain_scale;
        // Large features (mountains, valleys)
        let mountains = self
            .height_noise
            .get([world_x * scale, world_z * scale])
            * MOUNTAIN_AMPLITUDE;
        // Hills
        let hills = self
            .detail_noise
            .get([world_x * scale * 5.0, world_z * scale * 5.0])
            * HILL_AMPLITUDE;
        // Bumps
        let detail = self
            .height_noise
            .get([world_x * scale * 10.0, world_z * scale * 10.0])
            * DETAIL_AMPLITUDE;

        let height = self.params.base_height + mountains + hills + detail;
        (height as i32).clamp(MIN_SURFACE, MAX_SURFACE.min(CHUNK_HEIGHT - 8))
    }

    fn is_cave(&self, world_x: i32, y: i32, world_z: i32, surface: i32) -> bool {
        if !self.params.caves || y <= 4 || y >= surface - 4 {
            return false;
        }
        let s = self.params.terrain_scale * 6.0;
        let sample = self
            .cave_noise
            .get([world_x as f64 * s, y as f64 * s * 1.5, world_z as f64 * s]);
        sample > self.params.cave_threshold
    }

    fn place_tree(store: &mut BlockStore, x: i32, ground: i32, z: i32, trunk_height: i32) {
        let top = ground + trunk_height;
        if top + 2 >= CHUNK_HEIGHT {
            return;
        }
        let leaves = BlockData::new(BlockId::OAK_LEAVES);
        for y in top - 1..=top {
            for dx in -2..=2 {
                for dz in -2..=2 {
                    if dx * dx == 4 && dz * dz == 4 {
                        continue;
                    }
                    store.set(x + dx, y, z + dz, leaves);
                }
            }
        }
        for dx in -1..=1 {
            for dz in -1..=1 {
                store.set(x + dx, top + 1, z + dz, leaves);
            }
        }
        store.fill_column(x, z, ground + 1..top + 1, BlockData::new(BlockId::OAK_WOOD));
    }
}

/// Stateless integer hash of a world column, used for sparse decorations
fn column_hash(seed: u32, world_x: i32, world_z: i32) -> u32 {
    let mut h = (seed as u64) ^ ((world_x as u32 as u64) << 32 | world_z as u32 as u64);
    h = (h ^ (h >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    h = (h ^ (h >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    (h ^ (h >> 31)) as u32
}

impl WorldGenerator for TerrainGenerator {
    fn populate(&self, position: ChunkPos) -> Chunk {
        let mut store = BlockStore::new();
        let stone = BlockData::new(BlockId::STONE);
        let mut trees = Vec::new();

        for x in 0..CHUNK_WIDTH {
            for z in 0..CHUNK_WIDTH {
                let world_x = position.x() + x;
                let world_z = position.z() + z;
                let surface = self.get_height(world_x as f64, world_z as f64);
                let shore = surface <= self.params.sea_level + 1;

                store.set(x, 0, z, BlockData::new(BlockId::BEDROCK));
                for y in 1..surface - DIRT_DEPTH {
                    if !self.is_cave(world_x, y, world_z, surface) {
                        store.set(x, y, z, stone);
                    }
                }

                let sub_surface = if shore { BlockId::SAND } else { BlockId::DIRT };
                store.fill_column(x, z, (surface - DIRT_DEPTH).max(1)..surface, sub_surface.into());

                let top = if shore {
                    BlockId::SAND
                } else if surface >= SNOW_LINE {
                    BlockId::SNOW
                } else {
                    BlockId::GRASS
                };
                store.set(x, surface, z, top.into());

                if surface < self.params.sea_level {
                    store.fill_column(x, z, surface + 1..self.params.sea_level + 1, BlockId::WATER.into());
                }

                // Canopy stays inside the chunk so no block leaks into a neighbour
                let interior = (2..CHUNK_WIDTH - 2).contains(&x) && (2..CHUNK_WIDTH - 2).contains(&z);
                if top == BlockId::GRASS && interior {
                    let h = column_hash(self.params.seed, world_x, world_z);
                    // A rarity of 0 disables trees
                    if h.checked_rem(self.params.tree_rarity) == Some(0) {
                        trees.push((x, surface, z, 4 + ((h >> 8) % 2) as i32));
                    }
                }
            }
        }

        for (x, ground, z, trunk) in trees {
            Self::place_tree(&mut store, x, ground, z, trunk);
        }

        log::trace!(
            "[TerrainGenerator] Generated chunk {} with {} non-air blocks",
            position,
            store.count_non_air()
        );
        Chunk::from_store(position, store)
    }

    fn seed(&self) -> u32 {
        self.params.seed
    }

    fn surface_height(&self, world_x: i32, world_z: i32) -> i32 {
        self.get_height(world_x as f64, world_z as f64)
    }
}
