//! Streaming voxel world: an unbounded grid of 16x256x16 block columns kept
//! resident around a moving observer, generated from a seed on demand,
//! editable block by block, and persisted when edited chunks leave memory.

pub mod constants {
    include!("../constants.rs");
}

pub mod config;
pub mod persistence;
pub mod world;

pub use config::{ConfigError, StreamingConfig, WorldConfig};
pub use persistence::{ChunkPersistence, MemoryStore, PersistenceError, WorldSave};
pub use world::{
    BlockData, BlockId, Chunk, ChunkPos, TickReport, VoxelPos, World, WorldError, WorldGenerator,
    WorldStats,
};
