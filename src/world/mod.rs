//! The voxel world.
//!
//! - **core**: block values and coordinate systems
//! - **storage**: per-chunk block arrays and the `Chunk` type
//! - **generation**: deterministic, seed-driven chunk generators
//! - **interfaces**: renderer and asset collaborator contracts
//! - **management**: streaming policy, background loader and `World`

pub mod core;
pub mod generation;
pub mod interfaces;
pub mod management;
pub mod storage;

pub use core::{BlockData, BlockId, ChunkPos, LocalPos, Orientation, VoxelPos};
pub use generation::{FlatGenerator, TerrainGenerator, TerrainParams, WorldGenerator};
pub use interfaces::{
    AssetError, AssetLoader, ChunkRenderer, FrameContext, HeadlessAssets, RecordingRenderer,
    ShaderHandle, TextureHandle,
};
pub use management::{StreamingPolicy, TickReport, World, WorldError, WorldStats};
pub use storage::{BlockStore, Chunk};
