//! Core world data types: block values and the coordinate systems that
//! address them (world blocks, chunk columns, chunk-local blocks).

mod block;
mod position;

pub use block::{BlockData, BlockId, Orientation};
pub use position::{is_in_bounds, ChunkPos, LocalPos, VoxelPos, PLANAR_NEIGHBORS};
