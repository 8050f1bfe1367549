//! In-memory chunk storage

mod block_store;
mod chunk;

pub use block_store::BlockStore;
pub use chunk::Chunk;
