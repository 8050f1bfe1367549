//! Chunk persistence: the storage gateway contract, the on-disk chunk format
//! and the two stores shipped with the crate.

pub mod chunk_serializer;
pub mod compression;
pub mod error;
pub mod memory;
pub mod world_save;

pub use chunk_serializer::{ChunkFormat, ChunkSerializer, CHUNK_FORMAT_VERSION};
pub use compression::{CompressionType, Compressor};
pub use error::{atomic_write, corrupted_data, version_mismatch};
pub use memory::MemoryStore;
pub use world_save::{SaveStats, WorldSave};

use crate::world::core::ChunkPos;

/// Result type for persistence operations
pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Errors that can occur during persistence operations
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    #[error("Compression error: {0}")]
    CompressionError(String),

    #[error("Version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },

    #[error("Corrupted data: {0}")]
    CorruptedData(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

impl From<bincode::Error> for PersistenceError {
    fn from(err: bincode::Error) -> Self {
        PersistenceError::SerializationError(err.to_string())
    }
}

/// Storage gateway for serialized chunks.
///
/// Stores only move opaque bytes keyed by chunk position; encoding lives in
/// [`ChunkSerializer`]. `load` returns `Ok(None)` when nothing was ever saved
/// for the position. Implementations are called from loader worker threads.
pub trait ChunkPersistence: Send + Sync {
    fn load(&self, position: ChunkPos) -> PersistenceResult<Option<Vec<u8>>>;

    fn save(&self, position: ChunkPos, data: &[u8]) -> PersistenceResult<()>;
}
