use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::persistence::{ChunkPersistence, PersistenceResult};
use crate::world::core::ChunkPos;

/// In-process chunk store. Default gateway when no save directory is
/// configured: edits survive eviction for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    chunks: RwLock<FxHashMap<ChunkPos, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.chunks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.read().is_empty()
    }

    pub fn contains(&self, position: ChunkPos) -> bool {
        self.chunks.read().contains_key(&position)
    }

    pub fn remove(&self, position: ChunkPos) -> Option<Vec<u8>> {
        self.chunks.write().remove(&position)
    }
}

impl ChunkPersistence for MemoryStore {
    fn load(&self, position: ChunkPos) -> PersistenceResult<Option<Vec<u8>>> {
        Ok(self.chunks.read().get(&position).cloned())
    }

    fn save(&self, position: ChunkPos, data: &[u8]) -> PersistenceResult<()> {
        self.chunks.write().insert(position, data.to_vec());
        Ok(())
    }
}
