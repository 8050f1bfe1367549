use super::BlockStore;
use crate::world::core::{BlockData, ChunkPos, LocalPos};

/// One resident column of the world.
///
/// `dirty` tracks derived render state (a mesh built from these blocks and
/// from the neighbours' boundary faces). `modified` tracks whether block
/// content diverged from what generation or the last load produced, which is
/// what decides whether the chunk must be saved before it is dropped.
#[derive(Debug, Clone)]
pub struct Chunk {
    position: ChunkPos,
    blocks: BlockStore,
    dirty: bool,
    modified: bool,
}

impl Chunk {
    /// Empty (all air) chunk; dirty so its first mesh gets built
    pub fn new(position: ChunkPos) -> Self {
        Self::from_store(position, BlockStore::new())
    }

    pub fn from_store(position: ChunkPos, blocks: BlockStore) -> Self {
        Self {
            position,
            blocks,
            dirty: true,
            modified: false,
        }
    }

    pub fn position(&self) -> ChunkPos {
        self.position
    }

    pub fn blocks(&self) -> &BlockStore {
        &self.blocks
    }

    /// Direct store access for generators. Does not touch the flags.
    pub fn blocks_mut(&mut self) -> &mut BlockStore {
        &mut self.blocks
    }

    pub fn get_block(&self, local: LocalPos) -> Option<BlockData> {
        self.blocks.get(local.x, local.y, local.z)
    }

    /// Edit a block. Marks the chunk dirty and modified when the write lands.
    pub fn place_block(&mut self, block: BlockData, local: LocalPos) -> Option<BlockData> {
        let previous = self.blocks.set(local.x, local.y, local.z, block)?;
        self.dirty = true;
        self.modified = true;
        Some(previous)
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn set_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn clear_modified(&mut self) {
        self.modified = false;
    }
}
