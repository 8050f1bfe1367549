use crate::constants::core::{BLOCKS_PER_CHUNK, BLOCKS_PER_LAYER, CHUNK_HEIGHT, CHUNK_WIDTH};
use crate::world::core::{is_in_bounds, BlockData, LocalPos};

/// Fixed-capacity block array of one chunk column.
///
/// Layout is layer-major: `index = x + z * WIDTH + y * WIDTH * WIDTH`, so a
/// run over the flat slice walks one horizontal layer at a time. Accessors
/// take chunk-local coordinates and are bounds checked.
#[derive(Clone, PartialEq, Eq)]
pub struct BlockStore {
    blocks: Box<[BlockData]>,
}

impl BlockStore {
    /// Store filled with air
    pub fn new() -> Self {
        Self::filled(BlockData::AIR)
    }

    pub fn filled(block: BlockData) -> Self {
        Self {
            blocks: vec![block; BLOCKS_PER_CHUNK].into_boxed_slice(),
        }
    }

    /// Build from a flat layer-major array; `None` if the length is wrong
    pub fn from_vec(blocks: Vec<BlockData>) -> Option<Self> {
        if blocks.len() != BLOCKS_PER_CHUNK {
            return None;
        }
        Some(Self {
            blocks: blocks.into_boxed_slice(),
        })
    }

    #[inline(always)]
    fn index(x: i32, y: i32, z: i32) -> usize {
        x as usize + z as usize * CHUNK_WIDTH as usize + y as usize * BLOCKS_PER_LAYER
    }

    /// Inverse of the flat index
    pub fn position_of(index: usize) -> LocalPos {
        let width = CHUNK_WIDTH as usize;
        LocalPos::new(
            (index % width) as i32,
            (index / BLOCKS_PER_LAYER) as i32,
            ((index / width) % width) as i32,
        )
    }

    /// Block at a local position, `None` when out of bounds
    #[inline]
    pub fn get(&self, x: i32, y: i32, z: i32) -> Option<BlockData> {
        if !is_in_bounds(x, y, z) {
            return None;
        }
        Some(self.blocks[Self::index(x, y, z)])
    }

    /// Write a block; returns the previous value, or `None` (and writes
    /// nothing) when out of bounds
    #[inline]
    pub fn set(&mut self, x: i32, y: i32, z: i32, block: BlockData) -> Option<BlockData> {
        if !is_in_bounds(x, y, z) {
            return None;
        }
        let slot = &mut self.blocks[Self::index(x, y, z)];
        Some(std::mem::replace(slot, block))
    }

    /// Fill a vertical span of one column, clipped to the store
    pub fn fill_column(&mut self, x: i32, z: i32, y_range: std::ops::Range<i32>, block: BlockData) {
        let start = y_range.start.max(0);
        let end = y_range.end.min(CHUNK_HEIGHT);
        for y in start..end {
            self.set(x, y, z, block);
        }
    }

    /// Highest non-air block in a column
    pub fn top_solid(&self, x: i32, z: i32) -> Option<i32> {
        (0..CHUNK_HEIGHT)
            .rev()
            .find(|&y| self.get(x, y, z).is_some_and(|b| !b.is_air()))
    }

    pub fn as_slice(&self) -> &[BlockData] {
        &self.blocks
    }

    pub fn count_non_air(&self) -> usize {
        self.blocks.iter().filter(|b| !b.is_air()).count()
    }
}

impl Default for BlockStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for BlockStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockStore")
            .field("len", &self.blocks.len())
            .field("non_air", &self.count_non_air())
            .finish()
    }
}
