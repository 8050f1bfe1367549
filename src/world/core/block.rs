use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::blocks;

/// Unique identifier for a block type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Pod, Zeroable)]
#[repr(transparent)]
pub struct BlockId(pub u16);

impl BlockId {
    pub const AIR: BlockId = BlockId(blocks::AIR);
    pub const STONE: BlockId = BlockId(blocks::STONE);
    pub const DIRT: BlockId = BlockId(blocks::DIRT);
    pub const GRASS: BlockId = BlockId(blocks::GRASS);
    pub const SAND: BlockId = BlockId(blocks::SAND);
    pub const WATER: BlockId = BlockId(blocks::WATER);
    pub const BEDROCK: BlockId = BlockId(blocks::BEDROCK);
    pub const GRAVEL: BlockId = BlockId(blocks::GRAVEL);
    pub const SNOW: BlockId = BlockId(blocks::SNOW);
    pub const OAK_WOOD: BlockId = BlockId(blocks::OAK_WOOD);
    pub const OAK_LEAVES: BlockId = BlockId(blocks::OAK_LEAVES);
    pub const COBBLESTONE: BlockId = BlockId(blocks::COBBLESTONE);
    pub const GLASS: BlockId = BlockId(blocks::GLASS);
    pub const LAVA: BlockId = BlockId(blocks::LAVA);

    pub fn is_air(self) -> bool {
        self == BlockId::AIR
    }

    /// Blocks the renderer draws with alpha blending
    pub fn is_transparent(self) -> bool {
        matches!(
            self,
            BlockId::AIR | BlockId::WATER | BlockId::GLASS | BlockId::OAK_LEAVES
        )
    }
}

impl Default for BlockId {
    fn default() -> Self {
        BlockId::AIR
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            BlockId::AIR => write!(f, "Air"),
            BlockId::STONE => write!(f, "Stone"),
            BlockId::DIRT => write!(f, "Dirt"),
            BlockId::GRASS => write!(f, "Grass"),
            BlockId::SAND => write!(f, "Sand"),
            BlockId::WATER => write!(f, "Water"),
            BlockId::BEDROCK => write!(f, "Bedrock"),
            BlockId::GRAVEL => write!(f, "Gravel"),
            BlockId::SNOW => write!(f, "Snow"),
            BlockId::OAK_WOOD => write!(f, "Oak Wood"),
            BlockId::OAK_LEAVES => write!(f, "Oak Leaves"),
            BlockId::COBBLESTONE => write!(f, "Cobblestone"),
            BlockId::GLASS => write!(f, "Glass"),
            BlockId::LAVA => write!(f, "Lava"),
            _ => write!(f, "Block({})", self.0),
        }
    }
}

/// Facing of a placed block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Orientation {
    North = 0,
    East = 1,
    South = 2,
    West = 3,
    Up = 4,
    Down = 5,
}

impl Orientation {
    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Orientation::North),
            1 => Some(Orientation::East),
            2 => Some(Orientation::South),
            3 => Some(Orientation::West),
            4 => Some(Orientation::Up),
            5 => Some(Orientation::Down),
            _ => None,
        }
    }
}

/// One voxel: a block type plus orientation and a free metadata byte.
///
/// Plain old data so a whole chunk can be viewed as a byte slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Pod, Zeroable)]
#[repr(C)]
pub struct BlockData {
    pub id: BlockId,
    orientation: u8,
    pub metadata: u8,
}

impl BlockData {
    pub const AIR: BlockData = BlockData::new(BlockId::AIR);

    pub const fn new(id: BlockId) -> Self {
        Self {
            id,
            orientation: Orientation::North as u8,
            metadata: 0,
        }
    }

    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation as u8;
        self
    }

    pub fn with_metadata(mut self, metadata: u8) -> Self {
        self.metadata = metadata;
        self
    }

    /// Unknown raw values decode as `North`
    pub fn orientation(&self) -> Orientation {
        Orientation::from_raw(self.orientation).unwrap_or(Orientation::North)
    }

    pub fn is_air(&self) -> bool {
        self.id.is_air()
    }
}

impl From<BlockId> for BlockData {
    fn from(id: BlockId) -> Self {
        BlockData::new(id)
    }
}
