use glam::{IVec3, Vec3};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::core::{CHUNK_HEIGHT, CHUNK_WIDTH, WORLD_HORIZONTAL_LIMIT};

/// Offsets (in chunk widths) of the four planar neighbours: +z, +x, -z, -x
pub const PLANAR_NEIGHBORS: [(i32, i32); 4] = [(0, 1), (1, 0), (0, -1), (-1, 0)];

/// Horizontal origin of a chunk column, in world block units.
///
/// Both components are always multiples of `CHUNK_WIDTH`; the only ways to
/// build one snap to the grid, deserialization included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "RawChunkPos")]
pub struct ChunkPos {
    x: i32,
    z: i32,
}

#[derive(Deserialize)]
struct RawChunkPos {
    x: i32,
    z: i32,
}

impl From<RawChunkPos> for ChunkPos {
    fn from(raw: RawChunkPos) -> Self {
        ChunkPos::containing(raw.x, raw.z)
    }
}

impl ChunkPos {
    /// Chunk containing the world block column (world_x, world_z)
    pub fn containing(world_x: i32, world_z: i32) -> Self {
        Self {
            x: world_x - world_x.rem_euclid(CHUNK_WIDTH),
            z: world_z - world_z.rem_euclid(CHUNK_WIDTH),
        }
    }

    /// Chunk with grid index (ix, iz), i.e. origin (ix * 16, iz * 16)
    pub fn from_index(ix: i32, iz: i32) -> Self {
        Self {
            x: ix * CHUNK_WIDTH,
            z: iz * CHUNK_WIDTH,
        }
    }

    /// Chunk under a continuous world position; floors both horizontal axes
    pub fn from_world_position(position: Vec3) -> Self {
        Self::containing(position.x.floor() as i32, position.z.floor() as i32)
    }

    /// Nearest chunk whose origin lies inside the valid horizontal band
    pub fn clamped_to_world(&self) -> Self {
        Self::containing(
            self.x.clamp(-WORLD_HORIZONTAL_LIMIT, WORLD_HORIZONTAL_LIMIT),
            self.z.clamp(-WORLD_HORIZONTAL_LIMIT, WORLD_HORIZONTAL_LIMIT),
        )
    }

    pub fn x(&self) -> i32 {
        self.x
    }

    pub fn z(&self) -> i32 {
        self.z
    }

    /// Grid index (origin divided by the chunk width)
    pub fn index(&self) -> (i32, i32) {
        (self.x / CHUNK_WIDTH, self.z / CHUNK_WIDTH)
    }

    /// Offset by whole chunks. Wraps at the i32 edges, which keeps the
    /// result on the grid.
    pub fn offset(&self, dx_chunks: i32, dz_chunks: i32) -> Self {
        Self {
            x: self.x.wrapping_add(dx_chunks.wrapping_mul(CHUNK_WIDTH)),
            z: self.z.wrapping_add(dz_chunks.wrapping_mul(CHUNK_WIDTH)),
        }
    }

    pub fn neighbors(&self) -> [ChunkPos; 4] {
        PLANAR_NEIGHBORS.map(|(dx, dz)| self.offset(dx, dz))
    }

    /// Planar Euclidean distance between chunk origins, in blocks
    pub fn distance_to(&self, other: ChunkPos) -> f32 {
        let dx = (self.x as i64 - other.x as i64) as f64;
        let dz = (self.z as i64 - other.z as i64) as f64;
        (dx * dx + dz * dz).sqrt() as f32
    }

    /// World position of a local block inside this chunk
    pub fn to_world(&self, local: LocalPos) -> VoxelPos {
        VoxelPos::new(self.x + local.x, local.y, self.z + local.z)
    }
}

impl fmt::Display for ChunkPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.x, self.z)
    }
}

/// Position of a block in the world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VoxelPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl VoxelPos {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Block containing a continuous world position
    pub fn from_world_position(position: Vec3) -> Self {
        Self::new(
            position.x.floor() as i32,
            position.y.floor() as i32,
            position.z.floor() as i32,
        )
    }

    /// Chunk owning this block
    pub fn chunk_pos(&self) -> ChunkPos {
        ChunkPos::containing(self.x, self.z)
    }

    /// Position relative to the owning chunk's origin.
    ///
    /// Uses a non-negative modulo so that e.g. x = -1 maps to local 15.
    pub fn to_local(&self) -> LocalPos {
        LocalPos::new(
            self.x.rem_euclid(CHUNK_WIDTH),
            self.y,
            self.z.rem_euclid(CHUNK_WIDTH),
        )
    }

    /// Inside the vertical extent and the horizontal band
    /// `-WORLD_HORIZONTAL_LIMIT..=WORLD_HORIZONTAL_LIMIT`
    pub fn is_valid(&self) -> bool {
        let band = -WORLD_HORIZONTAL_LIMIT..=WORLD_HORIZONTAL_LIMIT;
        (0..CHUNK_HEIGHT).contains(&self.y) && band.contains(&self.x) && band.contains(&self.z)
    }

    pub fn offset(&self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }
}

impl From<IVec3> for VoxelPos {
    fn from(v: IVec3) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

impl From<VoxelPos> for IVec3 {
    fn from(v: VoxelPos) -> Self {
        IVec3::new(v.x, v.y, v.z)
    }
}

/// Block position inside a chunk. Components may be out of range; check with
/// [`LocalPos::is_in_bounds`] before indexing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LocalPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl LocalPos {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    pub fn offset(&self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    pub fn is_in_bounds(&self) -> bool {
        is_in_bounds(self.x, self.y, self.z)
    }
}

/// Pure bounds predicate for chunk-local coordinates
pub fn is_in_bounds(x: i32, y: i32, z: i32) -> bool {
    (0..CHUNK_WIDTH).contains(&x) && (0..CHUNK_HEIGHT).contains(&y) && (0..CHUNK_WIDTH).contains(&z)
}
