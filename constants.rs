// Voxel World Constants - SINGLE SOURCE OF TRUTH
//
// Chunk geometry, block ids and streaming parameters live here and only here.
// The library pulls this file in with `include!`.

/// Chunk geometry
pub mod core {
    /// Horizontal edge length of a chunk column (blocks)
    pub const CHUNK_WIDTH: i32 = 16;
    /// Vertical extent of a chunk column and of the whole world (blocks)
    pub const CHUNK_HEIGHT: i32 = 256;
    pub const BLOCKS_PER_LAYER: usize = (CHUNK_WIDTH * CHUNK_WIDTH) as usize;
    pub const BLOCKS_PER_CHUNK: usize = BLOCKS_PER_LAYER * CHUNK_HEIGHT as usize;
    /// Largest |x| or |z| of a valid block. Leaves room for a full view
    /// radius plus a neighbour chunk past the edge without i32 overflow.
    pub const WORLD_HORIZONTAL_LIMIT: i32 =
        i32::MAX - (super::streaming::MAX_VIEW_DISTANCE + 2) * CHUNK_WIDTH;
}

/// Block id constants (raw u16 values)
pub mod blocks {
    pub const AIR: u16 = 0;
    pub const STONE: u16 = 1;
    pub const DIRT: u16 = 2;
    pub const GRASS: u16 = 3;
    pub const SAND: u16 = 4;
    pub const WATER: u16 = 5;
    pub const BEDROCK: u16 = 6;
    pub const GRAVEL: u16 = 7;
    pub const SNOW: u16 = 8;
    pub const OAK_WOOD: u16 = 9;
    pub const OAK_LEAVES: u16 = 10;
    pub const COBBLESTONE: u16 = 11;
    pub const GLASS: u16 = 12;
    pub const LAVA: u16 = 13;
}

/// Streaming policy
pub mod streaming {
    /// Default view distance (chunk radius)
    pub const DEFAULT_VIEW_DISTANCE: i32 = 8;
    /// Range offered by the in-game slider
    pub const UI_MIN_VIEW_DISTANCE: i32 = 1;
    pub const UI_MAX_VIEW_DISTANCE: i32 = 13;
    /// Hard clamp applied to configured view distances
    pub const MAX_VIEW_DISTANCE: i32 = 32;
    /// Extra slack added to both load and unload radii (blocks)
    pub const DISTANCE_MARGIN: f32 = 8.0;
    /// Default chunk requests handed to the worker pool per tick
    pub const DEFAULT_MAX_REQUESTS_PER_TICK: usize = 64;
}

/// Terrain generation
pub mod terrain {
    pub const DEFAULT_SEED: u32 = 1337;
    pub const SEA_LEVEL: i32 = 62;
    pub const BASE_HEIGHT: f64 = 64.0;
    pub const MOUNTAIN_AMPLITUDE: f64 = 36.0;
    pub const HILL_AMPLITUDE: f64 = 10.0;
    pub const DETAIL_AMPLITUDE: f64 = 3.0;
    pub const MIN_SURFACE: i32 = 4;
    pub const MAX_SURFACE: i32 = 200;
    pub const SNOW_LINE: i32 = 110;
    pub const DIRT_DEPTH: i32 = 3;
    pub const CAVE_THRESHOLD: f64 = 0.55;
}

/// Rendering-side timing
pub mod animation {
    /// Texture animation advance per simulated second
    pub const TEXTURE_ANIMATION_SPEED: f32 = 2.0;
    /// Atlas tile offsets of the animated texture frames
    pub const FRAME_OFFSETS: [[f32; 2]; 5] = [[0.0, 0.0], [1.0, 0.0], [2.0, 0.0], [1.0, 1.0], [2.0, 1.0]];
}

/// Default asset locations
pub mod assets {
    pub const DEFAULT_TEXTURE_ATLAS: &str = "assets/textures/default_texture.png";
    pub const DEFAULT_SHADER: &str = "assets/shaders/default";
}
