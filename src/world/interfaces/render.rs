use glam::{Mat4, Vec3};

use super::{ShaderHandle, TextureHandle};
use crate::constants::animation::FRAME_OFFSETS;
use crate::world::core::ChunkPos;
use crate::world::storage::Chunk;

/// Per-frame state handed to the renderer alongside each chunk
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameContext {
    pub observer: Vec3,
    pub view_projection: Mat4,
    /// Atlas offset (in tiles) of the current animated texture frame
    pub texture_offset: [f32; 2],
    pub use_ambient_occlusion: bool,
    pub texture_atlas: TextureHandle,
    pub shader: ShaderHandle,
}

/// Draw submission for resident chunks.
///
/// The chunk reference is only valid for the duration of the call; the world
/// may evict and drop the chunk on the next tick. `stale` is true when the
/// chunk's blocks or a neighbour changed since its derived state was last
/// accepted. Returning `true` means the renderer's derived state for the
/// chunk is now current, and the world clears the chunk's dirty flag.
pub trait ChunkRenderer {
    fn draw_chunk(&mut self, chunk: &Chunk, stale: bool, frame: &FrameContext) -> bool;
}

/// Atlas offset of the animation frame for an accumulated animation time
pub fn atlas_frame_offset(animation_time: f32) -> [f32; 2] {
    let frame = (animation_time.max(0.0).floor() as usize) % FRAME_OFFSETS.len();
    FRAME_OFFSETS[frame]
}

/// Renderer that draws nothing and remembers what it was asked to draw.
/// Used by the headless binary and by tests.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    /// Chunks in submission order for the last frame
    pub drawn: Vec<ChunkPos>,
    /// Chunks that were submitted stale in the last frame
    pub rebuilt: Vec<ChunkPos>,
    pub last_frame: Option<FrameContext>,
    pub frames: u64,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new frame record
    pub fn begin_frame(&mut self) {
        self.drawn.clear();
        self.rebuilt.clear();
        self.frames += 1;
    }
}

impl ChunkRenderer for RecordingRenderer {
    fn draw_chunk(&mut self, chunk: &Chunk, stale: bool, frame: &FrameContext) -> bool {
        self.drawn.push(chunk.position());
        if stale {
            self.rebuilt.push(chunk.position());
        }
        self.last_frame = Some(*frame);
        true
    }
}
