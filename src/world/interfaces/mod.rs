//! Collaborator contracts the world talks to but does not implement:
//! the renderer that turns chunks into draw calls, and the asset layer that
//! resolves texture and shader paths into opaque handles.

mod assets;
mod render;

pub use assets::{AssetError, AssetLoader, HeadlessAssets, ShaderHandle, TextureHandle};
pub use render::{atlas_frame_offset, ChunkRenderer, FrameContext, RecordingRenderer};
