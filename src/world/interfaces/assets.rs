use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::RwLock;
use rustc_hash::FxHashSet;

/// Opaque texture handle issued by an [`AssetLoader`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(u32);

impl TextureHandle {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u32 {
        self.0
    }
}

/// Opaque shader program handle issued by an [`AssetLoader`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderHandle(u32);

impl ShaderHandle {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u32 {
        self.0
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("Asset not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to decode asset {path}: {reason}")]
    Decode { path: PathBuf, reason: String },
}

/// Resolves asset paths into handles. Injected into the world at
/// construction instead of being reached through global state.
pub trait AssetLoader: Send + Sync {
    fn load_texture(&self, path: &Path) -> Result<TextureHandle, AssetError>;

    fn load_shader(&self, path: &Path) -> Result<ShaderHandle, AssetError>;
}

/// Loader for runs without a GPU: every path resolves to a fresh handle
/// unless it was registered as missing.
#[derive(Debug, Default)]
pub struct HeadlessAssets {
    next_id: AtomicU32,
    missing: RwLock<FxHashSet<PathBuf>>,
}

impl HeadlessAssets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make future loads of `path` fail with [`AssetError::NotFound`]
    pub fn mark_missing(&self, path: impl Into<PathBuf>) {
        self.missing.write().insert(path.into());
    }

    fn resolve(&self, path: &Path) -> Result<u32, AssetError> {
        if path.as_os_str().is_empty() || self.missing.read().contains(path) {
            return Err(AssetError::NotFound(path.to_path_buf()));
        }
        Ok(self.next_id.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

impl AssetLoader for HeadlessAssets {
    fn load_texture(&self, path: &Path) -> Result<TextureHandle, AssetError> {
        self.resolve(path).map(TextureHandle::new)
    }

    fn load_shader(&self, path: &Path) -> Result<ShaderHandle, AssetError> {
        self.resolve(path).map(ShaderHandle::new)
    }
}
