//! World configuration, loadable from TOML.
//!
//! Every field has a default, so an empty file (or no file) yields a
//! playable world:
//!
//! ```toml
//! view_distance = 10
//! seed = 42
//! save_dir = "saves/world1"
//!
//! [streaming]
//! parallel = true
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::assets::{DEFAULT_SHADER, DEFAULT_TEXTURE_ATLAS};
use crate::constants::streaming::{
    DEFAULT_MAX_REQUESTS_PER_TICK, DEFAULT_VIEW_DISTANCE, MAX_VIEW_DISTANCE,
};
use crate::constants::terrain::DEFAULT_SEED;
use crate::persistence::CompressionType;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to write config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Radius of the resident area in chunks
    pub view_distance: i32,
    pub use_ambient_occlusion: bool,
    /// Fixed for the lifetime of a world
    pub seed: u32,
    pub texture_atlas: PathBuf,
    pub shader: PathBuf,
    /// Directory store for chunks; in-memory store when unset
    pub save_dir: Option<PathBuf>,
    /// Save edited chunks before they are evicted
    pub persist_on_eviction: bool,
    pub compression: CompressionType,
    pub streaming: StreamingConfig,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            view_distance: DEFAULT_VIEW_DISTANCE,
            use_ambient_occlusion: true,
            seed: DEFAULT_SEED,
            texture_atlas: PathBuf::from(DEFAULT_TEXTURE_ATLAS),
            shader: PathBuf::from(DEFAULT_SHADER),
            save_dir: None,
            persist_on_eviction: true,
            compression: CompressionType::default(),
            streaming: StreamingConfig::default(),
        }
    }
}

/// Background chunk loading
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    /// Generate and load chunks on a worker pool instead of inside `update`
    pub parallel: bool,
    /// Pool size; 0 means one worker per logical CPU
    pub worker_threads: usize,
    /// Upper bound on new requests submitted per tick
    pub max_requests_per_tick: usize,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            parallel: false,
            worker_threads: 0,
            max_requests_per_tick: DEFAULT_MAX_REQUESTS_PER_TICK,
        }
    }
}

impl StreamingConfig {
    pub fn resolved_worker_threads(&self) -> usize {
        if self.worker_threads == 0 {
            num_cpus::get().max(1)
        } else {
            self.worker_threads
        }
    }
}

impl WorldConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: WorldConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&raw)?;
        log::info!("[WorldConfig] Loaded {}", path.display());
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Reject values no world can run with. View distances above the
    /// supported maximum are not an error; the world clamps them.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.view_distance < 1 {
            return Err(ConfigError::InvalidValue {
                field: "view_distance",
                reason: format!("must be at least 1, got {}", self.view_distance),
            });
        }
        if self.texture_atlas.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "texture_atlas",
                reason: "path is empty".to_string(),
            });
        }
        if self.shader.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "shader",
                reason: "path is empty".to_string(),
            });
        }
        if self.streaming.parallel && self.streaming.max_requests_per_tick == 0 {
            return Err(ConfigError::InvalidValue {
                field: "streaming.max_requests_per_tick",
                reason: "parallel streaming needs at least one request per tick".to_string(),
            });
        }
        Ok(())
    }
}

/// Clamp a requested view distance into the supported range, warning when
/// the value had to change
pub fn clamp_view_distance(requested: i32) -> i32 {
    let clamped = requested.clamp(1, MAX_VIEW_DISTANCE);
    if clamped != requested {
        log::warn!(
            "[WorldConfig] View distance {} out of range, using {}",
            requested,
            clamped
        );
    }
    clamped
}
