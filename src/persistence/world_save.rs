use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::persistence::{
    atomic_write, ChunkPersistence, CompressionType, Compressor, PersistenceResult,
};
use crate::world::core::ChunkPos;

/// Chunks per region directory along each axis
const REGION_SHIFT: u32 = 5;

/// Directory-backed chunk store.
///
/// One file per chunk, grouped into region directories so no single
/// directory grows unbounded. Writes are atomic.
pub struct WorldSave {
    save_dir: PathBuf,
    compressor: Compressor,
    stats: Mutex<SaveStats>,
}

/// Counters for a [`WorldSave`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveStats {
    pub chunks_saved: u64,
    pub chunks_loaded: u64,
    pub bytes_written: u64,
}

impl std::fmt::Debug for WorldSave {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorldSave")
            .field("save_dir", &self.save_dir)
            .field("compression", &self.compressor.compression_type())
            .finish()
    }
}

impl WorldSave {
    /// Open (creating if needed) a save directory
    pub fn new<P: AsRef<Path>>(save_dir: P, compression: CompressionType) -> PersistenceResult<Self> {
        let save_dir = save_dir.as_ref().to_path_buf();
        fs::create_dir_all(save_dir.join("chunks"))?;
        log::info!(
            "[WorldSave] Opened save directory {} ({:?} compression)",
            save_dir.display(),
            compression
        );
        Ok(Self {
            save_dir,
            compressor: Compressor::new(compression),
            stats: Mutex::new(SaveStats::default()),
        })
    }

    /// Get the file path for a chunk
    pub fn chunk_path(&self, pos: ChunkPos) -> PathBuf {
        // chunks/rX/rZ/chunk_x_z.vxc, region index from the block origin
        let shift = REGION_SHIFT + crate::constants::core::CHUNK_WIDTH.trailing_zeros();
        let region_x = pos.x() >> shift;
        let region_z = pos.z() >> shift;

        self.save_dir
            .join("chunks")
            .join(format!("r{}", region_x))
            .join(format!("r{}", region_z))
            .join(format!("chunk_{}_{}.vxc", pos.x(), pos.z()))
    }

    pub fn delete_chunk(&self, pos: ChunkPos) -> PersistenceResult<()> {
        let path = self.chunk_path(pos);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn save_dir(&self) -> &Path {
        &self.save_dir
    }

    pub fn stats(&self) -> SaveStats {
        *self.stats.lock()
    }
}

impl ChunkPersistence for WorldSave {
    fn load(&self, position: ChunkPos) -> PersistenceResult<Option<Vec<u8>>> {
        let path = self.chunk_path(position);
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let data = self.compressor.decompress(&data)?;
        self.stats.lock().chunks_loaded += 1;
        Ok(Some(data))
    }

    fn save(&self, position: ChunkPos, data: &[u8]) -> PersistenceResult<()> {
        let path = self.chunk_path(position);
        let data = self.compressor.compress(data)?;
        atomic_write(&path, &data)?;

        let mut stats = self.stats.lock();
        stats.chunks_saved += 1;
        stats.bytes_written += data.len() as u64;
        log::trace!("[WorldSave] Saved chunk {} ({} bytes)", position, data.len());
        Ok(())
    }
}
