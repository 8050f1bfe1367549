//! Persistence-specific error helpers

use std::fs;
use std::io::Write;
use std::path::Path;

use crate::persistence::{PersistenceError, PersistenceResult};

/// Create a corrupted data error
pub fn corrupted_data(reason: impl Into<String>) -> PersistenceError {
    PersistenceError::CorruptedData(reason.into())
}

/// Create a version mismatch error
pub fn version_mismatch(expected: u32, found: u32) -> PersistenceError {
    PersistenceError::VersionMismatch { expected, found }
}

/// Write a file so readers only ever observe the old or the new content.
///
/// Data goes to a sibling temp file first, is synced, then renamed over the
/// destination.
pub fn atomic_write(path: impl AsRef<Path>, data: &[u8]) -> PersistenceResult<()> {
    let path = path.as_ref();
    let parent = path.parent().ok_or_else(|| {
        PersistenceError::IoError(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("{} has no parent directory", path.display()),
        ))
    })?;
    fs::create_dir_all(parent)?;

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = Path::new(&tmp_name);

    {
        let mut file = fs::File::create(tmp_path)?;
        file.write_all(data)?;
        file.sync_all()?;
    }

    if let Err(e) = fs::rename(tmp_path, path) {
        let _ = fs::remove_file(tmp_path);
        return Err(e.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_atomic_write_replaces_content() {
        let temp_dir = TempDir::new().expect("Failed to create temporary directory for test");
        let path = temp_dir.path().join("nested").join("file.bin");

        atomic_write(&path, b"first").expect("First write should succeed");
        atomic_write(&path, b"second").expect("Second write should succeed");

        assert_eq!(fs::read(&path).expect("File should exist"), b"second");
        assert!(!temp_dir.path().join("nested").join("file.bin.tmp").exists());
    }
}
