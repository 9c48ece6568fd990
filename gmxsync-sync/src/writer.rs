//! Atomic writer.
//!
//! 1. Compare the new bytes with the target on disk; skip when identical.
//! 2. Create the parent directory.
//! 3. Write to `<path>.gmxsync.tmp`.
//! 4. Rename to the final path (atomic on POSIX); remove the tmp on failure.
//!
//! The comparison is against the disk, not a stored hash, so a target that
//! was edited behind the engine's back is always rewritten.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{io_err, SyncError};

/// Outcome of an individual file write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteResult {
    /// File was written (content changed or did not previously exist).
    Written { path: PathBuf },
    /// File was skipped; the target already holds these bytes.
    Unchanged { path: PathBuf },
}

impl WriteResult {
    pub fn path(&self) -> &Path {
        match self {
            WriteResult::Written { path } | WriteResult::Unchanged { path } => path,
        }
    }

    pub fn was_written(&self) -> bool {
        matches!(self, WriteResult::Written { .. })
    }
}

/// Atomically replace `path` with `content` unless it already holds it.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<WriteResult, SyncError> {
    atomic_write_with_tmp(path, content, &tmp_path(path))
}

pub(crate) fn tmp_path(path: &Path) -> PathBuf {
    PathBuf::from(format!("{}.gmxsync.tmp", path.display()))
}

fn atomic_write_with_tmp(path: &Path, content: &[u8], tmp: &Path) -> Result<WriteResult, SyncError> {
    match std::fs::read(path) {
        Ok(existing) if existing == content => {
            tracing::debug!("unchanged: {}", path.display());
            return Ok(WriteResult::Unchanged {
                path: path.to_path_buf(),
            });
        }
        Ok(_) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(io_err(path, e)),
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    std::fs::write(tmp, content).map_err(|e| io_err(tmp, e))?;

    if let Err(e) = std::fs::rename(tmp, path) {
        let _ = std::fs::remove_file(tmp);
        return Err(io_err(path, e));
    }

    tracing::debug!("wrote: {}", path.display());
    Ok(WriteResult::Written {
        path: path.to_path_buf(),
    })
}

/// Read `path` fully, annotating errors with the path.
pub(crate) fn read(path: &Path) -> Result<Vec<u8>, SyncError> {
    std::fs::read(path).map_err(|e| io_err(path, e))
}

pub(crate) fn read_text(path: &Path) -> Result<String, SyncError> {
    String::from_utf8(read(path)?).map_err(|e| SyncError::Utf8 {
        path: path.to_path_buf(),
        source: e.utf8_error(),
    })
}
