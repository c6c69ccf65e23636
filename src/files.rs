//! File primitives shared by the token and argument stores.
//!
//! Both stores rewrite whole files: every mutation is staged in a temporary
//! file next to the target and renamed over it, so readers only ever see the
//! old or the new content. Writers are serialized through [`FileLocks`].

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tempfile::NamedTempFile;

use crate::{Error, Result};

/// Registry of per-path mutexes.
///
/// Each distinct backing file gets its own lock, created lazily on first use.
/// Holders keep the lock for the full read-modify-write sequence.
#[derive(Debug, Default)]
pub struct FileLocks {
    locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl FileLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the lock guarding `path`.
    pub fn lock_for(&self, path: &Path) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(path.to_path_buf()).or_default())
    }

    /// Number of paths with a registered lock.
    pub fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Acquire a file lock, ignoring poison.
///
/// A panicking holder can never leave a half-written file behind (writes go
/// through [`atomic_replace`]), so the protected state is always consistent.
pub fn acquire(lock: &Mutex<()>) -> MutexGuard<'_, ()> {
    lock.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Read a file that must exist.
///
/// A missing file becomes [`Error::MissingFile`]; other failures stay IO errors.
pub fn read_required(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| missing_or_io(path, e))
}

/// Read a file, returning `None` if it does not exist.
pub fn read_optional(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok(Some(contents)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::Io(e)),
    }
}

fn missing_or_io(path: &Path, e: io::Error) -> Error {
    if e.kind() == io::ErrorKind::NotFound {
        Error::MissingFile {
            path: path.to_path_buf(),
        }
    } else {
        Error::Io(e)
    }
}

/// Replace `path` with `contents` atomically.
///
/// The new content is written to a temporary file in the same directory, the
/// original file's permission bits are copied onto it, and it is renamed over
/// the original. `path` must already exist.
pub fn atomic_replace(path: &Path, contents: &str) -> Result<()> {
    let permissions = fs::metadata(path)
        .map_err(|e| missing_or_io(path, e))?
        .permissions();
    let dir = path
        .parent()
        .ok_or_else(|| Error::InvalidInput(format!("No parent directory: {}", path.display())))?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(contents.as_bytes())?;
    tmp.as_file().sync_all()?;
    fs::set_permissions(tmp.path(), permissions)?;
    tmp.persist(path).map_err(|e| Error::Io(e.error))?;

    Ok(())
}
