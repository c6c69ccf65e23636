//! Per-service argument files.
//!
//! Each managed service has a text file under `$SNAP_DATA/args/` holding one
//! command-line argument per line, usually `--key=value`. Lines are matched by
//! prefix: a line belongs to `key` if it starts with it.
//!
//! Only the first matching line counts as the key's line. Any later line that
//! also starts with the key is passed through untouched by both upsert and
//! delete, so duplicates in a hand-edited file survive a rewrite.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::files::{FileLocks, acquire, atomic_replace, read_optional, read_required};
use crate::{Error, Result};

/// Extract the value of `key` from argument file contents.
///
/// The first line starting with `key` is used. Its value is the last
/// space-separated field, cut after the last `=` and right-trimmed, so both
/// `--port=1` and `--port 1` yield `1`.
pub fn lookup(contents: &str, key: &str) -> Option<String> {
    let line = contents.lines().find(|line| line.starts_with(key))?;
    let field = line.split(' ').next_back().unwrap_or(line);
    let value = field.rsplit('=').next().unwrap_or(field);
    Some(value.trim_end().to_string())
}

/// Rewrite argument file contents for a single key.
///
/// With `Some(value)` the first line starting with `key` becomes
/// `key=value`, or the pair is appended when no line matches. With `None` the
/// first matching line is dropped. Returns `None` when nothing changes (a
/// delete of an absent key); all untouched lines keep their exact bytes.
pub fn rewrite(contents: &str, key: &str, value: Option<&str>) -> Option<String> {
    let mut out = String::with_capacity(contents.len() + key.len() + 2);
    let mut found = false;

    for line in contents.split_inclusive('\n') {
        if !found && line.starts_with(key) {
            found = true;
            if let Some(value) = value {
                out.push_str(&format!("{}={}\n", key, value));
            }
        } else {
            out.push_str(line);
        }
    }

    if !found {
        let value = value?;
        if !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(&format!("{}={}\n", key, value));
    }

    Some(out)
}

/// Check that `name` is usable as a file name inside the args directory.
pub fn check_service_name(name: &str) -> std::result::Result<(), String> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\', '\0']) {
        return Err(format!("Invalid service name: {:?}", name));
    }
    Ok(())
}

/// Check that `key` selects a single argument line.
///
/// An empty key would match every line by prefix.
pub fn check_key(key: &str) -> std::result::Result<(), String> {
    if key.trim().is_empty() || key.contains(['\n', '\r', '=']) {
        return Err(format!("Invalid argument key: {:?}", key));
    }
    Ok(())
}

pub fn check_value(value: &str) -> std::result::Result<(), String> {
    if value.contains(['\n', '\r']) {
        return Err(format!("Argument value must be a single line: {:?}", value));
    }
    Ok(())
}

/// Argument files of every managed service.
#[derive(Debug, Clone)]
pub struct ArgumentStore {
    dir: PathBuf,
    locks: Arc<FileLocks>,
}

impl ArgumentStore {
    pub fn new(dir: impl Into<PathBuf>, locks: Arc<FileLocks>) -> Self {
        Self {
            dir: dir.into(),
            locks,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of a service's argument file.
    pub fn path(&self, service: &str) -> Result<PathBuf> {
        check_service_name(service).map_err(Error::InvalidInput)?;
        Ok(self.dir.join(service))
    }

    /// Look up `key` for `service`; a missing file reads as absent.
    pub fn get(&self, service: &str, key: &str) -> Result<Option<String>> {
        let path = self.path(service)?;
        Ok(read_optional(&path)?.and_then(|contents| lookup(&contents, key)))
    }

    /// Look up `key` in a file that must exist.
    pub fn get_required(&self, service: &str, key: &str) -> Result<Option<String>> {
        let path = self.path(service)?;
        Ok(lookup(&read_required(&path)?, key))
    }

    /// Raw contents of a service's argument file.
    pub fn read_all(&self, service: &str) -> Result<String> {
        read_required(&self.path(service)?)
    }

    /// Set `key=value` for `service`, in place if the key already has a line.
    pub fn upsert(&self, service: &str, key: &str, value: &str) -> Result<()> {
        check_key(key).map_err(Error::InvalidInput)?;
        check_value(value).map_err(Error::InvalidInput)?;
        self.modify(service, key, Some(value))?;
        info!(service, key, value, "argument set");
        Ok(())
    }

    /// Remove the line for `key`; a no-op if the key is absent.
    pub fn delete(&self, service: &str, key: &str) -> Result<()> {
        check_key(key).map_err(Error::InvalidInput)?;
        if self.modify(service, key, None)? {
            info!(service, key, "argument removed");
        } else {
            debug!(service, key, "argument not present, nothing to remove");
        }
        Ok(())
    }

    fn modify(&self, service: &str, key: &str, value: Option<&str>) -> Result<bool> {
        let path = self.path(service)?;
        // Only existing files get a lock entry; the registry never shrinks
        if !path.exists() {
            return Err(Error::MissingFile { path });
        }
        let lock = self.locks.lock_for(&path);
        let _guard = acquire(&lock);

        let contents = read_required(&path)?;
        match rewrite(&contents, key, value) {
            Some(updated) => {
                atomic_replace(&path, &updated)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
