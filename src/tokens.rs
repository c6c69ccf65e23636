//! Join and callback token bookkeeping.
//!
//! Token files hold one token per line. Join tokens are single use: a
//! successful join removes the matching line. The callback token is checked on
//! every configure call and never consumed.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::config::Layout;
use crate::files::{FileLocks, acquire, atomic_replace, read_required};
use crate::{Error, Result};

/// Check whether `token` appears as a line of `contents`.
///
/// Both sides are compared trimmed. An empty or whitespace-only token never
/// matches, even if the store contains blank lines.
pub fn contains_token(contents: &str, token: &str) -> bool {
    let token = token.trim();
    if token.is_empty() {
        return false;
    }
    contents.lines().any(|line| line.trim() == token)
}

/// Return `contents` with every line equal to `token` removed.
///
/// Remaining lines keep their exact bytes, line endings included. An empty
/// token removes nothing.
pub fn without_token(contents: &str, token: &str) -> String {
    let token = token.trim();
    if token.is_empty() {
        return contents.to_string();
    }
    contents
        .split_inclusive('\n')
        .filter(|line| line.trim() != token)
        .collect()
}

/// Token files of a node, each guarded by its own lock.
#[derive(Debug, Clone)]
pub struct TokenStore {
    join_tokens: PathBuf,
    callback: PathBuf,
    locks: Arc<FileLocks>,
}

impl TokenStore {
    pub fn new(layout: &Layout, locks: Arc<FileLocks>) -> Self {
        Self {
            join_tokens: layout.cluster_tokens_file(),
            callback: layout.callback_token_file(),
            locks,
        }
    }

    pub fn join_tokens_path(&self) -> &Path {
        &self.join_tokens
    }

    pub fn callback_path(&self) -> &Path {
        &self.callback
    }

    /// Check `token` against the store file at `store`.
    ///
    /// A missing store is an error, not an invalid token.
    pub fn validate(&self, token: &str, store: &Path) -> Result<bool> {
        let lock = self.locks.lock_for(store);
        let _guard = acquire(&lock);
        Self::validate_locked(token, store)
    }

    /// Remove every occurrence of `token` from the store file at `store`.
    pub fn revoke(&self, token: &str, store: &Path) -> Result<()> {
        let lock = self.locks.lock_for(store);
        let _guard = acquire(&lock);
        Self::revoke_locked(token, store)
    }

    /// Validate and revoke a join token in one critical section.
    ///
    /// Of several concurrent joins presenting the same token, exactly one
    /// succeeds; the rest see [`Error::InvalidCredential`].
    pub fn consume_join_token(&self, token: &str) -> Result<()> {
        let lock = self.locks.lock_for(&self.join_tokens);
        let _guard = acquire(&lock);

        if !Self::validate_locked(token, &self.join_tokens)? {
            debug!("join token rejected");
            return Err(Error::InvalidCredential);
        }
        Self::revoke_locked(token, &self.join_tokens)?;
        info!(store = %self.join_tokens.display(), "join token consumed");
        Ok(())
    }

    /// Fail with [`Error::InvalidCredential`] unless `token` is the callback token.
    pub fn check_callback_token(&self, token: &str) -> Result<()> {
        if self.validate(token, &self.callback)? {
            Ok(())
        } else {
            debug!("callback token rejected");
            Err(Error::InvalidCredential)
        }
    }

    /// The callback token handed to joining nodes.
    pub fn callback_token(&self) -> Result<String> {
        let lock = self.locks.lock_for(&self.callback);
        let _guard = acquire(&lock);
        Ok(read_required(&self.callback)?.trim().to_string())
    }

    fn validate_locked(token: &str, store: &Path) -> Result<bool> {
        let contents = read_required(store)?;
        Ok(contains_token(&contents, token))
    }

    fn revoke_locked(token: &str, store: &Path) -> Result<()> {
        let contents = read_required(store)?;
        atomic_replace(store, &without_token(&contents, token))
    }
}
