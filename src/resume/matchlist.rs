//! Durable ordered list of accepted match ids

use fd_lock::RwLock;
use std::collections::HashSet;
use std::fs::OpenOptions;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::store::write_bytes_atomic;

/// Match list errors
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// The file exists but is not a JSON array of strings
    #[error("corrupt match list {path}: {reason}")]
    Corrupt {
        /// Match list path
        path: String,
        /// Parser message
        reason: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    IoError(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// Lock acquisition failed
    #[error("lock error: {0}")]
    LockError(String),
}

/// Accepted match ids in discovery order, with O(1) membership
///
/// The membership set always holds exactly the elements of the ordered list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchList {
    ids: Vec<String>,
    known: HashSet<String>,
    dirty: bool,
}

impl MatchList {
    /// Empty list
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from ids in order, dropping repeats
    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut list = Self::new();
        for id in ids {
            list.push_unique(id.into());
        }
        list
    }

    /// Load the list at `path`; an absent file is an empty list
    ///
    /// # Errors
    /// [`StateError::Corrupt`] when the file is not a JSON array of strings.
    pub fn load(path: &Path) -> Result<Self, StateError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No match list yet, starting empty");
                return Ok(Self::new());
            }
            Err(e) => return Err(StateError::IoError(format!("{}: {e}", path.display()))),
        };

        let ids: Vec<String> = serde_json::from_str(&contents).map_err(|e| StateError::Corrupt {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let listed = ids.len();
        let list = Self::from_ids(ids);
        if list.len() < listed {
            warn!(
                path = %path.display(),
                dropped = listed - list.len(),
                "Match list contained repeated ids"
            );
        }
        info!(path = %path.display(), matches = list.len(), "Match list loaded");
        Ok(list)
    }

    /// Whether `match_id` is already accepted
    pub fn contains(&self, match_id: &str) -> bool {
        self.known.contains(match_id)
    }

    /// Append `match_id` if absent; returns whether it was added
    pub fn accept(&mut self, match_id: &str) -> bool {
        if self.known.contains(match_id) {
            return false;
        }
        self.push_unique(match_id.to_string());
        self.dirty = true;
        true
    }

    /// Number of accepted ids
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether no id has been accepted
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Ids in discovery order
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Whether there are unflushed acceptances
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Replace the file at `path` with the full list if anything changed
    ///
    /// Returns whether a write happened. The write goes through a temp file
    /// and an advisory lock on `<path>.lock`.
    pub fn flush(&mut self, path: &Path) -> Result<bool, StateError> {
        if !self.dirty {
            return Ok(false);
        }

        let json = serde_json::to_string_pretty(&self.ids)
            .map_err(|e| StateError::SerializationError(e.to_string()))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| StateError::IoError(e.to_string()))?;
        }

        let lock_path = path.with_extension("lock");
        let lock_file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| StateError::LockError(format!("Failed to create lock file: {e}")))?;
        let mut lock = RwLock::new(lock_file);
        let _guard = lock
            .write()
            .map_err(|e| StateError::LockError(format!("Failed to acquire write lock: {e}")))?;

        write_bytes_atomic(path, json.as_bytes())
            .map_err(|e| StateError::IoError(format!("{}: {e}", path.display())))?;

        self.dirty = false;
        debug!(path = %path.display(), matches = self.ids.len(), "Match list flushed");
        Ok(true)
    }

    fn push_unique(&mut self, id: String) {
        if self.known.insert(id.clone()) {
            self.ids.push(id);
        }
    }
}
