//! Match bundle persistence
//!
//! A bundle is the detail document and the timeline document of one match,
//! stored as `<raw_dir>/<match_id>.json` and `<raw_dir>/<match_id>_timeline.json`.
//! Every document is written atomically, pretty-printed with sorted keys, so
//! rewriting unchanged content produces identical bytes.

use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::api::ApiError;

pub mod bundle;

pub use bundle::{BundleStatus, MatchBundleStore};

/// Suffix distinguishing timeline files from detail files
pub const TIMELINE_SUFFIX: &str = "_timeline";

/// Bundle store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A remote fetch failed
    #[error("match {match_id}: {source}")]
    Fetch {
        /// Match being stored
        match_id: String,
        /// Underlying API error
        #[source]
        source: ApiError,
    },

    /// The match id cannot be used as a file name
    #[error("invalid match id: {0:?}")]
    InvalidMatchId(String),

    /// A file could not be read or written
    #[error("IO error at {path}: {reason}")]
    Io {
        /// File or directory involved
        path: PathBuf,
        /// Underlying failure
        reason: String,
    },

    /// A document could not be serialized
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// File naming inside the raw directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleLayout {
    raw_dir: PathBuf,
}

impl BundleLayout {
    /// Layout rooted at `raw_dir`
    pub fn new(raw_dir: impl Into<PathBuf>) -> Self {
        Self {
            raw_dir: raw_dir.into(),
        }
    }

    /// Raw directory
    pub fn raw_dir(&self) -> &Path {
        &self.raw_dir
    }

    /// Path of the detail document
    pub fn detail_path(&self, match_id: &str) -> PathBuf {
        self.raw_dir.join(format!("{match_id}.json"))
    }

    /// Path of the timeline document
    pub fn timeline_path(&self, match_id: &str) -> PathBuf {
        self.raw_dir.join(format!("{match_id}{TIMELINE_SUFFIX}.json"))
    }

    /// Whether both documents exist
    pub fn is_complete(&self, match_id: &str) -> bool {
        self.detail_path(match_id).is_file() && self.timeline_path(match_id).is_file()
    }

    /// Ids whose detail document exists without a timeline, sorted
    ///
    /// A missing raw directory has no stubs.
    pub fn detail_only_ids(&self) -> StoreResult<BTreeSet<String>> {
        let entries = match std::fs::read_dir(&self.raw_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeSet::new()),
            Err(e) => return Err(io_error(&self.raw_dir, e)),
        };

        let mut stubs = BTreeSet::new();
        for entry in entries {
            let entry = entry.map_err(|e| io_error(&self.raw_dir, e))?;
            let name = entry.file_name();
            let Some(stem) = name.to_str().and_then(|n| n.strip_suffix(".json")) else {
                continue;
            };
            if stem.ends_with(TIMELINE_SUFFIX) || validate_match_id(stem).is_err() {
                continue;
            }
            if !self.timeline_path(stem).is_file() {
                stubs.insert(stem.to_string());
            }
        }
        Ok(stubs)
    }
}

/// Reject ids that would escape the raw directory or produce odd file names
pub fn validate_match_id(match_id: &str) -> StoreResult<()> {
    let bad = match_id.is_empty()
        || match_id.contains(['/', '\\'])
        || match_id.contains("..")
        || match_id.chars().any(char::is_control);
    if bad {
        Err(StoreError::InvalidMatchId(match_id.to_string()))
    } else {
        Ok(())
    }
}

/// Recursively rebuild a document with object keys in sorted order
pub fn sorted_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut sorted = Map::new();
            for key in keys {
                sorted.insert(key.clone(), sorted_keys(&map[key]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(sorted_keys).collect()),
        other => other.clone(),
    }
}

/// Write a document pretty-printed with sorted keys, replacing `path` atomically
pub fn write_json_atomic(path: &Path, value: &Value) -> StoreResult<()> {
    let json = serde_json::to_string_pretty(&sorted_keys(value))
        .map_err(|e| StoreError::Serialization(e.to_string()))?;
    write_bytes_atomic(path, json.as_bytes()).map_err(|e| io_error(path, e))
}

/// Replace `path` with `bytes` through a synced temp file in the same directory
pub(crate) fn write_bytes_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let parent_dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent_dir)?;

    let mut temp_file = tempfile::NamedTempFile::new_in(parent_dir)?;
    temp_file.write_all(bytes)?;
    temp_file.flush()?;
    temp_file.as_file().sync_all()?;
    temp_file.persist(path).map_err(|e| e.error)?;

    // Make the rename durable
    if let Ok(dir) = std::fs::File::open(parent_dir) {
        let _ = dir.sync_all();
    }
    Ok(())
}

fn io_error(path: &Path, e: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.to_path_buf(),
        reason: e.to_string(),
    }
}
