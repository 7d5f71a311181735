//! Idempotent download of match bundles with acceptance filters

use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::api::routes::Routes;
use crate::api::JsonSource;
use crate::store::{validate_match_id, write_json_atomic, BundleLayout, StoreError, StoreResult};
use crate::AcceptFilters;

/// Result of ensuring one bundle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BundleStatus {
    /// Both documents were already on disk
    Cached,
    /// The bundle was completed by this call
    Stored,
    /// The match belongs to another queue
    SkippedQueue,
    /// The match is shorter than the minimum duration
    SkippedDuration,
    /// The detail was kept but the timeline could not be fetched
    SkippedTimelineUnavailable,
}

impl BundleStatus {
    /// Whether the match counts as collected
    pub fn is_accepted(&self) -> bool {
        matches!(self, BundleStatus::Cached | BundleStatus::Stored)
    }

    /// Stable label for logs and metrics
    pub fn label(&self) -> &'static str {
        match self {
            BundleStatus::Cached => "cached",
            BundleStatus::Stored => "stored",
            BundleStatus::SkippedQueue => "skipped_queue",
            BundleStatus::SkippedDuration => "skipped_duration",
            BundleStatus::SkippedTimelineUnavailable => "skipped_timeline_unavailable",
        }
    }
}

/// Queue id and duration read from a match detail document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct MatchFacts {
    queue_id: Option<i64>,
    duration_secs: i64,
}

impl MatchFacts {
    fn from_detail(detail: &Value) -> Self {
        let info = detail.get("info");
        let queue_id = info.and_then(|i| i.get("queueId")).and_then(|q| {
            q.as_i64()
                .or_else(|| q.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
        });
        let duration_secs = info
            .and_then(|i| i.get("gameDuration"))
            .and_then(|d| d.as_i64().or_else(|| d.as_f64().map(|f| f as i64)))
            .unwrap_or(0);
        Self {
            queue_id,
            duration_secs,
        }
    }

    fn rejection(&self, filters: &AcceptFilters) -> Option<BundleStatus> {
        if let Some(wanted) = filters.queue_id {
            if self.queue_id != Some(wanted) {
                return Some(BundleStatus::SkippedQueue);
            }
        }
        if self.duration_secs < filters.min_duration_secs {
            return Some(BundleStatus::SkippedDuration);
        }
        None
    }
}

/// Fetches, filters and persists match bundles
#[derive(Clone)]
pub struct MatchBundleStore {
    source: Arc<dyn JsonSource>,
    routes: Arc<Routes>,
    layout: BundleLayout,
}

impl MatchBundleStore {
    /// Create a store writing under `layout`
    pub fn new(source: Arc<dyn JsonSource>, routes: Arc<Routes>, layout: BundleLayout) -> Self {
        Self {
            source,
            routes,
            layout,
        }
    }

    /// File layout
    pub fn layout(&self) -> &BundleLayout {
        &self.layout
    }

    /// Make sure a match bundle is on disk, if the match passes `filters`
    ///
    /// A complete bundle returns [`BundleStatus::Cached`] without any request.
    /// A detail-only stub is completed from its local detail document, which
    /// is checked against `filters` like a fetched one. A fetched detail is
    /// written only after the filters pass; a failed timeline fetch leaves it
    /// as a stub for a later run.
    ///
    /// # Errors
    /// Returns [`StoreError`] when the detail cannot be fetched or a file
    /// cannot be written.
    pub async fn ensure(&self, match_id: &str, filters: &AcceptFilters) -> StoreResult<BundleStatus> {
        validate_match_id(match_id)?;
        if self.layout.is_complete(match_id) {
            return Ok(BundleStatus::Cached);
        }

        let detail_path = self.layout.detail_path(match_id);
        let (detail, on_disk) = match read_local(&detail_path) {
            Some(detail) => (detail, true),
            None => (self.fetch(&self.routes.match_url(match_id), match_id).await?, false),
        };

        let facts = MatchFacts::from_detail(&detail);
        if let Some(rejection) = facts.rejection(filters) {
            debug!(
                match_id,
                queue_id = ?facts.queue_id,
                duration_secs = facts.duration_secs,
                reason = rejection.label(),
                "Match rejected by filters"
            );
            return Ok(rejection);
        }

        if !on_disk {
            write_json_atomic(&detail_path, &detail)?;
        }
        self.store_timeline(match_id).await
    }

    async fn store_timeline(&self, match_id: &str) -> StoreResult<BundleStatus> {
        let timeline_path = self.layout.timeline_path(match_id);
        if timeline_path.is_file() {
            return Ok(BundleStatus::Stored);
        }

        let timeline = match self
            .source
            .get_json(&self.routes.timeline_url(match_id), &[])
            .await
        {
            Ok(timeline) => timeline,
            Err(e) => {
                warn!(match_id, error = %e, "Timeline unavailable");
                return Ok(BundleStatus::SkippedTimelineUnavailable);
            }
        };

        write_json_atomic(&timeline_path, &timeline)?;
        Ok(BundleStatus::Stored)
    }

    async fn fetch(&self, url: &str, match_id: &str) -> StoreResult<Value> {
        self.source
            .get_json(url, &[])
            .await
            .map_err(|source| StoreError::Fetch {
                match_id: match_id.to_string(),
                source,
            })
    }
}

/// Previously stored detail document, if present and readable
fn read_local(path: &Path) -> Option<Value> {
    let contents = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str(&contents) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Ignoring unreadable detail document");
            None
        }
    }
}
