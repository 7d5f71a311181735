//! Skip tally and run summary

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::store::BundleStatus;

/// Why a candidate match or player did not contribute a new acceptance
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SkipReason {
    /// Match id already accepted or being processed
    DuplicateId,
    /// Match belongs to another queue
    Queue,
    /// Match shorter than the minimum duration
    Duration,
    /// Timeline fetch failed; the detail stays as a stub
    TimelineUnavailable,
    /// Match detail could not be downloaded or written
    DownloadError,
    /// A match-id history batch failed
    ApiError,
    /// Account lookup failed
    PlayerLookup,
    /// Ladder entry had no usable player id
    PlayerUnresolved,
    /// A ladder page failed
    LadderError,
}

impl SkipReason {
    /// Label used in reports
    pub fn label(&self) -> &'static str {
        match self {
            SkipReason::DuplicateId => "duplicate_id",
            SkipReason::Queue => "skip_queue",
            SkipReason::Duration => "skip_duration",
            SkipReason::TimelineUnavailable => "skip_timeline",
            SkipReason::DownloadError => "download_error",
            SkipReason::ApiError => "api_error",
            SkipReason::PlayerLookup => "player_lookup_error",
            SkipReason::PlayerUnresolved => "player_unresolved",
            SkipReason::LadderError => "ladder_error",
        }
    }

    /// Skip reason for a rejected bundle; `None` for accepted ones
    pub fn from_status(status: BundleStatus) -> Option<Self> {
        match status {
            BundleStatus::Cached | BundleStatus::Stored => None,
            BundleStatus::SkippedQueue => Some(SkipReason::Queue),
            BundleStatus::SkippedDuration => Some(SkipReason::Duration),
            BundleStatus::SkippedTimelineUnavailable => Some(SkipReason::TimelineUnavailable),
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Count per skip reason for one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkipStats {
    counts: BTreeMap<SkipReason, u64>,
}

impl SkipStats {
    /// Count one occurrence
    pub fn record(&mut self, reason: SkipReason) {
        *self.counts.entry(reason).or_insert(0) += 1;
    }

    /// Occurrences of `reason`
    pub fn count(&self, reason: SkipReason) -> u64 {
        self.counts.get(&reason).copied().unwrap_or(0)
    }

    /// Sum over all reasons
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Whether nothing was skipped
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Label to count, sorted by label
    pub fn by_label(&self) -> BTreeMap<&'static str, u64> {
        self.counts
            .iter()
            .map(|(reason, count)| (reason.label(), *count))
            .collect()
    }
}

/// Why the collection loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The match list reached the target
    TargetReached,
    /// Ladder and scans ran out of candidates
    Exhausted,
    /// The wall-clock deadline passed
    Deadline,
    /// Shutdown was requested
    Interrupted,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            StopReason::TargetReached => "target reached",
            StopReason::Exhausted => "candidates exhausted",
            StopReason::Deadline => "deadline reached",
            StopReason::Interrupted => "interrupted",
        };
        f.write_str(text)
    }
}

/// Report of one collection run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Ids accepted during this run
    pub newly_accepted: usize,
    /// Ids in the match list at the end of the run
    pub total_known: usize,
    /// Requested total
    pub target: usize,
    /// Skip label to count
    pub skipped: BTreeMap<&'static str, u64>,
    /// Detail-only stubs completed by the startup sweep
    pub stubs_completed: usize,
    /// Ladder entries that reached the scanner
    pub players_scanned: usize,
    /// Why the loop ended
    pub stop_reason: StopReason,
    /// Run start
    pub started_at: DateTime<Utc>,
    /// Run end
    pub finished_at: DateTime<Utc>,
}

impl RunSummary {
    /// Whether the match list reached the target
    pub fn target_met(&self) -> bool {
        self.total_known >= self.target
    }

    /// Run duration in seconds
    pub fn elapsed_secs(&self) -> f64 {
        (self.finished_at - self.started_at)
            .to_std()
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0)
    }
}
