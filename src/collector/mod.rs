//! Collection orchestration and rate limiting
//!
//! # Overview
//!
//! 1. **Rate limiting**: every request waits on [`rate_limit::RateLimiter`]
//! 2. **Discovery**: ladder entries are resolved to players and scanned for match ids
//! 3. **Storage**: unseen ids go through the bundle store and its filters
//! 4. **Progress**: accepted ids land in the match list, flushed at checkpoints and at the end
//!
//! # Components
//!
//! - [`orchestrator`] - The run loop and its configuration
//! - [`rate_limit`] - Dual sliding-window limiter
//! - [`stats`] - Skip tally and run summary
//! - [`config`] - Defaults and retry timing

use crate::resume::StateError;
use crate::store::StoreError;

pub mod config;
pub mod orchestrator;
pub mod rate_limit;
pub mod stats;

pub use orchestrator::{Collector, CollectorConfig};
pub use rate_limit::RateLimiter;
pub use stats::{RunSummary, SkipReason, SkipStats, StopReason};

/// Fatal collection errors
#[derive(Debug, thiserror::Error)]
pub enum CollectError {
    /// The match list could not be loaded or saved
    #[error("match list error: {0}")]
    State(#[from] StateError),

    /// The raw directory could not be inspected
    #[error("bundle store error: {0}")]
    Store(#[from] StoreError),
}
