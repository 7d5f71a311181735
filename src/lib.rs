//! # Ranked Match Collector Library
//!
//! Collects a target number of ranked match documents, together with their
//! timelines, from a rate-limited and paginated game-data API. Progress is
//! persisted incrementally so an interrupted run resumes without downloading
//! anything twice.
//!
//! ## Features
//!
//! - **Dual-window rate limiting**: short and long sliding quotas shared by every request
//! - **Classified retries**: 429 honours `Retry-After`, 5xx backs off exponentially, other 4xx fail fast
//! - **Ladder discovery**: walks the ranked ladder division by division, page by page
//! - **Idempotent bundles**: match detail and timeline are written once and never re-fetched
//! - **Resumable state**: an ordered `matchlist.json` that is merged and atomically replaced
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use ranked_match_collector::api::{RetryingClient, Routes};
//! use ranked_match_collector::collector::{Collector, CollectorConfig, RateLimiter};
//! use ranked_match_collector::credential::ApiKey;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let key = ApiKey::load("RIOT_API_KEY", ".env").ok_or("missing key")?;
//! let limiter = Arc::new(RateLimiter::default());
//! let client = Arc::new(RetryingClient::new(&key, limiter)?);
//!
//! let config = CollectorConfig::new(100);
//! let collector = Collector::new(client, Arc::new(Routes::default()), config);
//! let summary = collector.run().await?;
//! println!("{} new matches", summary.newly_accepted);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`api`] - Retrying HTTP client, ladder walk, player resolution, match-id scan
//! - [`store`] - Match bundle persistence and acceptance filters
//! - [`resume`] - The durable ordered match list
//! - [`collector`] - Rate limiter, skip statistics and the orchestrating run loop
//! - [`credential`] - API key discovery from the environment or a dotenv file
//! - [`cli`] - Command line surface

#![warn(missing_docs)]
#![warn(clippy::all)]

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Remote API access
pub mod api;

/// CLI command implementations
pub mod cli;

/// Collection orchestration and rate limiting
pub mod collector;

/// API credential discovery
pub mod credential;

/// Production observability metrics
pub mod metrics;

/// Resume capability through the persisted match list
pub mod resume;

/// Graceful shutdown coordination shared across modules
pub mod shutdown;

/// Match bundle persistence
pub mod store;

pub use credential::ApiKey;

/// Ladder subdivision within a tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Division {
    /// Division I (highest)
    #[serde(rename = "I")]
    One,
    /// Division II
    #[serde(rename = "II")]
    Two,
    /// Division III
    #[serde(rename = "III")]
    Three,
    /// Division IV (lowest)
    #[serde(rename = "IV")]
    Four,
}

impl Division {
    /// All divisions in walk order
    pub const ALL: [Division; 4] = [Division::One, Division::Two, Division::Three, Division::Four];

    /// Roman numeral used in ladder URLs
    pub fn as_str(&self) -> &'static str {
        match self {
            Division::One => "I",
            Division::Two => "II",
            Division::Three => "III",
            Division::Four => "IV",
        }
    }
}

impl fmt::Display for Division {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Division {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "I" | "1" => Ok(Division::One),
            "II" | "2" => Ok(Division::Two),
            "III" | "3" => Ok(Division::Three),
            "IV" | "4" => Ok(Division::Four),
            _ => Err(format!("Invalid division: {s}. Valid options: I, II, III, IV")),
        }
    }
}

/// One ranked player record from the ladder listing
///
/// The ladder either exposes the stable cross-region player id directly or
/// only the platform account id, which must be resolved first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LadderEntry {
    /// Stable cross-region player id, when the ladder provides it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub puuid: Option<String>,
    /// Platform account id requiring resolution
    #[serde(
        default,
        alias = "encryptedSummonerId",
        skip_serializing_if = "Option::is_none"
    )]
    pub summoner_id: Option<String>,
    /// Display name, logging only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summoner_name: Option<String>,
    /// League points, logging only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub league_points: Option<i64>,
}

impl LadderEntry {
    /// Name used when logging this entry
    pub fn display_name(&self) -> &str {
        self.summoner_name
            .as_deref()
            .or_else(|| self.direct_player_id())
            .or_else(|| self.account_id())
            .unwrap_or("<unknown>")
    }

    /// Direct player id if present and non-empty
    pub fn direct_player_id(&self) -> Option<&str> {
        self.puuid.as_deref().filter(|p| !p.is_empty())
    }

    /// Account id needing resolution if present and non-empty
    pub fn account_id(&self) -> Option<&str> {
        self.summoner_id.as_deref().filter(|s| !s.is_empty())
    }
}

/// Acceptance filters applied to every downloaded match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptFilters {
    /// Queue id a match must belong to; `None` accepts every queue
    pub queue_id: Option<i64>,
    /// Minimum game duration in seconds
    pub min_duration_secs: i64,
}

impl AcceptFilters {
    /// Build filters from the CLI convention where a negative queue id disables the filter
    pub fn from_cli(queue_id: i64, min_duration_secs: i64) -> Self {
        Self {
            queue_id: (queue_id >= 0).then_some(queue_id),
            min_duration_secs,
        }
    }
}

impl Default for AcceptFilters {
    fn default() -> Self {
        Self {
            queue_id: Some(collector::config::DEFAULT_QUEUE_ID),
            min_duration_secs: collector::config::DEFAULT_MIN_DURATION_SECS,
        }
    }
}
