//! Collection configuration constants

use std::time::Duration;

/// Short rate window admissions (developer keys allow 20 per second).
pub const DEFAULT_PER_SECOND: usize = 18;

/// Long rate window admissions (developer keys allow 100 per two minutes).
pub const DEFAULT_PER_TWO_MINUTES: usize = 95;

/// Short rate window span
pub const SHORT_WINDOW: Duration = Duration::from_secs(1);

/// Long rate window span
pub const LONG_WINDOW: Duration = Duration::from_secs(120);

/// Floor for rate limiter sleeps so a saturated window never busy-loops
pub const MIN_ADMISSION_WAIT: Duration = Duration::from_millis(50);

/// Attempts per request, retries included
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Per-request deadline; expiry counts as a server-side failure
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP connect timeout
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Total matches to keep on disk
pub const DEFAULT_TARGET_MATCHES: usize = 1000;

/// Match ids requested per history page
pub const DEFAULT_MATCHES_PER_PLAYER: u32 = 50;

/// History offset at which a player's scan stops
pub const DEFAULT_HISTORY_WINDOW: u32 = 200;

/// Ladder pages walked per division
pub const DEFAULT_MAX_PAGES_PER_DIVISION: u32 = 10;

/// Ranked solo/duo queue
pub const DEFAULT_QUEUE_ID: i64 = 420;

/// Fifteen minutes; shorter games are remakes or early surrenders
pub const DEFAULT_MIN_DURATION_SECS: i64 = 15 * 60;

/// Flush the match list after this many new acceptances
pub const DEFAULT_CHECKPOINT_EVERY: usize = 25;

/// Upper bound for concurrently scanned players
pub const MAX_CONCURRENCY: usize = 8;

/// Retry timing, expressed in multiples of one time unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Length of one time unit (one second in production)
    pub unit: Duration,
    /// Exponential backoff ceiling (ten units)
    pub backoff_cap: Duration,
    /// Wait used when a 429 carries no usable `Retry-After` (one unit)
    pub default_retry_after: Duration,
    /// Margin added on top of the server's `Retry-After` (a tenth of a unit)
    pub retry_after_margin: Duration,
}

impl RetryPolicy {
    /// Policy with every duration scaled to `unit`
    pub fn with_unit(unit: Duration) -> Self {
        Self {
            unit,
            backoff_cap: unit.saturating_mul(10),
            default_retry_after: unit,
            retry_after_margin: unit / 10,
        }
    }

    /// Backoff after a server-side failure on `attempt` (1-based): `min(2^attempt, 10)` units
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.unit.saturating_mul(factor).min(self.backoff_cap)
    }

    /// Wait before retrying a 429; `retry_after_secs` is the parsed header, if any
    pub fn quota_wait(&self, retry_after_secs: Option<f64>) -> Duration {
        let base = retry_after_secs
            .filter(|secs| secs.is_finite() && *secs >= 0.0)
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
            .unwrap_or(self.default_retry_after);
        base + self.retry_after_margin
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::with_unit(Duration::from_secs(1))
    }
}
