//! Dual sliding-window rate limiting
//!
//! Every outbound request passes through [`RateLimiter::admit`], which only
//! returns once both the short and the long quota window have room.

use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::collector::config::{
    DEFAULT_PER_SECOND, DEFAULT_PER_TWO_MINUTES, LONG_WINDOW, MIN_ADMISSION_WAIT, SHORT_WINDOW,
};
use crate::metrics::RateLimiterMetrics;

/// Timestamps of admitted requests within one rolling span
#[derive(Debug)]
struct RateWindow {
    capacity: usize,
    span: Duration,
    stamps: VecDeque<Instant>,
}

impl RateWindow {
    fn new(capacity: usize, span: Duration) -> Self {
        Self {
            capacity: capacity.max(1),
            span,
            stamps: VecDeque::with_capacity(capacity.max(1)),
        }
    }

    fn evict(&mut self, now: Instant) {
        while let Some(&oldest) = self.stamps.front() {
            if now.saturating_duration_since(oldest) >= self.span {
                self.stamps.pop_front();
            } else {
                break;
            }
        }
    }

    fn has_room(&self) -> bool {
        self.stamps.len() < self.capacity
    }

    /// Time until the oldest stamp leaves the window; zero when there is room
    fn wait_for_slot(&self, now: Instant) -> Duration {
        if self.has_room() {
            return Duration::ZERO;
        }
        self.stamps
            .front()
            .map(|&oldest| self.span.saturating_sub(now.saturating_duration_since(oldest)))
            .unwrap_or(Duration::ZERO)
    }
}

/// Rate limiter enforcing a short and a long quota window together
///
/// The windows sit behind a fair async mutex. A caller that has to wait keeps
/// the lock while sleeping, so concurrent callers queue in arrival order
/// instead of polling.
#[derive(Debug)]
pub struct RateLimiter {
    windows: Mutex<[RateWindow; 2]>,
}

impl RateLimiter {
    /// Create a limiter with the standard 1 s and 120 s spans
    ///
    /// # Arguments
    /// * `per_second` - Admissions allowed in any one-second window
    /// * `per_two_minutes` - Admissions allowed in any 120-second window
    pub fn new(per_second: usize, per_two_minutes: usize) -> Self {
        Self::with_windows((per_second, SHORT_WINDOW), (per_two_minutes, LONG_WINDOW))
    }

    /// Create a limiter with explicit `(capacity, span)` windows
    pub fn with_windows(short: (usize, Duration), long: (usize, Duration)) -> Self {
        Self {
            windows: Mutex::new([
                RateWindow::new(short.0, short.1),
                RateWindow::new(long.0, long.1),
            ]),
        }
    }

    /// Wait until both windows have room, then record the admission
    pub async fn admit(&self) {
        let mut metrics = RateLimiterMetrics::new();
        metrics.start_acquire();

        let mut windows = self.windows.lock().await;
        loop {
            let now = Instant::now();
            for window in windows.iter_mut() {
                window.evict(now);
            }

            if windows.iter().all(RateWindow::has_room) {
                for window in windows.iter_mut() {
                    window.stamps.push_back(now);
                }
                metrics.record_acquired();
                return;
            }

            let wait = windows
                .iter()
                .map(|window| window.wait_for_slot(now))
                .max()
                .unwrap_or(Duration::ZERO)
                .max(MIN_ADMISSION_WAIT);
            debug!(wait_ms = wait.as_millis() as u64, "Rate window saturated, waiting");
            sleep(wait).await;
        }
    }

    /// Admissions currently counted in the `(short, long)` windows
    pub async fn in_flight(&self) -> (usize, usize) {
        let mut windows = self.windows.lock().await;
        let now = Instant::now();
        for window in windows.iter_mut() {
            window.evict(now);
        }
        (windows[0].stamps.len(), windows[1].stamps.len())
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_PER_SECOND, DEFAULT_PER_TWO_MINUTES)
    }
}
