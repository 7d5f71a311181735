//! Collection run loop
//!
//! Walks the ladder, resolves each entry to a player, scans the player's
//! match history and ensures every unseen match bundle until the match list
//! reaches its target or the candidates run out.
//!
//! Several players may be processed at once. Every request still goes through
//! the one shared rate limiter inside the [`JsonSource`], and all match list
//! reads and writes happen under a single lock so each id is accepted at most
//! once and the target check sees a consistent count.

use futures_util::stream::{FuturesUnordered, StreamExt};
use indicatif::ProgressBar;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::api::{ApiResult, JsonSource, LadderWalker, MatchIdScanner, PlayerResolver, Routes, ScanWindow};
use crate::collector::config::{
    DEFAULT_CHECKPOINT_EVERY, DEFAULT_HISTORY_WINDOW, DEFAULT_MATCHES_PER_PLAYER,
    DEFAULT_MAX_PAGES_PER_DIVISION, MAX_CONCURRENCY,
};
use crate::collector::stats::{RunSummary, SkipReason, SkipStats, StopReason};
use crate::collector::CollectError;
use crate::metrics::record_match_outcome;
use crate::resume::MatchList;
use crate::shutdown::SharedShutdown;
use crate::store::{BundleLayout, BundleStatus, MatchBundleStore, StoreResult};
use crate::{AcceptFilters, LadderEntry};

/// Settings for one collection run
#[derive(Debug, Clone, PartialEq)]
pub struct CollectorConfig {
    /// Total matches the match list should hold
    pub target: usize,
    /// Match-id batch size and history depth per player
    pub scan: ScanWindow,
    /// Ladder pages walked per division
    pub max_pages_per_division: u32,
    /// Queue and duration filters
    pub filters: AcceptFilters,
    /// Match list location
    pub matchlist_path: PathBuf,
    /// Directory holding match bundles
    pub raw_dir: PathBuf,
    /// Flush the match list after this many new acceptances; 0 flushes only at the end
    pub checkpoint_every: usize,
    /// Players processed at once, within `1..=MAX_CONCURRENCY`
    pub concurrency: usize,
    /// Stop launching players after this long
    pub max_runtime: Option<Duration>,
    /// Complete detail-only stubs before collecting
    pub sweep_stubs: bool,
}

impl CollectorConfig {
    /// Defaults for everything except the target
    pub fn new(target: usize) -> Self {
        Self {
            target,
            scan: ScanWindow::new(DEFAULT_MATCHES_PER_PLAYER, DEFAULT_HISTORY_WINDOW),
            max_pages_per_division: DEFAULT_MAX_PAGES_PER_DIVISION,
            filters: AcceptFilters::default(),
            matchlist_path: PathBuf::from("matchlist.json"),
            raw_dir: PathBuf::from("data/raw"),
            checkpoint_every: DEFAULT_CHECKPOINT_EVERY,
            concurrency: 1,
            max_runtime: None,
            sweep_stubs: true,
        }
    }

    /// Set the per-player scan window
    pub fn with_scan(mut self, scan: ScanWindow) -> Self {
        self.scan = scan;
        self
    }

    /// Set the ladder page limit per division
    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages_per_division = max_pages;
        self
    }

    /// Set acceptance filters
    pub fn with_filters(mut self, filters: AcceptFilters) -> Self {
        self.filters = filters;
        self
    }

    /// Set match list and raw directory locations
    pub fn with_paths(mut self, matchlist_path: impl Into<PathBuf>, raw_dir: impl Into<PathBuf>) -> Self {
        self.matchlist_path = matchlist_path.into();
        self.raw_dir = raw_dir.into();
        self
    }

    /// Set the checkpoint interval
    pub fn with_checkpoint_every(mut self, every: usize) -> Self {
        self.checkpoint_every = every;
        self
    }

    /// Set player concurrency, clamped to `1..=MAX_CONCURRENCY`
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.clamp(1, MAX_CONCURRENCY);
        self
    }

    /// Set the wall-clock budget
    pub fn with_max_runtime(mut self, max_runtime: Option<Duration>) -> Self {
        self.max_runtime = max_runtime;
        self
    }

    /// Enable or disable the startup stub sweep
    pub fn with_stub_sweep(mut self, sweep: bool) -> Self {
        self.sweep_stubs = sweep;
        self
    }
}

/// Drives ladder, resolver, scanner and store to the target
pub struct Collector {
    walker: LadderWalker,
    resolver: PlayerResolver,
    scanner: MatchIdScanner,
    store: MatchBundleStore,
    config: CollectorConfig,
    shutdown: Option<SharedShutdown>,
    progress: Option<ProgressBar>,
    /// Length of the longest match list written by a checkpoint this run
    checkpointed: Mutex<usize>,
}

/// Mutable state of one run, always accessed under one lock
struct RunState {
    matchlist: MatchList,
    in_flight: HashSet<String>,
    seen_players: HashSet<String>,
    skips: SkipStats,
    newly_accepted: usize,
    since_checkpoint: usize,
    players_scanned: usize,
}

impl Collector {
    /// Create a collector; every component shares `source`
    pub fn new(source: Arc<dyn JsonSource>, routes: Arc<Routes>, config: CollectorConfig) -> Self {
        let layout = BundleLayout::new(config.raw_dir.clone());
        Self {
            walker: LadderWalker::new(source.clone(), routes.clone(), config.max_pages_per_division),
            resolver: PlayerResolver::new(source.clone(), routes.clone()),
            scanner: MatchIdScanner::new(source.clone(), routes.clone()),
            store: MatchBundleStore::new(source, routes, layout),
            config,
            shutdown: None,
            progress: None,
            checkpointed: Mutex::new(0),
        }
    }

    /// Attach a shared shutdown handle for graceful interruption
    pub fn with_shutdown(mut self, shutdown: SharedShutdown) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Report accepted matches on a progress bar
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Run configuration
    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    /// Collect until the target is met or candidates run out
    ///
    /// Falling short of the target is not an error. Per-player and per-match
    /// failures are tallied in the summary.
    ///
    /// # Errors
    /// [`CollectError`] when the match list cannot be loaded or saved, or the
    /// raw directory cannot be read.
    pub async fn run(&self) -> Result<RunSummary, CollectError> {
        let started_at = chrono::Utc::now();
        let deadline = self.config.max_runtime.map(|budget| Instant::now() + budget);

        let matchlist = MatchList::load(&self.config.matchlist_path)?;
        info!(
            existing = matchlist.len(),
            target = self.config.target,
            "Starting with {} existing matches",
            matchlist.len()
        );
        if self.config.scan.was_capped() {
            warn!(
                batch = self.config.scan.batch,
                "matches-per-player capped at {} due to API limits",
                self.config.scan.batch
            );
        }

        *self.checkpointed.lock().unwrap_or_else(PoisonError::into_inner) = 0;
        let state = Mutex::new(RunState {
            matchlist,
            in_flight: HashSet::new(),
            seen_players: HashSet::new(),
            skips: SkipStats::default(),
            newly_accepted: 0,
            since_checkpoint: 0,
            players_scanned: 0,
        });
        if let Some(progress) = &self.progress {
            progress.set_length(self.config.target as u64);
            progress.set_position(self.lock(&state).matchlist.len() as u64);
        }

        let stubs_completed = if self.config.sweep_stubs && !self.target_reached(&state) {
            self.sweep_stubs(&state).await?
        } else {
            0
        };

        let mut stop = None;
        let mut ladder = self.walker.entries();
        let mut in_flight = FuturesUnordered::new();
        let mut ladder_done = false;

        enum Step {
            Entry(Option<ApiResult<LadderEntry>>),
            PlayerDone,
            Interrupt,
        }

        loop {
            if stop.is_none() {
                stop = self.launch_blocker(&state, deadline);
            }
            let can_launch =
                !ladder_done && stop.is_none() && in_flight.len() < self.config.concurrency;
            if !can_launch && in_flight.is_empty() {
                break;
            }

            let step = tokio::select! {
                entry = ladder.next(), if can_launch => Step::Entry(entry),
                Some(()) = in_flight.next(), if !in_flight.is_empty() => Step::PlayerDone,
                () = self.wait_for_interrupt(), if stop.is_none() => Step::Interrupt,
            };

            match step {
                Step::Entry(Some(Ok(entry))) => {
                    if let Some(reason) = self.launch_blocker(&state, deadline) {
                        stop = Some(reason);
                    } else {
                        in_flight.push(self.process_entry(&state, entry));
                    }
                }
                Step::Entry(Some(Err(e))) => {
                    warn!(error = %e, "Ladder page unavailable");
                    self.lock(&state).skips.record(SkipReason::LadderError);
                }
                Step::Entry(None) => {
                    debug!("Ladder exhausted");
                    ladder_done = true;
                }
                Step::PlayerDone | Step::Interrupt => {}
            }
        }
        drop(in_flight);

        let mut state = state.into_inner().unwrap_or_else(PoisonError::into_inner);
        let flushed = state.matchlist.flush(&self.config.matchlist_path)?;

        let total_known = state.matchlist.len();
        let stop_reason = if total_known >= self.config.target {
            StopReason::TargetReached
        } else {
            stop.unwrap_or(StopReason::Exhausted)
        };

        if flushed || state.newly_accepted > 0 {
            info!(
                new = state.newly_accepted,
                total = total_known,
                "Updated matchlist with {} new matches (total {})",
                state.newly_accepted,
                total_known
            );
        } else {
            info!("No new matches downloaded");
        }
        if !state.skips.is_empty() {
            info!(skipped = ?state.skips.by_label(), "Skip summary");
        }
        if total_known < self.config.target {
            warn!(
                total = total_known,
                target = self.config.target,
                reason = %stop_reason,
                "Only gathered {} matches (target {}). Increase max pages or matches per player and rerun.",
                total_known,
                self.config.target
            );
        }

        Ok(RunSummary {
            newly_accepted: state.newly_accepted,
            total_known,
            target: self.config.target,
            skipped: state.skips.by_label(),
            stubs_completed,
            players_scanned: state.players_scanned,
            stop_reason,
            started_at,
            finished_at: chrono::Utc::now(),
        })
    }

    /// Complete detail-only bundles left behind by earlier runs
    ///
    /// Each stub's detail is checked against the current filters before its
    /// timeline is fetched. The sweep stops once the target is reached.
    async fn sweep_stubs(&self, state: &Mutex<RunState>) -> Result<usize, CollectError> {
        let stubs = self.store.layout().detail_only_ids()?;
        if stubs.is_empty() {
            return Ok(0);
        }
        info!(stubs = stubs.len(), "Completing detail-only bundles");

        let mut completed = 0;
        for match_id in stubs {
            if self.interrupted() || self.target_reached(state) {
                break;
            }
            match self.store.ensure(&match_id, &self.config.filters).await {
                Ok(status) if status.is_accepted() => {
                    completed += 1;
                    let checkpoint = {
                        let mut state = self.lock(state);
                        if state.matchlist.len() < self.config.target
                            && state.matchlist.accept(&match_id)
                        {
                            self.on_accepted(&mut state, &match_id)
                        } else {
                            None
                        }
                    };
                    if let Some(snapshot) = checkpoint {
                        self.checkpoint(snapshot);
                    }
                }
                Ok(status) => {
                    debug!(match_id = %match_id, status = status.label(), "Stub not completed");
                    if let Some(reason) = SkipReason::from_status(status) {
                        self.lock(state).skips.record(reason);
                    }
                }
                Err(e) => {
                    warn!(match_id = %match_id, error = %e, "Stub completion failed");
                    self.lock(state).skips.record(SkipReason::DownloadError);
                }
            }
        }
        Ok(completed)
    }

    async fn process_entry(&self, state: &Mutex<RunState>, entry: LadderEntry) {
        let player = match self.resolver.player_for(&entry).await {
            Ok(Some(player)) => player,
            Ok(None) => {
                debug!(entry = entry.display_name(), "Ladder entry has no player id");
                self.lock(state).skips.record(SkipReason::PlayerUnresolved);
                return;
            }
            Err(e) => {
                warn!(entry = entry.display_name(), error = %e, "Player lookup failed");
                self.lock(state).skips.record(SkipReason::PlayerLookup);
                return;
            }
        };

        {
            let mut state = self.lock(state);
            if !state.seen_players.insert(player.clone()) {
                debug!(player = %player, "Player already scanned this run");
                return;
            }
            state.players_scanned += 1;
        }
        debug!(player = %player, entry = entry.display_name(), "Scanning player");

        let mut ids = self.scanner.scan(&player, self.config.scan);
        loop {
            if self.target_reached(state) || self.interrupted() {
                break;
            }
            let Some(item) = ids.next().await else {
                break;
            };
            match item {
                Ok(match_id) => self.process_match(state, &match_id).await,
                Err(_) => {
                    // the scanner has already logged and ended the stream
                    self.lock(state).skips.record(SkipReason::ApiError);
                }
            }
        }
    }

    async fn process_match(&self, state: &Mutex<RunState>, match_id: &str) {
        {
            let mut state = self.lock(state);
            if state.matchlist.contains(match_id) || !state.in_flight.insert(match_id.to_string()) {
                state.skips.record(SkipReason::DuplicateId);
                record_match_outcome(SkipReason::DuplicateId.label());
                return;
            }
        }

        let result = self.store.ensure(match_id, &self.config.filters).await;
        if let Some(snapshot) = self.finish_match(state, match_id, result) {
            self.checkpoint(snapshot);
        }
    }

    /// Record the outcome; returns a match list snapshot when a checkpoint is due
    fn finish_match(
        &self,
        state: &Mutex<RunState>,
        match_id: &str,
        result: StoreResult<BundleStatus>,
    ) -> Option<MatchList> {
        let mut state = self.lock(state);
        state.in_flight.remove(match_id);

        let status = match result {
            Ok(status) => status,
            Err(e) => {
                warn!(match_id, error = %e, "Failed to store match");
                state.skips.record(SkipReason::DownloadError);
                record_match_outcome(SkipReason::DownloadError.label());
                return None;
            }
        };
        record_match_outcome(status.label());

        if let Some(reason) = SkipReason::from_status(status) {
            debug!(match_id, reason = %reason, "Match skipped");
            state.skips.record(reason);
            return None;
        }

        if state.matchlist.accept(match_id) {
            info!(
                match_id,
                status = status.label(),
                "Stored {} ({}/{})",
                match_id,
                state.matchlist.len(),
                self.config.target
            );
            self.on_accepted(&mut state, match_id)
        } else {
            None
        }
    }

    /// Bookkeeping after a new id entered the match list
    ///
    /// Returns a copy of the list when a checkpoint is due. The caller writes
    /// it with [`Collector::checkpoint`] after releasing the state lock.
    fn on_accepted(&self, state: &mut RunState, match_id: &str) -> Option<MatchList> {
        state.newly_accepted += 1;
        state.since_checkpoint += 1;
        if let Some(progress) = &self.progress {
            progress.set_position(state.matchlist.len() as u64);
        }

        let every = self.config.checkpoint_every;
        if every == 0 || state.since_checkpoint < every {
            return None;
        }
        state.since_checkpoint = 0;
        debug!(match_id, total = state.matchlist.len(), "Checkpoint due");
        Some(state.matchlist.clone())
    }

    /// Write a match list snapshot taken by [`Collector::on_accepted`]
    ///
    /// The list only grows during a run, so a snapshot no longer than one
    /// already written is stale and skipped. A failed write is retried at the
    /// next checkpoint and the final flush always runs.
    fn checkpoint(&self, mut snapshot: MatchList) {
        let mut written = self.checkpointed.lock().unwrap_or_else(PoisonError::into_inner);
        if snapshot.len() <= *written {
            debug!(total = snapshot.len(), "Skipping stale checkpoint");
            return;
        }
        match snapshot.flush(&self.config.matchlist_path) {
            Ok(_) => {
                *written = snapshot.len();
                debug!(total = snapshot.len(), "Checkpoint saved");
            }
            Err(e) => error!(error = %e, "Checkpoint flush failed, will retry"),
        }
    }

    /// Reason to stop launching players, if any
    fn launch_blocker(&self, state: &Mutex<RunState>, deadline: Option<Instant>) -> Option<StopReason> {
        if self.target_reached(state) {
            Some(StopReason::TargetReached)
        } else if self.interrupted() {
            info!("Shutdown requested, finishing in-flight players");
            Some(StopReason::Interrupted)
        } else if deadline.is_some_and(|d| Instant::now() >= d) {
            info!("Runtime budget spent, finishing in-flight players");
            Some(StopReason::Deadline)
        } else {
            None
        }
    }

    fn target_reached(&self, state: &Mutex<RunState>) -> bool {
        self.lock(state).matchlist.len() >= self.config.target
    }

    /// Resolves once shutdown is requested; never without a coordinator
    async fn wait_for_interrupt(&self) {
        match &self.shutdown {
            Some(shutdown) => shutdown.wait_for_shutdown().await,
            None => std::future::pending().await,
        }
    }

    fn interrupted(&self) -> bool {
        self.shutdown
            .as_ref()
            .is_some_and(|s| s.is_shutdown_requested())
    }

    fn lock<'a>(&self, state: &'a Mutex<RunState>) -> MutexGuard<'a, RunState> {
        state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
