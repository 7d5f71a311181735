//! Per-player match-id history scanning

use futures_util::stream::{self, Stream, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use tracing::{debug, error};

use crate::api::routes::Routes;
use crate::api::{decode, ApiResult, JsonSource};

/// Largest page the match-id endpoint serves
pub const MAX_IDS_PER_CALL: u32 = 100;

/// Stream of match ids for one player
pub type MatchIdStream = Pin<Box<dyn Stream<Item = ApiResult<String>> + Send>>;

/// Effective batch size and history depth for a scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanWindow {
    /// Ids requested per call, within `1..=MAX_IDS_PER_CALL`
    pub batch: u32,
    /// Offset at which the scan stops, never below one batch
    pub depth: u32,
    requested: u32,
}

impl ScanWindow {
    /// Clamp a requested batch size and derive the effective depth
    pub fn new(requested_batch: u32, history_depth: u32) -> Self {
        let batch = requested_batch.clamp(1, MAX_IDS_PER_CALL);
        Self {
            batch,
            depth: history_depth.max(batch),
            requested: requested_batch,
        }
    }

    /// Whether the requested batch exceeded the endpoint maximum
    pub fn was_capped(&self) -> bool {
        self.requested > self.batch
    }
}

/// Pages one player's match-id history
#[derive(Clone)]
pub struct MatchIdScanner {
    source: Arc<dyn JsonSource>,
    routes: Arc<Routes>,
}

impl MatchIdScanner {
    /// Create a scanner
    pub fn new(source: Arc<dyn JsonSource>, routes: Arc<Routes>) -> Self {
        Self { source, routes }
    }

    /// Lazily yield a player's match ids, newest first
    ///
    /// Stops after a short batch or once the offset reaches `window.depth`.
    /// A failed batch is yielded as an error and ends the scan.
    pub fn scan(&self, player_id: &str, window: ScanWindow) -> MatchIdStream {
        let source = self.source.clone();
        let url = self.routes.match_ids_url(player_id);
        let player = player_id.to_string();

        let batches = stream::unfold(Some(0u32), move |state| {
            let source = source.clone();
            let url = url.clone();
            let player = player.clone();

            async move {
                let start = state?;
                if start >= window.depth {
                    return None;
                }

                let params = [("start", start.to_string()), ("count", window.batch.to_string())];
                let fetched = match source.get_json(&url, &params).await {
                    Ok(value) => decode::<Vec<String>>(&url, value),
                    Err(e) => Err(e),
                };

                match fetched {
                    Ok(ids) => {
                        debug!(player = %player, start, count = ids.len(), "Match id batch");
                        let next = start.saturating_add(window.batch);
                        let more = ids.len() as u32 >= window.batch && next < window.depth;
                        let items: Vec<ApiResult<String>> = ids.into_iter().map(Ok).collect();
                        Some((stream::iter(items), more.then_some(next)))
                    }
                    Err(e) => {
                        error!(player = %player, start, error = %e, "Match id scan abandoned");
                        Some((stream::iter(vec![Err(e)]), None))
                    }
                }
            }
        })
        .flatten();

        Box::pin(batches)
    }
}
