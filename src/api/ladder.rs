//! Ranked ladder pagination
//!
//! Walks every configured division of one tier, page by page starting at 1,
//! and yields the entries as one lazy stream.

use futures_util::stream::{self, Stream, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use tracing::{debug, error};

use crate::api::routes::Routes;
use crate::api::{decode, ApiResult, JsonSource};
use crate::LadderEntry;

/// Stream of ladder entries
pub type LadderStream = Pin<Box<dyn Stream<Item = ApiResult<LadderEntry>> + Send>>;

/// Paginates the ladder listing across divisions
#[derive(Clone)]
pub struct LadderWalker {
    source: Arc<dyn JsonSource>,
    routes: Arc<Routes>,
    max_pages: u32,
}

impl LadderWalker {
    /// Create a walker visiting at most `max_pages` pages per division
    pub fn new(source: Arc<dyn JsonSource>, routes: Arc<Routes>, max_pages: u32) -> Self {
        Self {
            source,
            routes,
            max_pages,
        }
    }

    /// Lazily yield every entry, division by division
    ///
    /// A division ends at its first empty page or after `max_pages` pages. A
    /// failed page is yielded as an error and the walk moves on to the next
    /// division. The stream is finite and cannot be restarted.
    pub fn entries(&self) -> LadderStream {
        let source = self.source.clone();
        let routes = self.routes.clone();
        let max_pages = self.max_pages;

        let pages = stream::unfold((0usize, 1u32), move |(division_idx, page)| {
            let source = source.clone();
            let routes = routes.clone();

            async move {
                let division = *routes.divisions.get(division_idx)?;
                if page > max_pages {
                    return Some((stream::iter(Vec::new()), (division_idx + 1, 1)));
                }

                let url = routes.ladder_url(division);
                let params = [("page", page.to_string())];
                let fetched = match source.get_json(&url, &params).await {
                    Ok(value) => decode::<Vec<LadderEntry>>(&url, value),
                    Err(e) => Err(e),
                };

                match fetched {
                    Ok(entries) if entries.is_empty() => {
                        debug!(division = %division, page, "No more ladder entries");
                        Some((stream::iter(Vec::new()), (division_idx + 1, 1)))
                    }
                    Ok(entries) => {
                        debug!(division = %division, page, count = entries.len(), "Ladder page");
                        let items: Vec<ApiResult<LadderEntry>> =
                            entries.into_iter().map(Ok).collect();
                        Some((stream::iter(items), (division_idx, page + 1)))
                    }
                    Err(e) => {
                        error!(division = %division, page, error = %e, "Ladder page failed, skipping division");
                        Some((stream::iter(vec![Err(e)]), (division_idx + 1, 1)))
                    }
                }
            }
        })
        .flatten();

        Box::pin(pages)
    }
}
