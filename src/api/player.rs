//! Account id to player id resolution with a run-scoped cache

use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

use crate::api::routes::Routes;
use crate::api::{decode, ApiResult, JsonSource};
use crate::LadderEntry;

#[derive(Debug, Deserialize)]
struct AccountRecord {
    #[serde(default)]
    puuid: Option<String>,
}

/// Resolves platform account ids to stable player ids
pub struct PlayerResolver {
    source: Arc<dyn JsonSource>,
    routes: Arc<Routes>,
    cache: Mutex<HashMap<String, String>>,
}

impl PlayerResolver {
    /// Create a resolver with an empty cache
    pub fn new(source: Arc<dyn JsonSource>, routes: Arc<Routes>) -> Self {
        Self {
            source,
            routes,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve one account id
    ///
    /// Returns `Ok(None)` when the lookup succeeds but carries no player id.
    /// Only successful resolutions are cached.
    pub async fn resolve(&self, account_id: &str) -> ApiResult<Option<String>> {
        if let Some(hit) = self.lookup_cached(account_id) {
            return Ok(Some(hit));
        }

        let url = self.routes.summoner_url(account_id);
        let value = self.source.get_json(&url, &[]).await?;
        let record: AccountRecord = decode(&url, value)?;

        match record.puuid.filter(|p| !p.is_empty()) {
            Some(puuid) => {
                if let Ok(mut cache) = self.cache.lock() {
                    cache.insert(account_id.to_string(), puuid.clone());
                }
                Ok(Some(puuid))
            }
            None => {
                debug!(account_id, "Account lookup returned no player id");
                Ok(None)
            }
        }
    }

    /// Player id for a ladder entry, resolving the account id when needed
    pub async fn player_for(&self, entry: &LadderEntry) -> ApiResult<Option<String>> {
        if let Some(puuid) = entry.direct_player_id() {
            return Ok(Some(puuid.to_string()));
        }
        match entry.account_id() {
            Some(account_id) => self.resolve(account_id).await,
            None => Ok(None),
        }
    }

    /// Number of cached resolutions
    pub fn cached(&self) -> usize {
        self.cache.lock().map(|cache| cache.len()).unwrap_or(0)
    }

    fn lookup_cached(&self, account_id: &str) -> Option<String> {
        self.cache.lock().ok()?.get(account_id).cloned()
    }
}
