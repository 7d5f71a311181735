//! Endpoint routing for the game-data API
//!
//! Ladder and account lookups live on a platform host; match history, match
//! detail and timelines live on the regional host that groups platforms.
//! Keeping these in one value lets tests point every call at a mock server.

use crate::Division;

/// Default platform host (EU Nordic & East)
pub const DEFAULT_PLATFORM_URL: &str = "https://eun1.api.riotgames.com";

/// Default regional host serving match data for the platform
pub const DEFAULT_REGIONAL_URL: &str = "https://europe.api.riotgames.com";

/// Ranked solo/duo ladder
pub const DEFAULT_LADDER_QUEUE: &str = "RANKED_SOLO_5x5";

/// Default tier to walk
pub const DEFAULT_TIER: &str = "GOLD";

/// Header carrying the API key
pub const TOKEN_HEADER: &str = "X-Riot-Token";

/// Host and path configuration for every endpoint the collector uses
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Routes {
    /// Platform host for ladder and account endpoints
    pub platform_url: String,
    /// Regional host for match endpoints
    pub regional_url: String,
    /// Ladder queue name
    pub queue: String,
    /// Tier whose divisions are walked
    pub tier: String,
    /// Divisions in walk order
    pub divisions: Vec<Division>,
}

impl Routes {
    /// Route every endpoint to one host, as used with mock servers
    pub fn single_host(base_url: impl Into<String>) -> Self {
        let base = base_url.into();
        Self {
            platform_url: base.clone(),
            regional_url: base,
            ..Self::default()
        }
    }

    /// Ladder page listing for one division
    pub fn ladder_url(&self, division: Division) -> String {
        format!(
            "{}/lol/league/v4/entries/{}/{}/{}",
            self.platform_url.trim_end_matches('/'),
            self.queue,
            self.tier,
            division
        )
    }

    /// Account lookup yielding the stable player id
    pub fn summoner_url(&self, account_id: &str) -> String {
        format!(
            "{}/lol/summoner/v4/summoners/{}",
            self.platform_url.trim_end_matches('/'),
            account_id
        )
    }

    /// Match-id history for one player
    pub fn match_ids_url(&self, player_id: &str) -> String {
        format!(
            "{}/lol/match/v5/matches/by-puuid/{}/ids",
            self.regional_url.trim_end_matches('/'),
            player_id
        )
    }

    /// Match detail document
    pub fn match_url(&self, match_id: &str) -> String {
        format!(
            "{}/lol/match/v5/matches/{}",
            self.regional_url.trim_end_matches('/'),
            match_id
        )
    }

    /// Match timeline document
    pub fn timeline_url(&self, match_id: &str) -> String {
        format!("{}/timeline", self.match_url(match_id))
    }
}

impl Default for Routes {
    fn default() -> Self {
        Self {
            platform_url: DEFAULT_PLATFORM_URL.to_string(),
            regional_url: DEFAULT_REGIONAL_URL.to_string(),
            queue: DEFAULT_LADDER_QUEUE.to_string(),
            tier: DEFAULT_TIER.to_string(),
            divisions: Division::ALL.to_vec(),
        }
    }
}

/// Metric label for the endpoint a URL addresses
pub fn endpoint_class(url: &str) -> &'static str {
    if url.contains("/lol/league/") {
        "ladder"
    } else if url.contains("/lol/summoner/") {
        "summoner"
    } else if url.contains("/by-puuid/") {
        "match_ids"
    } else if url.ends_with("/timeline") {
        "timeline"
    } else if url.contains("/lol/match/") {
        "match"
    } else {
        "other"
    }
}
