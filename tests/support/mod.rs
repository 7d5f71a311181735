//! Shared test doubles

#![allow(dead_code)]

use async_trait::async_trait;
use ranked_match_collector::api::{ApiError, ApiResult, JsonSource, Routes};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Host used by every fake route
pub const FAKE_HOST: &str = "http://fake.test";

/// Scripted reply for one request key
#[derive(Debug, Clone)]
pub enum Reply {
    /// Successful JSON document
    Json(Value),
    /// Non-retryable rejection with this status
    Reject(u16),
    /// Retries ran out
    Exhausted,
}

/// In-memory [`JsonSource`] answering from a script and recording every call
///
/// Requests are keyed as `url?k=v&k=v` in parameter order. Unscripted keys
/// fall back to the first matching substring rule, then to a 404.
#[derive(Default)]
pub struct FakeSource {
    replies: Mutex<HashMap<String, Reply>>,
    fallbacks: Mutex<Vec<(String, Reply)>>,
    calls: Mutex<Vec<String>>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fake whose ladder pages are empty unless scripted
    pub fn with_empty_ladder() -> Self {
        let fake = Self::new();
        fake.fallback("/lol/league/", Reply::Json(json!([])));
        fake
    }

    pub fn reply(&self, key: impl Into<String>, reply: Reply) {
        self.replies.lock().unwrap().insert(key.into(), reply);
    }

    pub fn json(&self, key: impl Into<String>, value: Value) {
        self.reply(key, Reply::Json(value));
    }

    pub fn fallback(&self, fragment: impl Into<String>, reply: Reply) {
        self.fallbacks.lock().unwrap().push((fragment.into(), reply));
    }

    /// Every request key, in call order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of calls whose key starts with `prefix`
    pub fn count(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.starts_with(prefix))
            .count()
    }

    /// Number of calls with exactly this key
    pub fn count_exact(&self, key: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.as_str() == key)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

pub fn request_key(url: &str, params: &[(&str, String)]) -> String {
    if params.is_empty() {
        return url.to_string();
    }
    let query: Vec<String> = params.iter().map(|(k, v)| format!("{k}={v}")).collect();
    format!("{url}?{}", query.join("&"))
}

#[async_trait]
impl JsonSource for FakeSource {
    async fn get_json(&self, url: &str, params: &[(&str, String)]) -> ApiResult<Value> {
        let key = request_key(url, params);
        self.calls.lock().unwrap().push(key.clone());

        let scripted = self.replies.lock().unwrap().get(&key).cloned();
        let reply = scripted.or_else(|| {
            self.fallbacks
                .lock()
                .unwrap()
                .iter()
                .find(|(fragment, _)| key.contains(fragment.as_str()))
                .map(|(_, reply)| reply.clone())
        });

        match reply {
            Some(Reply::Json(value)) => Ok(value),
            Some(Reply::Reject(status)) => Err(ApiError::Rejected {
                url: url.to_string(),
                status,
                body: String::new(),
            }),
            Some(Reply::Exhausted) => Err(ApiError::Exhausted {
                url: url.to_string(),
                attempts: 5,
                last_error: "server error 503".to_string(),
            }),
            None => Err(ApiError::Rejected {
                url: url.to_string(),
                status: 404,
                body: "not scripted".to_string(),
            }),
        }
    }
}

/// Routes pointing every endpoint at [`FAKE_HOST`]
pub fn fake_routes() -> Arc<Routes> {
    Arc::new(Routes::single_host(FAKE_HOST))
}

/// Match detail with the given queue and duration
pub fn match_detail(match_id: &str, queue_id: i64, duration_secs: i64) -> Value {
    json!({
        "metadata": {"matchId": match_id},
        "info": {"queueId": queue_id, "gameDuration": duration_secs}
    })
}

pub fn timeline(match_id: &str) -> Value {
    json!({"metadata": {"matchId": match_id}, "info": {"frames": []}})
}

/// Script detail and timeline for an acceptable ranked match
pub fn script_good_match(fake: &FakeSource, routes: &Routes, match_id: &str) {
    fake.json(routes.match_url(match_id), match_detail(match_id, 420, 1800));
    fake.json(routes.timeline_url(match_id), timeline(match_id));
}

/// Request key of a match-id batch
pub fn ids_key(routes: &Routes, player: &str, start: u32, count: u32) -> String {
    request_key(
        &routes.match_ids_url(player),
        &[("start", start.to_string()), ("count", count.to_string())],
    )
}

/// Request key of a ladder page
pub fn ladder_key(routes: &Routes, division: ranked_match_collector::Division, page: u32) -> String {
    request_key(&routes.ladder_url(division), &[("page", page.to_string())])
}
