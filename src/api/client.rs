//! Retrying HTTP client for the game-data API
//!
//! Provides the single funnel for outbound requests with:
//! - Rate limiter admission before every attempt, retries included
//! - Response classification through [`Outcome`]
//! - `Retry-After` handling for 429 and capped exponential backoff for 5xx
//! - Immediate failure on other client errors

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::api::retry::Outcome;
use crate::api::routes::{endpoint_class, TOKEN_HEADER};
use crate::api::{ApiError, ApiResult, JsonSource};
use crate::collector::config::{
    RetryPolicy, CONNECT_TIMEOUT, DEFAULT_MAX_ATTEMPTS, REQUEST_TIMEOUT,
};
use crate::collector::rate_limit::RateLimiter;
use crate::credential::ApiKey;
use crate::metrics::{record_retry_backoff, HttpRequestMetrics};

/// HTTP client wrapping every call in rate limiting and retries
pub struct RetryingClient {
    http: Client,
    rate_limiter: Arc<RateLimiter>,
    policy: RetryPolicy,
    max_attempts: u32,
}

impl RetryingClient {
    /// Create a client sending `key` on every request
    ///
    /// # Arguments
    /// * `key` - API key, sent as the token header
    /// * `rate_limiter` - Shared limiter; every client of one run must use the same instance
    pub fn new(key: &ApiKey, rate_limiter: Arc<RateLimiter>) -> ApiResult<Self> {
        let mut token = HeaderValue::from_str(key.expose())
            .map_err(|e| ApiError::InvalidCredential(e.to_string()))?;
        token.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(TOKEN_HEADER, token);

        let http = Client::builder()
            .default_headers(headers)
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ApiError::ClientBuild(e.to_string()))?;

        Ok(Self {
            http,
            rate_limiter,
            policy: RetryPolicy::default(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        })
    }

    /// Override retry timing
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the attempt budget used through [`JsonSource`]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Attempt budget used through [`JsonSource`]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Fetch one JSON document with up to `max_attempts` attempts
    ///
    /// # Errors
    /// - [`ApiError::Rejected`] on a 4xx other than 429, without retrying
    /// - [`ApiError::Parse`] when a 2xx body is not JSON
    /// - [`ApiError::Exhausted`] when every attempt failed transiently
    pub async fn fetch_json(
        &self,
        url: &str,
        params: &[(&str, String)],
        max_attempts: u32,
    ) -> ApiResult<Value> {
        let max_attempts = max_attempts.max(1);
        let endpoint = endpoint_class(url);
        let mut last_error = String::from("no attempt made");

        for attempt in 1..=max_attempts {
            self.rate_limiter.admit().await;

            let metrics = HttpRequestMetrics::start(endpoint, attempt);
            let outcome = match self.http.get(url).query(params).send().await {
                Ok(response) => {
                    metrics.record_complete(response.status().as_u16());
                    Outcome::from_response(response).await
                }
                Err(e) => {
                    metrics.record_network_error();
                    Outcome::from_transport_error(&e)
                }
            };

            if !outcome.is_retryable() {
                return match outcome {
                    Outcome::Success(value) => {
                        if attempt > 1 {
                            debug!(url, attempt, "Request succeeded after retry");
                        }
                        Ok(value)
                    }
                    Outcome::ClientPermanent { status, body } => Err(ApiError::Rejected {
                        url: url.to_string(),
                        status,
                        body,
                    }),
                    Outcome::ParseFailure(reason) => Err(ApiError::Parse {
                        url: url.to_string(),
                        reason,
                    }),
                    other => Err(ApiError::Exhausted {
                        url: url.to_string(),
                        attempts: attempt,
                        last_error: other.description(),
                    }),
                };
            }

            last_error = outcome.description();
            if attempt == max_attempts {
                break;
            }

            let wait = match &outcome {
                Outcome::QuotaTransient { retry_after_secs } => {
                    self.policy.quota_wait(*retry_after_secs)
                }
                _ => self.policy.backoff(attempt),
            };
            warn!(
                url,
                attempt,
                max_attempts,
                reason = %last_error,
                wait_ms = wait.as_millis() as u64,
                "Retrying request"
            );
            record_retry_backoff(wait, attempt, outcome.label());
            sleep(wait).await;
        }

        Err(ApiError::Exhausted {
            url: url.to_string(),
            attempts: max_attempts,
            last_error,
        })
    }
}

#[async_trait]
impl JsonSource for RetryingClient {
    async fn get_json(&self, url: &str, params: &[(&str, String)]) -> ApiResult<Value> {
        self.fetch_json(url, params, self.max_attempts).await
    }
}
