//! Response classification for the retry loop
//!
//! Each HTTP attempt is reduced to exactly one [`Outcome`], and the client
//! dispatches on it. Status ranges are inspected here and nowhere else.

use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Response, StatusCode};
use serde_json::Value;

/// Longest response body excerpt kept in error messages
const BODY_EXCERPT_CHARS: usize = 200;

/// Classified result of one HTTP attempt
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// 2xx with a JSON body
    Success(Value),
    /// 429 quota rejection, with the server's `Retry-After` in seconds if readable
    QuotaTransient {
        /// Parsed `Retry-After` header
        retry_after_secs: Option<f64>,
    },
    /// 5xx, transport failure or request timeout
    ServerTransient {
        /// HTTP status, absent for transport failures
        status: Option<u16>,
        /// Human-readable cause
        detail: String,
    },
    /// Any other 4xx, or an unexpected non-success status
    ClientPermanent {
        /// HTTP status
        status: u16,
        /// Response body excerpt
        body: String,
    },
    /// 2xx whose body is not valid JSON
    ParseFailure(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatusClass {
    Success,
    Quota,
    Server,
    Client,
}

fn classify(status: StatusCode) -> StatusClass {
    if status.is_success() {
        StatusClass::Success
    } else if status == StatusCode::TOO_MANY_REQUESTS {
        StatusClass::Quota
    } else if status.is_server_error() {
        StatusClass::Server
    } else {
        // 4xx, plus 1xx/3xx that should never reach us with redirects followed
        StatusClass::Client
    }
}

impl Outcome {
    /// Read a response once and classify it
    pub async fn from_response(response: Response) -> Self {
        let status = response.status();
        match classify(status) {
            StatusClass::Success => match response.bytes().await {
                Ok(bytes) => match serde_json::from_slice(&bytes) {
                    Ok(value) => Outcome::Success(value),
                    Err(e) => Outcome::ParseFailure(e.to_string()),
                },
                // Body stream broke mid-read: treat like a dropped connection
                Err(e) => Outcome::ServerTransient {
                    status: Some(status.as_u16()),
                    detail: format!("failed to read body: {e}"),
                },
            },
            StatusClass::Quota => Outcome::QuotaTransient {
                retry_after_secs: parse_retry_after(response.headers()),
            },
            StatusClass::Server => Outcome::ServerTransient {
                status: Some(status.as_u16()),
                detail: format!("server error {status}"),
            },
            StatusClass::Client => {
                let body = response.text().await.unwrap_or_default();
                Outcome::ClientPermanent {
                    status: status.as_u16(),
                    body: excerpt(&body),
                }
            }
        }
    }

    /// Classify a request that produced no response
    pub fn from_transport_error(err: &reqwest::Error) -> Self {
        let detail = if err.is_timeout() {
            format!("request timed out: {err}")
        } else if err.is_connect() {
            format!("connection failed: {err}")
        } else {
            format!("network error: {err}")
        };
        Outcome::ServerTransient {
            status: None,
            detail,
        }
    }

    /// Whether another attempt may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Outcome::QuotaTransient { .. } | Outcome::ServerTransient { .. }
        )
    }

    /// Short label used for metrics and logs
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Success(_) => "success",
            Outcome::QuotaTransient { .. } => "rate_limited",
            Outcome::ServerTransient { status: Some(_), .. } => "server_error",
            Outcome::ServerTransient { status: None, .. } => "network_error",
            Outcome::ClientPermanent { .. } => "client_error",
            Outcome::ParseFailure(_) => "parse_error",
        }
    }

    /// Description of a failed attempt
    pub fn description(&self) -> String {
        match self {
            Outcome::Success(_) => "success".to_string(),
            Outcome::QuotaTransient { .. } => "rate limit exceeded (429)".to_string(),
            Outcome::ServerTransient { detail, .. } => detail.clone(),
            Outcome::ClientPermanent { status, body } => format!("client error {status}: {body}"),
            Outcome::ParseFailure(reason) => format!("invalid JSON body: {reason}"),
        }
    }
}

/// Read `Retry-After` as seconds; HTTP-date values are not used by this API
pub fn parse_retry_after(headers: &HeaderMap) -> Option<f64> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<f64>()
        .ok()
}

fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= BODY_EXCERPT_CHARS {
        trimmed.to_string()
    } else {
        let cut: String = trimmed.chars().take(BODY_EXCERPT_CHARS).collect();
        format!("{cut}...")
    }
}
