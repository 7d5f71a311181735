//! Remote game-data API access
//!
//! Everything that talks to the network goes through a [`JsonSource`]. The
//! production implementation is [`RetryingClient`]; tests substitute an
//! in-memory source.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

pub mod client;
pub mod ladder;
pub mod match_ids;
pub mod player;
pub mod retry;
pub mod routes;

pub use client::RetryingClient;
pub use ladder::{LadderStream, LadderWalker};
pub use match_ids::{MatchIdScanner, MatchIdStream, ScanWindow, MAX_IDS_PER_CALL};
pub use player::PlayerResolver;
pub use retry::Outcome;
pub use routes::Routes;

/// API errors
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// 4xx other than 429; retrying cannot help
    #[error("request rejected ({status}) for {url}: {body}")]
    Rejected {
        /// Request URL
        url: String,
        /// HTTP status
        status: u16,
        /// Response body, truncated
        body: String,
    },

    /// Every attempt failed with a transient error
    #[error("giving up on {url} after {attempts} attempts: {last_error}")]
    Exhausted {
        /// Request URL
        url: String,
        /// Attempts made
        attempts: u32,
        /// Description of the final failure
        last_error: String,
    },

    /// A 2xx body that is not the expected JSON
    #[error("parse error for {url}: {reason}")]
    Parse {
        /// Request URL
        url: String,
        /// Parser message
        reason: String,
    },

    /// The credential cannot be sent as a header
    #[error("invalid credential: {0}")]
    InvalidCredential(String),

    /// The HTTP client could not be constructed
    #[error("HTTP client error: {0}")]
    ClientBuild(String),
}

impl ApiError {
    /// HTTP status behind the error, when there is one
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// Source of JSON documents addressed by URL and query parameters
#[async_trait]
pub trait JsonSource: Send + Sync {
    /// Fetch one JSON document
    ///
    /// # Errors
    /// Returns [`ApiError`] when the document cannot be obtained
    async fn get_json(&self, url: &str, params: &[(&str, String)]) -> ApiResult<Value>;
}

/// Deserialize a fetched document into a typed value
pub fn decode<T: DeserializeOwned>(url: &str, value: Value) -> ApiResult<T> {
    serde_json::from_value(value).map_err(|e| ApiError::Parse {
        url: url.to_string(),
        reason: e.to_string(),
    })
}
