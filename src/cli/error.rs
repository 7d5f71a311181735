//! CLI error types and conversions

use crate::api::ApiError;
use crate::collector::CollectError;
use crate::credential::CredentialError;
use crate::metrics::MetricsError;
use crate::resume::StateError;
use crate::store::StoreError;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// No API key available
    #[error("{0}")]
    MissingCredential(#[from] CredentialError),

    /// API client error
    #[error("API error: {0}")]
    ApiError(#[from] ApiError),

    /// Collection error
    #[error("collection error: {0}")]
    CollectError(#[from] CollectError),

    /// Match list error
    #[error("match list error: {0}")]
    StateError(#[from] StateError),

    /// Bundle store error
    #[error("store error: {0}")]
    StoreError(#[from] StoreError),

    /// Metrics exporter error
    #[error("metrics error: {0}")]
    MetricsError(#[from] MetricsError),

    /// Invalid argument
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
