//! Error types for classview-ai
//!
//! Three failure classes exist:
//! - [`BackendError`]: a vision backend call failed or timed out (retryable)
//! - [`AnalysisError::Scoring`]: no usable concept data (not retryable
//!   without new input)
//! - [`CacheError`]: degraded cache; never surfaces from the pipeline

use thiserror::Error;

/// Vision backend failure
#[derive(Debug, Error)]
pub enum BackendError {
    /// Network communication error
    #[error("Network error: {0}")]
    Network(String),

    /// Backend answered with an error status or payload
    #[error("API error: {0}")]
    Api(String),

    /// Failed to parse backend response
    #[error("Parse error: {0}")]
    Parse(String),

    /// Backend did not answer within the per-call timeout
    #[error("Timed out after {0} ms")]
    Timeout(u64),

    /// Scoring subprocess failed to start or exited unsuccessfully
    #[error("Process error: {0}")]
    Process(String),

    /// Backend not configured or unavailable (e.g. missing credentials)
    #[error("Backend not available: {0}")]
    NotAvailable(String),

    /// Internal processing error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error returned by [`crate::Analyzer::analyze`]
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// One backend failed; the request fails as a whole
    #[error("{backend} backend failed: {source}")]
    Backend {
        backend: String,
        #[source]
        source: BackendError,
    },

    /// Every configured backend failed
    #[error("All vision backends failed: {}", join_failures(.failures))]
    AllBackendsFailed { failures: Vec<(String, BackendError)> },

    /// Backends answered but produced no concepts to score
    #[error("Scoring error: {0}")]
    Scoring(String),

    /// Invalid analysis configuration or options
    #[error("Configuration error: {0}")]
    Config(String),
}

impl AnalysisError {
    /// Whether the caller may retry the same input
    ///
    /// Backend failures are transient (network, quota, timeout). A scoring
    /// failure means the image yielded nothing scoreable and will not change
    /// on retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AnalysisError::Backend { .. } | AnalysisError::AllBackendsFailed { .. }
        )
    }
}

fn join_failures(failures: &[(String, BackendError)]) -> String {
    failures
        .iter()
        .map(|(name, err)| format!("{}: {}", name, err))
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<classview_common::Error> for AnalysisError {
    fn from(err: classview_common::Error) -> Self {
        AnalysisError::Config(err.to_string())
    }
}

/// Cache store failure
///
/// Converted to a miss/no-op inside [`crate::cache::AnalysisCache`].
#[derive(Debug, Error)]
pub enum CacheError {
    /// Underlying store failed
    #[error("Cache store error: {0}")]
    Store(String),

    /// Cached payload could not be (de)serialized
    #[error("Cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
