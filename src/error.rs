use thiserror::Error;

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Failure talking to the places provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Connection failure, timeout or non-2xx response
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider answered with a non-OK status field
    #[error("provider status {status}: {message}")]
    Status { status: String, message: String },

    /// Body did not match the expected response shape
    #[error("decode error: {0}")]
    Decode(String),
}

/// Errors that abort a pipeline run or one of its outer-layer steps.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("area catalog is empty")]
    EmptyCatalog,

    #[error("invalid area '{area}': {reason}")]
    InvalidArea { area: String, reason: String },

    #[error("nearby search failed for area '{area}' (page {page}): {source}")]
    NearbySearch {
        area: String,
        page: usize,
        #[source]
        source: ProviderError,
    },

    #[error("invalid setting '{key}': {reason}")]
    InvalidSetting { key: &'static str, reason: String },

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("snapshot storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}
