use shared::cache::CacheError;
use thiserror::Error;

/// Result type alias for contribution operations
pub type Result<T, E = ContributionsError> = std::result::Result<T, E>;

/// Failures talking to a platform API.
///
/// The display text of these errors ends up in `meta.errors`, so it is kept short
/// and free of credentials.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Missing PAT")]
    MissingToken,

    #[error("HTTP {0}")]
    Status(reqwest::StatusCode),

    #[error("{0}")]
    GraphQl(String),

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Unexpected response: {0}")]
    Decode(String),
}

#[derive(Error, Debug)]
pub enum ContributionsError {
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Invalid year {0}, expected 1970..=9999")]
    InvalidYear(i32),

    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    #[error("Operation cancelled")]
    Cancelled,
}
