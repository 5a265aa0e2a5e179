use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for hub operations
pub type Result<T, E = HubError> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum HubError {
    #[error("No providers specified")]
    NoProviders,

    #[error("User data not found for userId: {0}")]
    UserNotFound(String),

    #[error("Invalid user id: {0:?}")]
    InvalidUserId(String),

    #[error("Failed to read user data from {path}: {source}")]
    ProfileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse user data from {path}: {message}")]
    ProfileParse { path: PathBuf, message: String },

    #[error("Operation cancelled")]
    Cancelled,
}
