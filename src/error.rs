use std::io;
use thiserror::Error;

/// Error type for pool construction and the registry surface.
///
/// Errors produced by jobs themselves never pass through this type: the
/// pools hand them back to the caller untouched.
#[derive(Error, Debug)]
pub enum PoolError {
    /// The requested concurrency limit was zero.
    #[error("Concurrency limit must be at least 1, got {0}")]
    InvalidLimit(u32),

    /// The backing rayon pool could not be built.
    #[error("Failed to build thread pool: {0}")]
    ThreadPoolBuild(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Serialization/deserialization error.
    #[error("Serde error: {0}")]
    Serde(#[from] serde_json::Error),

    /// HTTP transport or status error from a registry.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A registry answered with something we cannot use.
    #[error("Registry error: {0}")]
    Registry(String),
}

/// Result type alias for crate operations.
pub type Result<T> = std::result::Result<T, PoolError>;
