//! Error types for cpforge

use thiserror::Error;

/// Main error type for cpforge operations.
///
/// Search failures are not errors: they travel as `Failure` values inside the
/// solver. This type covers misuse that the caller can recover from.
#[derive(Debug, Error)]
pub enum CpForgeError {
    /// Error in solver configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid operation for current solver state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Internal error (should not occur in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for cpforge operations
pub type Result<T> = std::result::Result<T, CpForgeError>;
