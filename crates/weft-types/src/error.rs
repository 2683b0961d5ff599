//! Error types for the weft solver.
//!
//! Data-dependent failures are returned as `WeftResult<T>`. Misuse of the
//! registry lifecycle (double `create_rules`, stiffness outside `(0, 1]`)
//! is a programming error and panics instead.

use thiserror::Error;

/// Unified error type for the weft solver.
#[derive(Debug, Error)]
pub enum WeftError {
    /// A topology tuple references a particle outside the registered range.
    #[error("Invalid topology: {0}")]
    InvalidTopology(String),

    /// A per-particle array or particle property is malformed.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Configuration value is invalid.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The host engine rejected a constraint range operation.
    #[error("Host range error: {0}")]
    HostRange(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Convenience alias for `Result<T, WeftError>`.
pub type WeftResult<T> = Result<T, WeftError>;
