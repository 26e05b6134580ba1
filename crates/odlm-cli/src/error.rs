//! Error handling for the ODLM CLI.

use thiserror::Error;

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

/// CLI-specific errors.
#[derive(Error, Debug)]
pub enum CliError {
    /// Core simulator error.
    #[error("simulator error: {0}")]
    Core(#[from] odlm_core::CoreError),

    /// Image decoding/encoding error.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON report serialization error.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Invalid command arguments.
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    /// Missing required file or resource.
    #[error("missing resource: {0}")]
    MissingResource(String),

    /// Reported after a successful command whose result is itself a
    /// failure condition (e.g. `validate` finding a mismatch), so `main`
    /// can translate it into a non-zero exit without logging it as an
    /// internal error.
    #[error("{0}")]
    ValidationFailed(String),

    /// Catch-all for ad hoc failures raised with `anyhow::anyhow!` at call
    /// sites that don't warrant their own variant here.
    #[error(transparent)]
    Generic(#[from] anyhow::Error),
}

impl CliError {
    /// Create an invalid-arguments error.
    pub fn invalid_args(msg: impl Into<String>) -> Self {
        Self::InvalidArgs(msg.into())
    }

    /// Create a missing-resource error.
    pub fn missing_resource(msg: impl Into<String>) -> Self {
        Self::MissingResource(msg.into())
    }
}
