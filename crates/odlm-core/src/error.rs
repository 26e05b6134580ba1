//! Error types for the ODLM core simulator.

use thiserror::Error;

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors that can occur while constructing or validating layers.
///
/// Simulation-time conditions (a cap reached, stabilization not achieved)
/// are never represented as errors here; they are reported through
/// [`crate::orchestrator::RunReport`] counters instead, since the simulator
/// must produce a defined result for every reachable input.
#[derive(Error, Debug)]
pub enum CoreError {
    /// The image buffer backing a layer was empty or had inconsistent
    /// dimensions.
    #[error("invalid image: {reason}")]
    InvalidImage {
        /// Human-readable reason.
        reason: String,
    },

    /// A layer was constructed with a width or height of zero.
    #[error("invalid layer dimensions: {width}x{height}")]
    InvalidDimensions {
        /// Requested width.
        width: usize,
        /// Requested height.
        height: usize,
    },

    /// A line in an INI configuration file could not be parsed.
    #[error("config parse failure at line {line}: {text:?}")]
    ConfigParse {
        /// 1-based line number.
        line: usize,
        /// Offending line text.
        text: String,
    },

    /// `validate_state` found a mismatch against a saved snapshot.
    #[error("validation mismatch: {reason}")]
    Validation {
        /// Human-readable reason.
        reason: String,
    },

    /// I/O failure while reading or writing a config or snapshot file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// Build an [`CoreError::InvalidImage`].
    pub fn invalid_image(reason: impl Into<String>) -> Self {
        Self::InvalidImage {
            reason: reason.into(),
        }
    }

    /// Build a [`CoreError::Validation`].
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }
}
