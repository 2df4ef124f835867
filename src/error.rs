//! Error types for background modelling operations

use thiserror::Error;

/// Result type alias for background modelling operations
pub type Result<T> = std::result::Result<T, BgModelError>;

/// Error types surfaced by the background model, its engine and the CLI glue
#[derive(Error, Debug)]
pub enum BgModelError {
    /// Input/output errors (file not found, permission denied, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decoding or encoding errors
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// Parameter file or reconfiguration message could not be parsed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid configuration or parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Frame or output buffer does not match the engine's resolution
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// The mixture update produced a degenerate state (non-finite weight sum, NaN)
    #[error("Numeric degeneracy: {0}")]
    NumericDegeneracy(String),

    /// The engine stopped after a fatal numeric error and refuses further frames
    #[error("Engine halted: {0}")]
    EngineHalted(String),

    /// Generic error for unexpected conditions
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BgModelError {
    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a new numeric degeneracy error
    pub fn numeric<S: Into<String>>(msg: S) -> Self {
        Self::NumericDegeneracy(msg.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Create a buffer length error with the expected and actual sizes
    pub fn dimension_mismatch(buffer: &str, expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch(format!(
            "{} has {} elements, expected {}",
            buffer, actual, expected
        ))
    }

    /// Create configuration error with valid ranges
    pub fn config_value_error<T: std::fmt::Display>(
        parameter: &str,
        value: T,
        valid_range: &str,
        recommended: Option<T>,
    ) -> Self {
        let recommendation = match recommended {
            Some(rec) => format!(" Recommended: {}", rec),
            None => String::new(),
        };

        Self::InvalidConfig(format!(
            "Invalid {}: {} (valid range: {}).{}",
            parameter, value, valid_range, recommendation
        ))
    }

    /// True for errors that leave the background model unusable
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::NumericDegeneracy(_) | Self::EngineHalted(_))
    }
}
