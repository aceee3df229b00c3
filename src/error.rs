// =============================================================================
// Engine errors
// =============================================================================
//
// Every validation failure is reported before any computation starts, so a
// caller never receives a half-built indicator or model.  Numeric degeneracy
// (e.g. RSI with zero average loss) is resolved locally and never shows up
// here.

use thiserror::Error;

/// Errors raised by indicator construction and forecast model training.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// A period, order, smoothing factor or multiplier is outside its domain.
    #[error("invalid parameter: {name} - {reason}")]
    InvalidParameter { name: String, reason: String },

    /// Fewer historical points than the indicator or model needs.
    #[error("insufficient data: required {required}, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    /// `forecast` was called on a model that has not been trained.
    #[error("{model} has not been trained; call train() before forecast()")]
    NotTrained { model: String },

    /// The price history handed to the engine is malformed.
    #[error("invalid price history: {0}")]
    InvalidHistory(String),

    /// A point was appended to a series out of chronological order.
    #[error("timestamp {next} does not follow {previous}")]
    NonMonotonicTimestamp { previous: i64, next: i64 },
}

impl EngineError {
    /// Shorthand for [`EngineError::InvalidParameter`].
    pub fn invalid_parameter(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// Result alias used throughout the engine.
pub type Result<T> = std::result::Result<T, EngineError>;
