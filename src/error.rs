//! Error types for the rating engine
//!
//! This module defines the error taxonomy used throughout the crate. Fallible
//! functions return `anyhow::Result`, domain failures are `RatingError`
//! values converted with `.into()` and recovered with `downcast_ref`.

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Custom error types for specific rating scenarios
#[derive(Debug, thiserror::Error)]
pub enum RatingError {
    /// Malformed race input; aborts the current race only
    #[error("Data integrity error: {reason}")]
    DataIntegrity { reason: String },

    /// Unusable configuration or unrecognised race type
    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    /// Logic or data-corruption bug; never clamped away
    #[error("Invariant violation: {reason}")]
    InvariantViolation { reason: String },

    #[error("Race already processed: {race}")]
    RaceAlreadyProcessed { race: String },

    #[error("Storage error: {message}")]
    StorageError { message: String },
}

impl RatingError {
    pub fn data_integrity(reason: impl Into<String>) -> Self {
        Self::DataIntegrity {
            reason: reason.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::ConfigurationError {
            message: message.into(),
        }
    }

    pub fn invariant(reason: impl Into<String>) -> Self {
        Self::InvariantViolation {
            reason: reason.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::StorageError {
            message: message.into(),
        }
    }

    /// Short label used for logging and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            RatingError::DataIntegrity { .. } => "data_integrity",
            RatingError::ConfigurationError { .. } => "configuration",
            RatingError::InvariantViolation { .. } => "invariant_violation",
            RatingError::RaceAlreadyProcessed { .. } => "already_processed",
            RatingError::StorageError { .. } => "storage",
        }
    }
}

/// Classify an error coming out of the engine, if it is a domain error
pub fn rating_error(err: &anyhow::Error) -> Option<&RatingError> {
    err.downcast_ref::<RatingError>()
}
