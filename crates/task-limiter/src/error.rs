//! Error types for the fallible slot operations.
//!
//! The core operations (`new`, `submit`, `join`, `acquire`, `release`) cannot
//! fail. Only the bounded variants of slot acquisition report errors.

use std::time::Duration;

/// Errors returned by bounded slot acquisition.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LimiterError {
    /// Every slot is held and the caller asked not to wait.
    #[error("limiter is full: all {capacity} slots are held")]
    Full {
        /// Capacity of the limiter.
        capacity: usize,
    },
    /// No slot became free within the allowed wait.
    #[error("timed out after {waited:?} waiting for a limiter slot")]
    Timeout {
        /// How long the caller waited before giving up.
        waited: Duration,
    },
}

impl LimiterError {
    /// Returns true if this error is a wait timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, LimiterError::Timeout { .. })
    }

    /// Returns true if this error is an immediate rejection.
    pub fn is_full(&self) -> bool {
        matches!(self, LimiterError::Full { .. })
    }
}

/// Result type for limiter operations.
pub type Result<T> = std::result::Result<T, LimiterError>;
