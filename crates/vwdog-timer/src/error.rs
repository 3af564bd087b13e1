//! Error types for timer operations.

use thiserror::Error;

/// Errors that can occur while arming timers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimerError {
    /// A periodic timer was attached with a zero period.
    #[error("Periodic timer period must be greater than zero")]
    ZeroPeriod,

    /// The timer service thread could not be started.
    #[error("Failed to spawn timer service: {0}")]
    SpawnFailed(String),
}

impl TimerError {
    /// Create a spawn failure error.
    #[must_use]
    pub fn spawn_failed(reason: impl Into<String>) -> Self {
        Self::SpawnFailed(reason.into())
    }
}

/// A specialized `Result` type for timer operations.
pub type TimerResult<T> = std::result::Result<T, TimerError>;
