//! Error types for the virtual watchdog system.
//!
//! Every variant describes a programming error. A client that misses its
//! deadline is never reported through these types: that path ends in a
//! system reset.

use std::time::Duration;
use thiserror::Error;
use vwdog_hardware_watchdog::HardwareWatchdogError;
use vwdog_timer::TimerError;

/// Errors that can occur during virtual watchdog operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WatchdogError {
    /// `start()` called on a running watchdog.
    #[error("Virtual watchdog is already running")]
    AlreadyRunning,

    /// `kick()` or `stop()` called on a watchdog that is not running.
    #[error("Virtual watchdog is not running")]
    NotRunning,

    /// Timeout is not strictly positive.
    #[error("Invalid timeout: {0:?} (must be greater than zero)")]
    InvalidTimeout(Duration),

    /// The hardware watchdog is already running with another timeout.
    #[error("Hardware watchdog already running with timeout {actual:?}, expected {expected:?}")]
    ConflictingHardware {
        /// Timeout the multiplexer is configured for.
        expected: Duration,
        /// Timeout the peripheral is running with.
        actual: Option<Duration>,
    },

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Shared hardware could not be brought up.
    #[error("Hardware initialization failed: {0}")]
    HardwareInit(String),
}

impl WatchdogError {
    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid_configuration(reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration(reason.into())
    }

    /// Create a hardware initialization error.
    #[must_use]
    pub fn hardware_init(reason: impl Into<String>) -> Self {
        Self::HardwareInit(reason.into())
    }
}

impl From<HardwareWatchdogError> for WatchdogError {
    fn from(err: HardwareWatchdogError) -> Self {
        Self::hardware_init(err.to_string())
    }
}

impl From<TimerError> for WatchdogError {
    fn from(err: TimerError) -> Self {
        Self::hardware_init(err.to_string())
    }
}

/// A specialized `Result` type for virtual watchdog operations.
pub type WatchdogResult<T> = std::result::Result<T, WatchdogError>;

/// Abort on API misuse.
///
/// Logs the error, then panics with its message.
#[track_caller]
#[expect(clippy::panic, reason = "misuse of the watchdog API is unrecoverable")]
pub(crate) fn fatal(err: &WatchdogError) -> ! {
    let location = std::panic::Location::caller();
    tracing::error!(error = %err, %location, "Fatal virtual watchdog misuse");
    panic!("{err}");
}
