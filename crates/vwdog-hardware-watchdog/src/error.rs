//! Error types for hardware watchdog operations.

/// Errors that can occur during hardware watchdog operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HardwareWatchdogError {
    /// Watchdog is not running.
    NotRunning,
    /// Watchdog is already running.
    AlreadyRunning,
    /// Watchdog has expired and the system reset was requested.
    Expired,
    /// Requested timeout is outside what the peripheral supports.
    InvalidTimeout {
        /// Requested timeout in milliseconds.
        requested_ms: u64,
        /// Smallest supported timeout in milliseconds.
        min_ms: u32,
        /// Largest supported timeout in milliseconds.
        max_ms: u32,
    },
    /// Invalid configuration.
    InvalidConfiguration(String),
    /// State transition not allowed.
    InvalidTransition {
        /// Current state.
        from: &'static str,
        /// Attempted target state.
        to: &'static str,
    },
}

impl HardwareWatchdogError {
    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Create an invalid transition error.
    #[must_use]
    pub fn invalid_transition(from: &'static str, to: &'static str) -> Self {
        Self::InvalidTransition { from, to }
    }
}

impl std::fmt::Display for HardwareWatchdogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotRunning => write!(f, "Watchdog is not running"),
            Self::AlreadyRunning => write!(f, "Watchdog is already running"),
            Self::Expired => write!(f, "Watchdog has expired"),
            Self::InvalidTimeout {
                requested_ms,
                min_ms,
                max_ms,
            } => write!(
                f,
                "Invalid timeout: {requested_ms}ms is outside {min_ms}..={max_ms}ms"
            ),
            Self::InvalidConfiguration(msg) => write!(f, "Invalid configuration: {msg}"),
            Self::InvalidTransition { from, to } => {
                write!(f, "Invalid state transition: {from} -> {to}")
            }
        }
    }
}

impl std::error::Error for HardwareWatchdogError {}

/// A specialized `Result` type for hardware watchdog operations.
pub type HardwareWatchdogResult<T> = std::result::Result<T, HardwareWatchdogError>;
