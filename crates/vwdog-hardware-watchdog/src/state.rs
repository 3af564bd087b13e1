//! Watchdog state machine and metrics.
//!
//! Transitions are single compare-exchange operations, so the status can be
//! read from any thread, including timer callbacks, without locking.

use portable_atomic::{AtomicU32, Ordering};

use crate::error::HardwareWatchdogError;

/// Watchdog operational status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u32)]
pub enum WatchdogStatus {
    /// Counter is not running.
    #[default]
    Stopped = 0,
    /// Counter is running and must be kicked before it runs out.
    Running = 1,
    /// Counter ran out and the system reset was requested (terminal state).
    Expired = 2,
}

impl WatchdogStatus {
    /// Convert from raw u32 value.
    #[must_use]
    pub fn from_raw(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Stopped),
            1 => Some(Self::Running),
            2 => Some(Self::Expired),
            _ => None,
        }
    }

    /// Convert to raw u32 value.
    #[must_use]
    pub fn to_raw(self) -> u32 {
        self as u32
    }

    /// Check if the watchdog is in a terminal state.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Expired)
    }

    /// Get the status as a string slice.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stopped => "Stopped",
            Self::Running => "Running",
            Self::Expired => "Expired",
        }
    }
}

impl std::fmt::Display for WatchdogStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Atomic watchdog state.
///
/// # State Transition Diagram
///
/// ```text
/// Stopped ──start()──► Running ──expire()──► Expired
///     ▲                  │  ▲
///     │                  │  │
///     └─────stop()───────┘  └──kick()
/// ```
#[derive(Debug)]
pub struct WatchdogState {
    status: AtomicU32,
    start_count: AtomicU32,
    kick_count: AtomicU32,
    expiry_count: AtomicU32,
}

impl WatchdogState {
    /// Create a new watchdog state in the Stopped status.
    #[must_use]
    pub fn new() -> Self {
        Self {
            status: AtomicU32::new(WatchdogStatus::Stopped.to_raw()),
            start_count: AtomicU32::new(0),
            kick_count: AtomicU32::new(0),
            expiry_count: AtomicU32::new(0),
        }
    }

    /// Get the current status.
    #[must_use]
    pub fn status(&self) -> WatchdogStatus {
        let raw = self.status.load(Ordering::Acquire);
        WatchdogStatus::from_raw(raw).unwrap_or(WatchdogStatus::Stopped)
    }

    fn transition(
        &self,
        from: WatchdogStatus,
        to: WatchdogStatus,
    ) -> Result<(), HardwareWatchdogError> {
        self.status
            .compare_exchange(
                from.to_raw(),
                to.to_raw(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map(|_| ())
            .map_err(|current| {
                let current = WatchdogStatus::from_raw(current).unwrap_or(WatchdogStatus::Stopped);
                match (current, to) {
                    (WatchdogStatus::Running, WatchdogStatus::Running) => {
                        HardwareWatchdogError::AlreadyRunning
                    }
                    (WatchdogStatus::Expired, _) => HardwareWatchdogError::Expired,
                    _ => HardwareWatchdogError::invalid_transition(current.as_str(), to.as_str()),
                }
            })
    }

    /// Transition from Stopped to Running.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareWatchdogError::AlreadyRunning`] if running, or
    /// [`HardwareWatchdogError::Expired`] after expiry.
    pub fn start(&self) -> Result<(), HardwareWatchdogError> {
        self.transition(WatchdogStatus::Stopped, WatchdogStatus::Running)?;
        self.start_count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Transition from Running to Stopped.
    ///
    /// # Errors
    ///
    /// Returns an error if the watchdog is not running.
    pub fn stop(&self) -> Result<(), HardwareWatchdogError> {
        match self.transition(WatchdogStatus::Running, WatchdogStatus::Stopped) {
            Err(HardwareWatchdogError::InvalidTransition { .. }) => {
                Err(HardwareWatchdogError::NotRunning)
            }
            other => other,
        }
    }

    /// Record a kick (Running state only).
    ///
    /// # Errors
    ///
    /// Returns an error if the watchdog is not running.
    pub fn kick(&self) -> Result<(), HardwareWatchdogError> {
        match self.status() {
            WatchdogStatus::Running => {
                self.kick_count.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            WatchdogStatus::Stopped => Err(HardwareWatchdogError::NotRunning),
            WatchdogStatus::Expired => Err(HardwareWatchdogError::Expired),
        }
    }

    /// Transition from Running to Expired.
    ///
    /// # Errors
    ///
    /// Returns an error if the watchdog is not running, e.g. because it was
    /// stopped while the expiry was in flight.
    pub fn expire(&self) -> Result<(), HardwareWatchdogError> {
        self.transition(WatchdogStatus::Running, WatchdogStatus::Expired)?;
        self.expiry_count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Take a snapshot of the counters.
    #[must_use]
    pub fn metrics(&self) -> WatchdogMetrics {
        WatchdogMetrics {
            start_count: u64::from(self.start_count.load(Ordering::Acquire)),
            kick_count: u64::from(self.kick_count.load(Ordering::Acquire)),
            expiry_count: u64::from(self.expiry_count.load(Ordering::Acquire)),
        }
    }
}

impl Default for WatchdogState {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of watchdog counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WatchdogMetrics {
    /// Number of successful starts.
    pub start_count: u64,
    /// Number of kicks accepted while running.
    pub kick_count: u64,
    /// Number of expiries.
    pub expiry_count: u64,
}
