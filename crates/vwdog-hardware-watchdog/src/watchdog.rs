//! Hardware watchdog trait definition.

use std::time::Duration;

use crate::error::HardwareWatchdogResult;

/// A single system watchdog peripheral.
///
/// Once started, the peripheral must be kicked at least once per timeout or
/// it resets the system. There is exactly one per system; the virtual
/// watchdog multiplexer is its only kicker.
///
/// # State Machine
///
/// ```text
/// Stopped ──start()──► Running ──(timeout without kick)──► reset
///                        │  ▲
///                        └──┘
///                       kick()
/// ```
///
/// # Implementation Requirements
///
/// 1. `kick()` MUST be callable from timer callback context
/// 2. `start()` MUST reject timeouts the peripheral cannot represent
/// 3. An expiry MUST end in a system reset
pub trait HardwareWatchdog: Send + Sync {
    /// Start the watchdog with `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if the watchdog is already running or the timeout is
    /// outside the supported range.
    fn start(&self, timeout: Duration) -> HardwareWatchdogResult<()>;

    /// Stop the watchdog.
    ///
    /// Many peripherals cannot be stopped once started; those return an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the watchdog is not running or cannot be stopped.
    fn stop(&self) -> HardwareWatchdogResult<()>;

    /// Restart the countdown.
    ///
    /// # Errors
    ///
    /// Returns an error if the watchdog is not running.
    fn kick(&self) -> HardwareWatchdogResult<()>;

    /// Check whether the watchdog is running.
    fn is_running(&self) -> bool;

    /// The timeout the watchdog was started with.
    ///
    /// Returns `None` if it was never started.
    fn timeout(&self) -> Option<Duration>;

    /// Largest timeout the peripheral supports.
    fn max_timeout(&self) -> Duration;
}
