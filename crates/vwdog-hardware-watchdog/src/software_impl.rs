//! Software watchdog implementation.
//!
//! `SoftwareWatchdog` models the peripheral with a one-shot timer: `start()`
//! arms it with the timeout, every `kick()` re-arms it, and when it fires the
//! watchdog expires and requests a system reset.

use parking_lot::Mutex;
use portable_atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use vwdog_timer::{OneShotTimer, TimerFactory};

use crate::config::WatchdogConfig;
use crate::error::HardwareWatchdogResult;
use crate::reset::{ResetCause, SystemReset};
use crate::state::{WatchdogMetrics, WatchdogState, WatchdogStatus};
use crate::watchdog::HardwareWatchdog;

struct Shared {
    state: WatchdogState,
    timeout_us: AtomicU64,
    reset: Arc<dyn SystemReset>,
}

impl Shared {
    fn timeout(&self) -> Duration {
        Duration::from_micros(self.timeout_us.load(Ordering::Acquire))
    }

    fn expire(&self) {
        if self.state.expire().is_err() {
            return;
        }
        let timeout = self.timeout();
        tracing::error!(
            timeout_ms = timeout.as_millis(),
            "Hardware watchdog expired"
        );
        self.reset
            .system_reset(ResetCause::HardwareWatchdogExpired { timeout });
    }
}

/// Software-based hardware watchdog implementation.
///
/// Expiry runs on the timer's scheduling context, so with a
/// [`SimClock`](vwdog_timer::SimClock) it happens exactly at
/// `last kick + timeout`.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use std::time::Duration;
/// use vwdog_hardware_watchdog::prelude::*;
/// use vwdog_timer::SimClock;
///
/// let clock = SimClock::new();
/// let reset = Arc::new(RecordingReset::new(Arc::new(clock.clone())));
/// let watchdog = SoftwareWatchdog::new(&clock, reset.clone());
///
/// watchdog.start(Duration::from_millis(100)).expect("start");
/// clock.advance(Duration::from_millis(90));
/// watchdog.kick().expect("kick");
/// clock.advance(Duration::from_millis(90));
/// assert_eq!(reset.count(), 0);
///
/// clock.advance(Duration::from_millis(10));
/// assert_eq!(reset.count(), 1);
/// ```
pub struct SoftwareWatchdog {
    config: WatchdogConfig,
    timer: Box<dyn OneShotTimer>,
    shared: Arc<Shared>,
    // Serializes start/stop/kick so the timer is re-armed with the timeout
    // that matches the current status.
    control: Mutex<()>,
}

impl SoftwareWatchdog {
    /// Create a stopped watchdog with the default configuration.
    #[must_use]
    pub fn new(timers: &dyn TimerFactory, reset: Arc<dyn SystemReset>) -> Self {
        Self::with_config(WatchdogConfig::default(), timers, reset)
    }

    /// Create a stopped watchdog with the given configuration.
    #[must_use]
    pub fn with_config(
        config: WatchdogConfig,
        timers: &dyn TimerFactory,
        reset: Arc<dyn SystemReset>,
    ) -> Self {
        Self {
            config,
            timer: timers.one_shot(),
            shared: Arc::new(Shared {
                state: WatchdogState::new(),
                timeout_us: AtomicU64::new(0),
                reset,
            }),
            control: Mutex::new(()),
        }
    }

    fn arm(&self) {
        let shared = Arc::clone(&self.shared);
        self.timer
            .attach(Box::new(move || shared.expire()), self.shared.timeout());
    }

    /// Get the current status.
    #[must_use]
    pub fn status(&self) -> WatchdogStatus {
        self.shared.state.status()
    }

    /// Get the watchdog configuration.
    #[must_use]
    pub fn config(&self) -> &WatchdogConfig {
        &self.config
    }

    /// Get a snapshot of the watchdog counters.
    #[must_use]
    pub fn metrics(&self) -> WatchdogMetrics {
        self.shared.state.metrics()
    }
}

impl HardwareWatchdog for SoftwareWatchdog {
    fn start(&self, timeout: Duration) -> HardwareWatchdogResult<()> {
        self.config.check_timeout(timeout)?;
        let _control = self.control.lock();
        self.shared.state.start()?;
        let timeout_us = u64::try_from(timeout.as_micros()).unwrap_or(u64::MAX);
        self.shared.timeout_us.store(timeout_us, Ordering::Release);
        self.arm();
        tracing::info!(timeout_ms = timeout.as_millis(), "Hardware watchdog started");
        Ok(())
    }

    fn stop(&self) -> HardwareWatchdogResult<()> {
        let _control = self.control.lock();
        self.shared.state.stop()?;
        self.timer.detach();
        tracing::debug!("Hardware watchdog stopped");
        Ok(())
    }

    fn kick(&self) -> HardwareWatchdogResult<()> {
        let _control = self.control.lock();
        self.shared.state.kick()?;
        self.arm();
        tracing::trace!("Hardware watchdog kicked");
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.status() == WatchdogStatus::Running
    }

    fn timeout(&self) -> Option<Duration> {
        match self.status() {
            WatchdogStatus::Stopped if self.metrics().start_count == 0 => None,
            _ => Some(self.shared.timeout()),
        }
    }

    fn max_timeout(&self) -> Duration {
        Duration::from_millis(u64::from(self.config.max_timeout_ms))
    }
}

impl std::fmt::Debug for SoftwareWatchdog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoftwareWatchdog")
            .field("config", &self.config)
            .field("status", &self.status())
            .field("timeout", &self.shared.timeout())
            .finish_non_exhaustive()
    }
}
