//! Client-facing virtual watchdog handle.
//!
//! Each subsystem that needs liveness supervision owns one
//! [`VirtualWatchdog`] with its own timeout. Once started, it must be kicked
//! within that timeout or the whole system is reset.
//!
//! Misuse (starting twice, kicking or stopping a stopped watchdog, a zero
//! timeout, conflicting hardware) is a programming error. The plain methods
//! log and panic on it; the `try_` forms return the error instead.

use std::sync::Arc;
use std::time::Duration;

use crate::config::MultiplexMode;
use crate::context::WatchdogContext;
use crate::error::{WatchdogError, WatchdogResult, fatal};
use crate::registry::ClientHandle;
use crate::reschedule::RescheduleTimer;

#[derive(Debug)]
enum Supervision {
    TickWalk(Option<ClientHandle>),
    Reschedule { timer: RescheduleTimer, running: bool },
}

/// A logical watchdog multiplexed onto the system watchdog.
///
/// Dropping a running watchdog stops it.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use std::time::Duration;
/// use vwdog::prelude::*;
/// use vwdog_hardware_watchdog::RecordingReset;
/// use vwdog_timer::SimClock;
///
/// let clock = SimClock::new();
/// let reset = Arc::new(RecordingReset::new(Arc::new(clock.clone())));
/// let context = WatchdogContext::builder()
///     .timers(Arc::new(clock.clone()))
///     .reset(reset.clone())
///     .build()
///     .expect("valid context");
///
/// let mut watchdog = VirtualWatchdog::named(&context, Duration::from_millis(100), "sensor");
/// watchdog.start();
/// clock.advance(Duration::from_millis(150));
///
/// // Never before the timeout, and at most two 1ms ticks after it.
/// let event = reset.first().expect("reset requested");
/// assert!(event.at >= Duration::from_millis(100));
/// assert!(event.at <= Duration::from_millis(102));
/// ```
#[derive(Debug)]
pub struct VirtualWatchdog {
    context: WatchdogContext,
    timeout: Duration,
    name: Option<Arc<str>>,
    supervision: Supervision,
}

impl VirtualWatchdog {
    /// Create a stopped watchdog.
    ///
    /// # Panics
    ///
    /// Panics if `timeout` is zero or the shared hardware cannot be brought
    /// up; see [`VirtualWatchdog::try_new`].
    #[must_use]
    #[track_caller]
    pub fn new(context: &WatchdogContext, timeout: Duration) -> Self {
        Self::try_new(context, timeout, None).unwrap_or_else(|err| fatal(&err))
    }

    /// Create a stopped watchdog with a timeout in whole milliseconds.
    ///
    /// # Panics
    ///
    /// Panics if `timeout_ms` is zero or the shared hardware cannot be
    /// brought up.
    #[must_use]
    #[track_caller]
    pub fn from_millis(context: &WatchdogContext, timeout_ms: u64) -> Self {
        Self::new(context, Duration::from_millis(timeout_ms))
    }

    /// Create a stopped watchdog with a diagnostic name.
    ///
    /// # Panics
    ///
    /// Panics if `timeout` is zero or the shared hardware cannot be brought
    /// up.
    #[must_use]
    #[track_caller]
    pub fn named(context: &WatchdogContext, timeout: Duration, name: &str) -> Self {
        Self::try_new(context, timeout, Some(name)).unwrap_or_else(|err| fatal(&err))
    }

    /// Create a stopped watchdog.
    ///
    /// The first watchdog created on a context brings up the shared
    /// hardware.
    ///
    /// # Errors
    ///
    /// Returns [`WatchdogError::InvalidTimeout`] for a zero timeout, or the
    /// error from [`WatchdogContext::ensure_initialized`].
    pub fn try_new(
        context: &WatchdogContext,
        timeout: Duration,
        name: Option<&str>,
    ) -> WatchdogResult<Self> {
        if timeout.is_zero() {
            return Err(WatchdogError::InvalidTimeout(timeout));
        }
        context.ensure_initialized()?;

        let supervision = match context.mode() {
            MultiplexMode::TickWalk => {
                if timeout < context.config().tick_period {
                    tracing::warn!(
                        client = name.unwrap_or("<unnamed>"),
                        timeout_us = timeout.as_micros(),
                        tick_us = context.config().tick_period.as_micros(),
                        "Timeout shorter than the tick period is detected up to two ticks late"
                    );
                }
                Supervision::TickWalk(None)
            }
            MultiplexMode::Reschedule => Supervision::Reschedule {
                timer: RescheduleTimer::new(
                    context.timers().one_shot(),
                    timeout,
                    name,
                    Arc::clone(context.reset()),
                ),
                running: false,
            },
        };

        Ok(Self {
            context: context.clone(),
            timeout,
            name: name.map(Arc::from),
            supervision,
        })
    }

    fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("<unnamed>")
    }

    /// Start supervision.
    ///
    /// # Panics
    ///
    /// Panics if the watchdog is already running.
    #[track_caller]
    pub fn start(&mut self) {
        if let Err(err) = self.try_start() {
            fatal(&err);
        }
    }

    /// Start supervision.
    ///
    /// # Errors
    ///
    /// Returns [`WatchdogError::AlreadyRunning`] if the watchdog is running.
    pub fn try_start(&mut self) -> WatchdogResult<()> {
        match &mut self.supervision {
            Supervision::TickWalk(Some(_)) | Supervision::Reschedule { running: true, .. } => {
                return Err(WatchdogError::AlreadyRunning);
            }
            Supervision::TickWalk(handle @ None) => {
                let name = self.name.clone();
                let timeout = self.timeout;
                *handle = Some(
                    self.context
                        .registry()
                        .with(|registry| registry.register(name, timeout)),
                );
            }
            Supervision::Reschedule { timer, running } => {
                timer.arm();
                *running = true;
            }
        }
        tracing::debug!(
            client = self.label(),
            timeout_ms = self.timeout.as_millis(),
            mode = %self.context.mode(),
            "Virtual watchdog started"
        );
        Ok(())
    }

    /// Restart the countdown.
    ///
    /// # Panics
    ///
    /// Panics if the watchdog is not running.
    #[track_caller]
    pub fn kick(&self) {
        if let Err(err) = self.try_kick() {
            fatal(&err);
        }
    }

    /// Restart the countdown.
    ///
    /// # Errors
    ///
    /// Returns [`WatchdogError::NotRunning`] if the watchdog is not running.
    pub fn try_kick(&self) -> WatchdogResult<()> {
        match &self.supervision {
            Supervision::TickWalk(Some(handle)) => {
                let handle = *handle;
                if !self.context.registry().with(|registry| registry.kick(handle)) {
                    tracing::warn!(client = self.label(), "Kicked client missing from registry");
                }
            }
            Supervision::Reschedule {
                timer,
                running: true,
            } => timer.arm(),
            Supervision::TickWalk(None) | Supervision::Reschedule { running: false, .. } => {
                return Err(WatchdogError::NotRunning);
            }
        }
        tracing::trace!(client = self.label(), "Virtual watchdog kicked");
        Ok(())
    }

    /// Stop supervision. Effective on return.
    ///
    /// # Panics
    ///
    /// Panics if the watchdog is not running.
    #[track_caller]
    pub fn stop(&mut self) {
        if let Err(err) = self.try_stop() {
            fatal(&err);
        }
    }

    /// Stop supervision. Effective on return.
    ///
    /// # Errors
    ///
    /// Returns [`WatchdogError::NotRunning`] if the watchdog is not running.
    pub fn try_stop(&mut self) -> WatchdogResult<()> {
        match &mut self.supervision {
            Supervision::TickWalk(handle @ Some(_)) => {
                if let Some(handle) = handle.take() {
                    self.context
                        .registry()
                        .with(|registry| registry.unregister(handle));
                }
            }
            Supervision::Reschedule {
                timer,
                running: running @ true,
            } => {
                timer.disarm();
                *running = false;
            }
            Supervision::TickWalk(None) | Supervision::Reschedule { running: false, .. } => {
                return Err(WatchdogError::NotRunning);
            }
        }
        tracing::debug!(client = self.label(), "Virtual watchdog stopped");
        Ok(())
    }

    /// The configured timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Check whether the watchdog is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        match &self.supervision {
            Supervision::TickWalk(handle) => handle.is_some(),
            Supervision::Reschedule { running, .. } => *running,
        }
    }

    /// The diagnostic name, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The multiplexing strategy supervising this watchdog.
    #[must_use]
    pub fn mode(&self) -> MultiplexMode {
        self.context.mode()
    }

    /// Time accumulated since the last kick.
    ///
    /// Only tracked in tick-walk mode; `None` otherwise or when stopped.
    #[must_use]
    pub fn elapsed(&self) -> Option<Duration> {
        match &self.supervision {
            Supervision::TickWalk(Some(handle)) => {
                let handle = *handle;
                self.context
                    .registry()
                    .with(|registry| registry.elapsed(handle))
            }
            _ => None,
        }
    }

    /// The context this watchdog belongs to.
    #[must_use]
    pub fn context(&self) -> &WatchdogContext {
        &self.context
    }
}

impl Drop for VirtualWatchdog {
    fn drop(&mut self) {
        if self.is_running() && self.try_stop().is_err() {
            tracing::warn!(client = self.label(), "Failed to stop dropped virtual watchdog");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MultiplexerConfig;
    use vwdog_hardware_watchdog::RecordingReset;
    use vwdog_timer::SimClock;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn context(mode: MultiplexMode) -> Result<(SimClock, WatchdogContext), WatchdogError> {
        let clock = SimClock::new();
        let reset = Arc::new(RecordingReset::new(Arc::new(clock.clone())));
        let config = MultiplexerConfig::builder().mode(mode).build()?;
        let context = WatchdogContext::builder()
            .config(config)
            .timers(Arc::new(clock.clone()))
            .reset(reset)
            .build()?;
        Ok((clock, context))
    }

    #[test]
    fn test_lifecycle_tick_walk() -> TestResult {
        let (_clock, context) = context(MultiplexMode::TickWalk)?;
        let mut watchdog = VirtualWatchdog::try_new(&context, Duration::from_millis(50), None)?;

        assert!(!watchdog.is_running());
        watchdog.try_start()?;
        assert!(watchdog.is_running());
        assert_eq!(context.client_count(), 1);

        assert_eq!(watchdog.try_start(), Err(WatchdogError::AlreadyRunning));

        watchdog.try_stop()?;
        assert!(!watchdog.is_running());
        assert_eq!(context.client_count(), 0);
        assert_eq!(watchdog.try_kick(), Err(WatchdogError::NotRunning));
        assert_eq!(watchdog.try_stop(), Err(WatchdogError::NotRunning));
        Ok(())
    }

    #[test]
    fn test_lifecycle_reschedule() -> TestResult {
        let (_clock, context) = context(MultiplexMode::Reschedule)?;
        let mut watchdog = VirtualWatchdog::try_new(&context, Duration::from_millis(50), None)?;

        assert_eq!(watchdog.try_kick(), Err(WatchdogError::NotRunning));
        watchdog.try_start()?;
        assert_eq!(watchdog.try_start(), Err(WatchdogError::AlreadyRunning));
        watchdog.try_kick()?;
        watchdog.try_stop()?;
        assert_eq!(watchdog.try_stop(), Err(WatchdogError::NotRunning));
        assert_eq!(watchdog.elapsed(), None);
        Ok(())
    }

    #[test]
    fn test_zero_timeout_is_rejected() -> TestResult {
        let (_clock, context) = context(MultiplexMode::TickWalk)?;
        let result = VirtualWatchdog::try_new(&context, Duration::ZERO, None);
        assert!(matches!(result, Err(WatchdogError::InvalidTimeout(_))));
        Ok(())
    }

    #[test]
    fn test_elapsed_tracks_ticks() -> TestResult {
        let (clock, context) = context(MultiplexMode::TickWalk)?;
        let mut watchdog = VirtualWatchdog::try_new(&context, Duration::from_millis(50), None)?;
        assert_eq!(watchdog.elapsed(), None);

        watchdog.try_start()?;
        clock.advance(Duration::from_millis(7));
        assert_eq!(watchdog.elapsed(), Some(Duration::from_millis(7)));

        watchdog.try_kick()?;
        assert_eq!(watchdog.elapsed(), Some(Duration::ZERO));
        Ok(())
    }

    #[test]
    fn test_drop_unregisters() -> TestResult {
        let (_clock, context) = context(MultiplexMode::TickWalk)?;
        {
            let mut watchdog =
                VirtualWatchdog::try_new(&context, Duration::from_millis(50), Some("temp"))?;
            watchdog.try_start()?;
            assert_eq!(context.client_count(), 1);
        }
        assert_eq!(context.client_count(), 0);
        Ok(())
    }

    #[test]
    #[should_panic(expected = "Virtual watchdog is already running")]
    fn test_start_twice_is_fatal() {
        let Ok((_clock, context)) = context(MultiplexMode::TickWalk) else {
            return;
        };
        let mut watchdog = VirtualWatchdog::from_millis(&context, 50);
        watchdog.start();
        watchdog.start();
    }

    #[test]
    #[should_panic(expected = "Virtual watchdog is not running")]
    fn test_kick_stopped_is_fatal() {
        let Ok((_clock, context)) = context(MultiplexMode::Reschedule) else {
            return;
        };
        let watchdog = VirtualWatchdog::from_millis(&context, 50);
        watchdog.kick();
    }

    #[test]
    #[should_panic(expected = "Invalid timeout")]
    fn test_zero_timeout_is_fatal() {
        let Ok((_clock, context)) = context(MultiplexMode::TickWalk) else {
            return;
        };
        let _watchdog = VirtualWatchdog::from_millis(&context, 0);
    }
}
