//! Shared multiplexer context.
//!
//! A [`WatchdogContext`] owns everything the clients of one system share:
//! the configuration, the timer source, the reset sink, the hardware
//! watchdog and, in tick-walk mode, the registry and its periodic tick.
//! Clients hold a clone; the context lives as long as any of them.
//!
//! Shared hardware is brought up lazily, exactly once, when the first
//! client is created:
//!
//! ```text
//! VirtualWatchdog::new ──► ensure_initialized ──(first call only)──┐
//!                                                                  ▼
//!                            hardware.start(hardware_timeout), attach tick
//!
//! every tick_period:  registry.on_tick ──Healthy──► hardware.kick()
//!                                      └─Expired──► reset.system_reset(cause)
//! ```

use std::sync::{Arc, OnceLock};
use std::time::Duration;
use vwdog_hardware_watchdog::{AbortReset, HardwareWatchdog, SoftwareWatchdog, SystemReset};
use vwdog_timer::{PeriodicTimer, TimerFactory};

use crate::config::{MultiplexMode, MultiplexerConfig};
use crate::critical::CriticalSection;
use crate::error::{WatchdogError, WatchdogResult};
use crate::registry::{ClientStatus, TickOutcome, WatchdogRegistry};

struct ContextInner {
    config: MultiplexerConfig,
    timers: Arc<dyn TimerFactory>,
    reset: Arc<dyn SystemReset>,
    hardware: Option<Arc<dyn HardwareWatchdog>>,
    registry: Arc<CriticalSection<WatchdogRegistry>>,
    // Set on the first client creation; holds the tick in tick-walk mode.
    ticker: OnceLock<WatchdogResult<Option<Box<dyn PeriodicTimer>>>>,
}

impl ContextInner {
    fn initialize(&self) -> WatchdogResult<Option<Box<dyn PeriodicTimer>>> {
        if self.config.mode == MultiplexMode::Reschedule {
            tracing::info!(mode = %self.config.mode, "Virtual watchdog multiplexer ready");
            return Ok(None);
        }

        let expected = self.config.hardware_timeout;
        if let Some(hardware) = &self.hardware {
            if hardware.is_running() {
                let actual = hardware.timeout();
                if actual != Some(expected) {
                    return Err(WatchdogError::ConflictingHardware { expected, actual });
                }
                tracing::warn!(
                    timeout_ms = expected.as_millis(),
                    "Hardware watchdog already running, adopting it"
                );
            } else {
                hardware.start(expected)?;
            }
        } else {
            tracing::warn!("No hardware watchdog configured, ticks will not kick hardware");
        }

        let registry = Arc::clone(&self.registry);
        let hardware = self.hardware.clone();
        let reset = Arc::clone(&self.reset);
        let ticker = self.timers.periodic();
        ticker.attach_periodic(
            Box::new(move |period| on_tick(&registry, hardware.as_deref(), &*reset, period)),
            self.config.tick_period,
        )?;

        tracing::info!(
            mode = %self.config.mode,
            tick_us = self.config.tick_period.as_micros(),
            hardware_timeout_ms = expected.as_millis(),
            "Virtual watchdog multiplexer ready"
        );
        Ok(Some(ticker))
    }
}

/// Body of the shared periodic tick.
///
/// Escalation runs inside the registry's critical section, so a `stop()`
/// that returns before the tick took the lock always prevents the reset.
/// The reset sink must not call back into the registry.
fn on_tick(
    registry: &CriticalSection<WatchdogRegistry>,
    hardware: Option<&dyn HardwareWatchdog>,
    reset: &dyn SystemReset,
    period: Duration,
) {
    let healthy = registry.with(|registry| match registry.on_tick(period) {
        TickOutcome::Healthy => true,
        TickOutcome::Expired(cause) => {
            tracing::error!(cause = %cause, "Virtual watchdog expired, resetting system");
            reset.system_reset(cause);
            false
        }
        TickOutcome::Halted => false,
    });

    if healthy {
        tracing::trace!(period_us = period.as_micros(), "Tick walk complete");
        if let Some(Err(err)) = hardware.map(|hardware| hardware.kick()) {
            tracing::warn!(error = %err, "Failed to kick hardware watchdog");
        }
    }
}

/// Handle to the state shared by all virtual watchdogs of one system.
///
/// Cheap to clone. Build one per system with [`WatchdogContext::builder`].
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
/// let mut watchdog = VirtualWatchdog::from_millis(&context, 300);
/// watchdog.start();
/// clock.advance(Duration::from_millis(200));
/// watchdog.kick();
/// clock.advance(Duration::from_millis(200));
/// assert_eq!(reset.count(), 0);
/// ```
#[derive(Clone)]
pub struct WatchdogContext {
    inner: Arc<ContextInner>,
}

impl WatchdogContext {
    /// Create a context builder.
    #[must_use]
    pub fn builder() -> WatchdogContextBuilder {
        WatchdogContextBuilder::default()
    }

    /// Bring up the shared hardware if this is the first call.
    ///
    /// Later calls return the outcome of the first one.
    ///
    /// # Errors
    ///
    /// Returns [`WatchdogError::ConflictingHardware`] if the hardware
    /// watchdog already runs with a different timeout, or
    /// [`WatchdogError::HardwareInit`] if it cannot be started or the tick
    /// cannot be attached.
    pub fn ensure_initialized(&self) -> WatchdogResult<()> {
        self.inner
            .ticker
            .get_or_init(|| self.inner.initialize())
            .as_ref()
            .map(|_| ())
            .map_err(Clone::clone)
    }

    /// Check whether shared hardware has been brought up successfully.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        matches!(self.inner.ticker.get(), Some(Ok(_)))
    }

    /// The context configuration.
    #[must_use]
    pub fn config(&self) -> &MultiplexerConfig {
        &self.inner.config
    }

    /// The multiplexing strategy.
    #[must_use]
    pub fn mode(&self) -> MultiplexMode {
        self.inner.config.mode
    }

    /// The hardware watchdog, if the context has one.
    #[must_use]
    pub fn hardware(&self) -> Option<&Arc<dyn HardwareWatchdog>> {
        self.inner.hardware.as_ref()
    }

    /// Number of running tick-walk clients.
    #[must_use]
    pub fn client_count(&self) -> usize {
        self.inner.registry.with(|registry| registry.len())
    }

    /// Running tick-walk clients in walk order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<ClientStatus> {
        self.inner.registry.with(|registry| registry.snapshot())
    }

    /// Check whether a tick-walk client expired.
    #[must_use]
    pub fn is_escalated(&self) -> bool {
        self.inner.registry.with(|registry| registry.is_escalated())
    }

    pub(crate) fn registry(&self) -> &CriticalSection<WatchdogRegistry> {
        &self.inner.registry
    }

    pub(crate) fn timers(&self) -> &dyn TimerFactory {
        &*self.inner.timers
    }

    pub(crate) fn reset(&self) -> &Arc<dyn SystemReset> {
        &self.inner.reset
    }
}

impl std::fmt::Debug for WatchdogContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchdogContext")
            .field("config", &self.inner.config)
            .field("initialized", &self.is_initialized())
            .field("clients", &self.client_count())
            .finish_non_exhaustive()
    }
}

/// Builder for `WatchdogContext`.
#[derive(Default)]
pub struct WatchdogContextBuilder {
    config: MultiplexerConfig,
    timers: Option<Arc<dyn TimerFactory>>,
    reset: Option<Arc<dyn SystemReset>>,
    hardware: Option<Arc<dyn HardwareWatchdog>>,
}

impl WatchdogContextBuilder {
    /// Set the configuration.
    #[must_use]
    pub fn config(mut self, config: MultiplexerConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the timer source. Required.
    #[must_use]
    pub fn timers(mut self, timers: Arc<dyn TimerFactory>) -> Self {
        self.timers = Some(timers);
        self
    }

    /// Set the reset sink. Defaults to [`AbortReset`].
    #[must_use]
    pub fn reset(mut self, reset: Arc<dyn SystemReset>) -> Self {
        self.reset = Some(reset);
        self
    }

    /// Set the hardware watchdog.
    ///
    /// In tick-walk mode a [`SoftwareWatchdog`] on the context's timers is
    /// used when none is set.
    #[must_use]
    pub fn hardware(mut self, hardware: Arc<dyn HardwareWatchdog>) -> Self {
        self.hardware = Some(hardware);
        self
    }

    /// Build the context.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or no timer source
    /// was set.
    pub fn build(self) -> WatchdogResult<WatchdogContext> {
        self.config.validate()?;
        let timers = self
            .timers
            .ok_or_else(|| WatchdogError::invalid_configuration("a timer source is required"))?;
        let reset = self.reset.unwrap_or_else(|| Arc::new(AbortReset));

        let hardware = match (self.config.mode, self.hardware) {
            (MultiplexMode::Reschedule, Some(_)) => {
                tracing::warn!("Reschedule mode does not use the hardware watchdog, ignoring it");
                None
            }
            (MultiplexMode::Reschedule, None) => None,
            (MultiplexMode::TickWalk, Some(hardware)) => Some(hardware),
            (MultiplexMode::TickWalk, None) => {
                let software: Arc<dyn HardwareWatchdog> =
                    Arc::new(SoftwareWatchdog::new(&*timers, Arc::clone(&reset)));
                Some(software)
            }
        };

        Ok(WatchdogContext {
            inner: Arc::new(ContextInner {
                config: self.config,
                timers,
                reset,
                hardware,
                registry: Arc::new(CriticalSection::new(WatchdogRegistry::new())),
                ticker: OnceLock::new(),
            }),
        })
    }
}

impl std::fmt::Debug for WatchdogContextBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchdogContextBuilder")
            .field("config", &self.config)
            .field("timers", &self.timers.is_some())
            .field("reset", &self.reset.is_some())
            .field("hardware", &self.hardware.is_some())
            .finish()
    }
}
