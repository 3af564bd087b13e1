//! Shared fixtures for vwdog integration tests.

use std::sync::Arc;
use vwdog::prelude::*;
use vwdog_hardware_watchdog::RecordingReset;
use vwdog_timer::SimClock;

/// Route `tracing` output to the test harness.
pub fn init_tracing() {
    let _initialized = tracing_subscriber::fmt()
        .with_env_filter("vwdog=debug,vwdog_hardware_watchdog=debug")
        .with_test_writer()
        .try_init()
        .is_ok();
}

/// A context on simulated time with a recording reset sink.
pub struct SimHarness {
    pub clock: SimClock,
    pub reset: Arc<RecordingReset>,
    pub context: WatchdogContext,
}

impl SimHarness {
    pub fn new(mode: MultiplexMode) -> Result<Self, WatchdogError> {
        let config = MultiplexerConfig::builder().mode(mode).build()?;
        Self::with_config(config)
    }

    pub fn with_config(config: MultiplexerConfig) -> Result<Self, WatchdogError> {
        init_tracing();
        let clock = SimClock::new();
        let reset = Arc::new(RecordingReset::new(Arc::new(clock.clone())));
        let context = WatchdogContext::builder()
            .config(config)
            .timers(Arc::new(clock.clone()))
            .reset(reset.clone())
            .build()?;
        Ok(Self {
            clock,
            reset,
            context,
        })
    }
}
