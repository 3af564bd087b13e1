//! Multiplexer configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{WatchdogError, WatchdogResult};

/// How virtual watchdogs are mapped onto the hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MultiplexMode {
    /// One periodic tick walks every running client and kicks the hardware
    /// watchdog when all of them are within their timeout.
    #[default]
    TickWalk,
    /// Every client owns a one-shot timer that is re-armed on each kick.
    /// The hardware watchdog is not used.
    Reschedule,
}

impl MultiplexMode {
    /// Get the mode as a string slice.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TickWalk => "tick-walk",
            Self::Reschedule => "reschedule",
        }
    }
}

impl std::fmt::Display for MultiplexMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration of a [`WatchdogContext`](crate::WatchdogContext).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiplexerConfig {
    /// Multiplexing strategy.
    pub mode: MultiplexMode,
    /// Period of the shared tick (tick-walk only).
    pub tick_period: Duration,
    /// Timeout the hardware watchdog is started with (tick-walk only).
    pub hardware_timeout: Duration,
}

impl Default for MultiplexerConfig {
    fn default() -> Self {
        Self {
            mode: MultiplexMode::TickWalk,
            tick_period: Duration::from_millis(1),
            hardware_timeout: Duration::from_millis(1000),
        }
    }
}

impl MultiplexerConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> WatchdogResult<()> {
        if self.mode == MultiplexMode::Reschedule {
            return Ok(());
        }
        if self.tick_period.is_zero() {
            return Err(WatchdogError::invalid_configuration(
                "tick_period must be greater than 0",
            ));
        }
        if self.hardware_timeout <= self.tick_period {
            return Err(WatchdogError::invalid_configuration(
                "hardware_timeout must be greater than tick_period",
            ));
        }
        Ok(())
    }

    /// Create a configuration builder.
    #[must_use]
    pub fn builder() -> MultiplexerConfigBuilder {
        MultiplexerConfigBuilder::default()
    }
}

/// Builder for `MultiplexerConfig`.
#[derive(Debug, Default)]
pub struct MultiplexerConfigBuilder {
    config: MultiplexerConfig,
}

impl MultiplexerConfigBuilder {
    /// Set the multiplexing strategy.
    #[must_use]
    pub fn mode(mut self, mode: MultiplexMode) -> Self {
        self.config.mode = mode;
        self
    }

    /// Set the shared tick period.
    #[must_use]
    pub fn tick_period(mut self, period: Duration) -> Self {
        self.config.tick_period = period;
        self
    }

    /// Set the hardware watchdog timeout.
    #[must_use]
    pub fn hardware_timeout(mut self, timeout: Duration) -> Self {
        self.config.hardware_timeout = timeout;
        self
    }

    /// Build the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> WatchdogResult<MultiplexerConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
