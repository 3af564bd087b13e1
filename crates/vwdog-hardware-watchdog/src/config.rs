//! Configuration types for the hardware watchdog peripheral.

use std::time::Duration;

use crate::error::{HardwareWatchdogError, HardwareWatchdogResult};

/// Capabilities of a watchdog peripheral.
///
/// Real peripherals derive their timeout from a prescaled counter, which
/// bounds the timeouts they can be started with. `start()` rejects timeouts
/// outside `min_timeout_ms..=max_timeout_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchdogConfig {
    /// Smallest supported timeout in milliseconds.
    ///
    /// Default: 1ms.
    pub min_timeout_ms: u32,

    /// Largest supported timeout in milliseconds.
    ///
    /// Default: 32 000ms.
    pub max_timeout_ms: u32,
}

impl WatchdogConfig {
    /// Create a configuration with the given timeout bounds.
    ///
    /// # Errors
    ///
    /// Returns an error if the bounds are invalid.
    pub fn new(min_timeout_ms: u32, max_timeout_ms: u32) -> HardwareWatchdogResult<Self> {
        let config = Self {
            min_timeout_ms,
            max_timeout_ms,
        };
        config.validate()?;
        Ok(config)
    }

    /// Create a configuration builder.
    #[must_use]
    pub fn builder() -> WatchdogConfigBuilder {
        WatchdogConfigBuilder::default()
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> HardwareWatchdogResult<()> {
        if self.min_timeout_ms == 0 {
            return Err(HardwareWatchdogError::invalid_configuration(
                "min_timeout_ms must be greater than 0",
            ));
        }
        if self.min_timeout_ms > self.max_timeout_ms {
            return Err(HardwareWatchdogError::invalid_configuration(
                "min_timeout_ms must not exceed max_timeout_ms",
            ));
        }
        Ok(())
    }

    /// Check that the peripheral can be started with `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareWatchdogError::InvalidTimeout`] if `timeout` is out
    /// of range. Sub-millisecond remainders are ignored.
    pub fn check_timeout(&self, timeout: Duration) -> HardwareWatchdogResult<()> {
        let requested_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        let range = u64::from(self.min_timeout_ms)..=u64::from(self.max_timeout_ms);
        if range.contains(&requested_ms) {
            Ok(())
        } else {
            Err(HardwareWatchdogError::InvalidTimeout {
                requested_ms,
                min_ms: self.min_timeout_ms,
                max_ms: self.max_timeout_ms,
            })
        }
    }
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            min_timeout_ms: 1,
            max_timeout_ms: 32_000,
        }
    }
}

/// Builder for `WatchdogConfig`.
#[derive(Debug, Default)]
pub struct WatchdogConfigBuilder {
    config: WatchdogConfig,
}

impl WatchdogConfigBuilder {
    /// Set the smallest supported timeout in milliseconds.
    #[must_use]
    pub fn min_timeout_ms(mut self, ms: u32) -> Self {
        self.config.min_timeout_ms = ms;
        self
    }

    /// Set the largest supported timeout in milliseconds.
    #[must_use]
    pub fn max_timeout_ms(mut self, ms: u32) -> Self {
        self.config.max_timeout_ms = ms;
        self
    }

    /// Build the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> HardwareWatchdogResult<WatchdogConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = WatchdogConfig::default();
        assert_eq!(config.min_timeout_ms, 1);
        assert_eq!(config.max_timeout_ms, 32_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        assert!(WatchdogConfig::new(0, 100).is_err());
        assert!(WatchdogConfig::new(200, 100).is_err());
        assert!(WatchdogConfig::new(10, 100).is_ok());
    }

    #[test]
    fn test_config_builder() {
        let result = WatchdogConfig::builder()
            .min_timeout_ms(5)
            .max_timeout_ms(8_000)
            .build();
        assert!(result.is_ok());
        if let Ok(config) = result {
            assert_eq!(config.min_timeout_ms, 5);
            assert_eq!(config.max_timeout_ms, 8_000);
        }
    }

    #[test]
    fn test_check_timeout() {
        let config = WatchdogConfig::default();
        assert!(config.check_timeout(Duration::from_millis(100)).is_ok());
        assert!(config.check_timeout(Duration::from_micros(500)).is_err());
        assert!(matches!(
            config.check_timeout(Duration::from_secs(60)),
            Err(HardwareWatchdogError::InvalidTimeout {
                requested_ms: 60_000,
                ..
            })
        ));
    }
}
