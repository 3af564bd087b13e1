//! Prelude for vwdog-hardware-watchdog.
//!
//! This module re-exports the most commonly used types for convenient importing.

pub use crate::config::{WatchdogConfig, WatchdogConfigBuilder};
pub use crate::error::{HardwareWatchdogError, HardwareWatchdogResult};
pub use crate::reset::{AbortReset, RecordingReset, ResetCause, ResetEvent, SystemReset};
pub use crate::software_impl::SoftwareWatchdog;
pub use crate::state::{WatchdogMetrics, WatchdogStatus};
pub use crate::watchdog::HardwareWatchdog;
