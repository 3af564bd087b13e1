//! # vwdog-hardware-watchdog
//!
//! The single system watchdog peripheral and the reset it escalates to.
//!
//! This crate provides:
//! - `HardwareWatchdog` trait for the peripheral contract
//! - `SoftwareWatchdog` for hosts and tests, driven by a `vwdog-timer` backend
//! - `SystemReset` escalation sink with abort and recording implementations
//! - State machine with atomic transitions
//!
//! ## Safety Guarantees
//!
//! - **No unsafe code**
//! - **Atomic state transitions** for thread safety
//! - **Expiry is terminal**: an expired watchdog cannot be kicked or restarted
//!
//! ## State Machine
//!
//! ```text
//! ┌─────────┐   start()   ┌─────────┐  no kick   ┌─────────┐
//! │ Stopped │────────────►│ Running │───────────►│ Expired │──► system_reset()
//! └─────────┘             └─────────┘            └─────────┘
//!      ▲                    │     ▲
//!      └──────stop()────────┘     └─kick()
//! ```
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use vwdog_hardware_watchdog::prelude::*;
//! use vwdog_timer::SimClock;
//!
//! let clock = SimClock::new();
//! let reset = Arc::new(RecordingReset::new(Arc::new(clock.clone())));
//! let watchdog = SoftwareWatchdog::new(&clock, reset.clone());
//!
//! watchdog.start(Duration::from_millis(100)).expect("Failed to start");
//! watchdog.kick().expect("Failed to kick");
//! assert!(watchdog.is_running());
//!
//! clock.advance(Duration::from_millis(100));
//! assert_eq!(reset.count(), 1);
//! ```

#![deny(
    unsafe_op_in_unsafe_fn,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::panic,
    missing_docs,
    missing_debug_implementations
)]
#![warn(clippy::pedantic)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod config;
pub mod error;
pub mod prelude;
pub mod reset;
pub mod software_impl;
pub mod state;
pub mod watchdog;

pub use config::{WatchdogConfig, WatchdogConfigBuilder};
pub use error::{HardwareWatchdogError, HardwareWatchdogResult};
pub use reset::{AbortReset, RecordingReset, ResetCause, ResetEvent, SystemReset};
pub use software_impl::SoftwareWatchdog;
pub use state::{WatchdogMetrics, WatchdogState, WatchdogStatus};
pub use watchdog::HardwareWatchdog;
