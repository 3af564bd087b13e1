//! # vwdog
//!
//! Virtual watchdogs multiplexed onto a single hardware watchdog.
//!
//! Many independent subsystems each get a [`VirtualWatchdog`] with their own
//! timeout. A subsystem that stops kicking its watchdog resets the whole
//! system; a subsystem that behaves never blocks or starves the others.
//!
//! ## Safety Guarantees
//!
//! - **No unsafe code**
//! - **Expiry always escalates**: a missed deadline is never reported as an
//!   `Err`, it ends in [`SystemReset::system_reset`](vwdog_hardware_watchdog::SystemReset)
//! - **Misuse is fatal**: starting twice or kicking a stopped watchdog panics
//!   unless the `try_` forms are used
//! - **Bounded work**: start, kick and stop are O(1); a tick is O(running clients)
//!
//! ## Architecture
//!
//! - [`context`] - Shared configuration, timers, reset sink and hardware
//! - [`virtual_watchdog`] - Client handle
//! - [`registry`] - Running clients walked by the shared tick
//! - [`critical`] - Critical section guarding the registry
//! - [`config`] - Multiplexer configuration
//! - [`error`] - Error types
//!
//! ## Multiplexing Modes
//!
//! | Mode | Timers | Hardware watchdog | Expiry detected |
//! |------|--------|-------------------|-----------------|
//! | `TickWalk` | one periodic tick | kicked after every healthy walk | at most two ticks after the timeout |
//! | `Reschedule` | one one-shot per client | unused | exactly at the timeout |
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use vwdog::prelude::*;
//! use vwdog_hardware_watchdog::RecordingReset;
//! use vwdog_timer::SimClock;
//!
//! let clock = SimClock::new();
//! let reset = Arc::new(RecordingReset::new(Arc::new(clock.clone())));
//! let context = WatchdogContext::builder()
//!     .timers(Arc::new(clock.clone()))
//!     .reset(reset.clone())
//!     .build()
//!     .expect("valid context");
//!
//! let mut healthy = VirtualWatchdog::named(&context, Duration::from_millis(300), "healthy");
//! let mut stuck = VirtualWatchdog::named(&context, Duration::from_millis(100), "stuck");
//! healthy.start();
//! stuck.start();
//!
//! for _ in 0..5 {
//!     clock.advance(Duration::from_millis(50));
//!     healthy.kick();
//! }
//!
//! let event = reset.first().expect("stuck client escalated");
//! assert!(event.cause.to_string().contains("stuck"));
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
pub mod context;
pub mod critical;
pub mod error;
pub mod registry;
pub mod virtual_watchdog;

mod reschedule;

pub mod prelude;

pub use config::{MultiplexMode, MultiplexerConfig, MultiplexerConfigBuilder};
pub use context::{WatchdogContext, WatchdogContextBuilder};
pub use critical::CriticalSection;
pub use error::{WatchdogError, WatchdogResult};
pub use registry::{ClientHandle, ClientStatus, TickOutcome, WatchdogRegistry};
pub use virtual_watchdog::VirtualWatchdog;
