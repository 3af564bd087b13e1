//! # vwdog-timer
//!
//! One-shot and periodic timer contracts for the `vwdog` watchdog multiplexer.
//!
//! The multiplexer never talks to timer hardware directly. It asks a
//! [`TimerFactory`] for timers and relies only on the contracts described in
//! [`timer`]. Two backends ship with the crate:
//!
//! - [`TimerService`] - a background thread with a deadline queue, used on
//!   hosts in place of a hardware timer interrupt
//! - [`SimClock`] - manually advanced simulated time for deterministic tests
//!
//! ## Override Semantics
//!
//! Re-attaching a timer replaces its pending callback, and the replaced
//! callback is guaranteed never to run. Detaching is effective on return.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicU32, Ordering};
//! use std::time::Duration;
//! use vwdog_timer::prelude::*;
//!
//! let clock = SimClock::new();
//! let timeout = clock.one_shot();
//! let fired = Arc::new(AtomicU32::new(0));
//!
//! let first = Arc::clone(&fired);
//! timeout.attach(Box::new(move || { first.fetch_add(1, Ordering::SeqCst); }), Duration::from_millis(10));
//! let second = Arc::clone(&fired);
//! timeout.attach(Box::new(move || { second.fetch_add(10, Ordering::SeqCst); }), Duration::from_millis(20));
//!
//! clock.advance(Duration::from_millis(50));
//! assert_eq!(fired.load(Ordering::SeqCst), 10);
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

pub mod clock;
pub mod error;
pub mod prelude;
pub mod service;
pub mod sim;
mod slot;
pub mod timer;

pub use clock::{Clock, MonotonicClock};
pub use error::{TimerError, TimerResult};
pub use service::TimerService;
pub use sim::SimClock;
pub use timer::{
    OneShotCallback, OneShotTimer, PeriodicCallback, PeriodicTimer, Ticker, Timeout, TimerFactory,
};
