//! Prelude for vwdog-timer.
//!
//! This module re-exports the most commonly used types for convenient importing.

pub use crate::clock::{Clock, MonotonicClock};
pub use crate::error::{TimerError, TimerResult};
pub use crate::service::TimerService;
pub use crate::sim::SimClock;
pub use crate::timer::{
    OneShotCallback, OneShotTimer, PeriodicCallback, PeriodicTimer, TimerFactory,
};
