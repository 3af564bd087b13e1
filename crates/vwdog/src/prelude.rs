//! Prelude for vwdog.
//!
//! This module re-exports the most commonly used types for convenient importing.
//!
//! # Example
//!
//! ```rust
//! use vwdog::prelude::*;
//! ```

pub use crate::config::{MultiplexMode, MultiplexerConfig, MultiplexerConfigBuilder};
pub use crate::context::{WatchdogContext, WatchdogContextBuilder};
pub use crate::error::{WatchdogError, WatchdogResult};
pub use crate::registry::ClientStatus;
pub use crate::virtual_watchdog::VirtualWatchdog;
