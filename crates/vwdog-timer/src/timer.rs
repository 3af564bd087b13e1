//! Timer contracts and the handle types shared by every timer backend.
//!
//! Both contracts follow the same override rule: attaching a callback
//! replaces whatever was pending, and the replaced callback never runs.
//!
//! ```text
//! attach(a, 20ms) ──► pending(a) ──attach(b, 20ms)──► pending(b) ──20ms──► b()
//!                          │                               │
//!                       detach()                        detach()
//!                          ▼                               ▼
//!                        idle                            idle
//! ```

use std::sync::Arc;
use std::time::Duration;

use crate::error::{TimerError, TimerResult};
use crate::slot::{Callback, Scheduler, TimerSlot};

/// Callback fired once by a [`OneShotTimer`].
pub type OneShotCallback = Box<dyn FnOnce() + Send + 'static>;

/// Callback fired on every period of a [`PeriodicTimer`].
///
/// The argument is the nominal time elapsed since the previous firing.
pub type PeriodicCallback = Box<dyn FnMut(Duration) + Send + 'static>;

/// A timer that fires a single callback after a delay.
///
/// # Contract
///
/// - `attach` replaces any pending callback; the replaced one never runs,
///   even if it was due sooner.
/// - `detach` cancels the pending callback and is a no-op when nothing is
///   pending. Once it returns, no callback of this timer is running or will
///   run, unless `detach` was called from inside that callback.
/// - A zero delay fires as soon as the scheduling context allows.
/// - Independent timers never influence each other.
pub trait OneShotTimer: Send + Sync {
    /// Schedule `callback` to run once after `delay`.
    fn attach(&self, callback: OneShotCallback, delay: Duration);

    /// Cancel the pending callback, if any.
    fn detach(&self);

    /// Check whether a callback is waiting to fire.
    fn is_pending(&self) -> bool;
}

/// A timer that fires a callback repeatedly with a fixed period.
///
/// Deadlines are absolute (`previous deadline + period`), so a periodic
/// timer does not drift when callbacks take time to run.
pub trait PeriodicTimer: Send + Sync {
    /// Start calling `callback` every `period`, replacing any pending callback.
    ///
    /// # Errors
    ///
    /// Returns [`TimerError::ZeroPeriod`] if `period` is zero.
    fn attach_periodic(&self, callback: PeriodicCallback, period: Duration) -> TimerResult<()>;

    /// Stop the periodic callback, if any.
    fn detach(&self);

    /// Check whether a callback is attached.
    fn is_pending(&self) -> bool;
}

/// Source of timers sharing one scheduling context.
pub trait TimerFactory: Send + Sync {
    /// Create an idle one-shot timer.
    fn one_shot(&self) -> Box<dyn OneShotTimer>;

    /// Create an idle periodic timer.
    fn periodic(&self) -> Box<dyn PeriodicTimer>;
}

/// Backend-independent part of a timer: its slot plus the queue it feeds.
pub(crate) struct TimerHandle {
    slot: Arc<TimerSlot>,
    scheduler: Arc<dyn Scheduler>,
}

impl TimerHandle {
    pub(crate) fn new(scheduler: Arc<dyn Scheduler>) -> Self {
        Self {
            slot: TimerSlot::new(),
            scheduler,
        }
    }

    fn arm(&self, callback: Callback, delay: Duration) {
        let generation = self.slot.arm(callback);
        self.scheduler
            .schedule(Arc::downgrade(&self.slot), generation, delay);
    }

    fn disarm(&self) {
        self.slot.disarm();
    }

    fn is_pending(&self) -> bool {
        self.slot.is_pending()
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.slot.disarm();
    }
}

/// One-shot timer handed out by a [`TimerFactory`].
pub struct Timeout {
    handle: TimerHandle,
}

impl Timeout {
    pub(crate) fn new(scheduler: Arc<dyn Scheduler>) -> Self {
        Self {
            handle: TimerHandle::new(scheduler),
        }
    }
}

impl OneShotTimer for Timeout {
    fn attach(&self, callback: OneShotCallback, delay: Duration) {
        self.handle.arm(Callback::Once(callback), delay);
    }

    fn detach(&self) {
        self.handle.disarm();
    }

    fn is_pending(&self) -> bool {
        self.handle.is_pending()
    }
}

impl std::fmt::Debug for Timeout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Timeout")
            .field("pending", &self.handle.is_pending())
            .finish()
    }
}

/// Periodic timer handed out by a [`TimerFactory`].
pub struct Ticker {
    handle: TimerHandle,
}

impl Ticker {
    pub(crate) fn new(scheduler: Arc<dyn Scheduler>) -> Self {
        Self {
            handle: TimerHandle::new(scheduler),
        }
    }
}

impl PeriodicTimer for Ticker {
    fn attach_periodic(&self, callback: PeriodicCallback, period: Duration) -> TimerResult<()> {
        if period.is_zero() {
            return Err(TimerError::ZeroPeriod);
        }
        self.handle
            .arm(Callback::Periodic { callback, period }, period);
        Ok(())
    }

    fn detach(&self) {
        self.handle.disarm();
    }

    fn is_pending(&self) -> bool {
        self.handle.is_pending()
    }
}

impl std::fmt::Debug for Ticker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ticker")
            .field("pending", &self.handle.is_pending())
            .finish()
    }
}
