//! Deterministic simulated time.
//!
//! [`SimClock`] never moves on its own. Tests move it with
//! [`SimClock::advance`], which fires every due timer in deadline order on
//! the calling thread, stepping `now()` to each deadline before its callback
//! runs. This makes timing scenarios exact and independent of host load.

use parking_lot::Mutex;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use crate::clock::Clock;
use crate::slot::{COMPACT_THRESHOLD, QueueEntry, Scheduler, TimerSlot};
use crate::timer::{OneShotTimer, PeriodicTimer, Ticker, Timeout, TimerFactory};

struct SimState {
    now: Duration,
    entries: BinaryHeap<Reverse<QueueEntry<Duration>>>,
    next_seq: u64,
    compact_at: usize,
}

struct SimShared {
    state: Mutex<SimState>,
}

impl SimShared {
    fn push(&self, deadline: Duration, slot: Weak<TimerSlot>, generation: u64) {
        let mut state = self.state.lock();
        if state.entries.len() >= state.compact_at {
            state.entries.retain(|Reverse(entry)| entry.is_live());
            state.compact_at = COMPACT_THRESHOLD.max(state.entries.len().saturating_mul(2));
        }
        let seq = state.next_seq;
        state.next_seq = seq.wrapping_add(1);
        state.entries.push(Reverse(QueueEntry {
            deadline,
            seq,
            slot,
            generation,
        }));
    }

    fn pop_due(&self, target: Duration) -> Option<QueueEntry<Duration>> {
        let mut state = self.state.lock();
        let due = state
            .entries
            .peek()
            .is_some_and(|Reverse(entry)| entry.deadline <= target);
        if !due {
            state.now = state.now.max(target);
            return None;
        }
        let Reverse(entry) = state.entries.pop()?;
        state.now = state.now.max(entry.deadline);
        Some(entry)
    }
}

impl Scheduler for SimShared {
    fn schedule(&self, slot: Weak<TimerSlot>, generation: u64, delay: Duration) {
        let deadline = self.state.lock().now.saturating_add(delay);
        self.push(deadline, slot, generation);
    }
}

/// Manually driven clock and timer factory.
///
/// Cloning a `SimClock` yields another handle to the same simulated time.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use std::time::Duration;
/// use vwdog_timer::prelude::*;
///
/// let clock = SimClock::new();
/// let timeout = clock.one_shot();
/// let fired = Arc::new(AtomicBool::new(false));
/// let flag = Arc::clone(&fired);
/// timeout.attach(Box::new(move || flag.store(true, Ordering::SeqCst)), Duration::from_millis(10));
///
/// clock.advance(Duration::from_millis(9));
/// assert!(!fired.load(Ordering::SeqCst));
/// clock.advance(Duration::from_millis(1));
/// assert!(fired.load(Ordering::SeqCst));
/// ```
#[derive(Clone)]
pub struct SimClock {
    shared: Arc<SimShared>,
}

impl SimClock {
    /// Create a simulated clock at time zero.
    #[must_use]
    pub fn new() -> Self {
        Self {
            shared: Arc::new(SimShared {
                state: Mutex::new(SimState {
                    now: Duration::ZERO,
                    entries: BinaryHeap::new(),
                    next_seq: 0,
                    compact_at: COMPACT_THRESHOLD,
                }),
            }),
        }
    }

    /// Move time forward by `by`, firing every timer that comes due.
    ///
    /// A callback that keeps re-arming itself with a zero delay makes this
    /// loop forever.
    pub fn advance(&self, by: Duration) {
        let target = self.now().saturating_add(by);
        self.advance_to(target);
    }

    /// Move time forward to `target`, firing every timer that comes due.
    ///
    /// Does nothing to `now()` if `target` is in the past, but still fires
    /// timers that are already due.
    pub fn advance_to(&self, target: Duration) {
        while let Some(entry) = self.shared.pop_due(target) {
            let Some(slot) = entry.slot.upgrade() else {
                continue;
            };
            if let Some(period) = slot.fire(entry.generation) {
                self.shared.push(
                    entry.deadline.saturating_add(period),
                    entry.slot,
                    entry.generation,
                );
            }
        }
    }

    /// Fire timers that are due right now, e.g. ones armed with zero delay.
    pub fn run_pending(&self) {
        self.advance(Duration::ZERO);
    }

    /// Move time forward in `step` increments until `until` has elapsed or
    /// `stop` returns true, checking `stop` after every step.
    ///
    /// Returns the simulated time at which `stop` first returned true.
    pub fn run_until(
        &self,
        until: Duration,
        step: Duration,
        mut stop: impl FnMut() -> bool,
    ) -> Option<Duration> {
        let end = self.now().saturating_add(until);
        let step = step.max(Duration::from_nanos(1));
        while self.now() < end {
            let next = self.now().saturating_add(step).min(end);
            self.advance_to(next);
            if stop() {
                return Some(self.now());
            }
        }
        None
    }

    /// Number of queued deadlines, including ones already cancelled.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.shared.state.lock().entries.len()
    }
}

impl Default for SimClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SimClock {
    fn now(&self) -> Duration {
        self.shared.state.lock().now
    }
}

impl TimerFactory for SimClock {
    fn one_shot(&self) -> Box<dyn OneShotTimer> {
        let scheduler: Arc<dyn Scheduler> = self.shared.clone();
        Box::new(Timeout::new(scheduler))
    }

    fn periodic(&self) -> Box<dyn PeriodicTimer> {
        let scheduler: Arc<dyn Scheduler> = self.shared.clone();
        Box::new(Ticker::new(scheduler))
    }
}

impl std::fmt::Debug for SimClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("SimClock")
            .field("now", &state.now)
            .field("queued", &state.entries.len())
            .finish()
    }
}
