//! Per-timer arming state and the deadline queue entry shared by backends.
//!
//! A slot holds at most one pending callback tagged with a generation.
//! Every arm or disarm bumps the generation, so queue entries carrying an
//! older generation are discarded when they come due.

use parking_lot::Mutex;
use std::cmp::Ordering;
use std::sync::{Arc, Weak};
use std::thread::{self, ThreadId};
use std::time::Duration;

use crate::timer::{OneShotCallback, PeriodicCallback};

/// Queue length at which stale entries are first purged.
pub(crate) const COMPACT_THRESHOLD: usize = 256;

pub(crate) enum Callback {
    Once(OneShotCallback),
    Periodic {
        callback: PeriodicCallback,
        period: Duration,
    },
}

/// Queue side of a timer backend.
pub(crate) trait Scheduler: Send + Sync {
    /// Queue a firing of `slot` under `generation`, `delay` from now.
    fn schedule(&self, slot: Weak<TimerSlot>, generation: u64, delay: Duration);
}

struct SlotState {
    generation: u64,
    callback: Option<Callback>,
    firing_on: Option<ThreadId>,
}

pub(crate) struct TimerSlot {
    state: Mutex<SlotState>,
    // Held for the whole duration of a callback run.
    firing: Mutex<()>,
}

impl TimerSlot {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(SlotState {
                generation: 0,
                callback: None,
                firing_on: None,
            }),
            firing: Mutex::new(()),
        })
    }

    /// Install `callback`, invalidating whatever was pending.
    pub(crate) fn arm(&self, callback: Callback) -> u64 {
        let mut state = self.state.lock();
        state.generation = state.generation.wrapping_add(1);
        state.callback = Some(callback);
        state.generation
    }

    /// Drop the pending callback and wait out a callback that is running on
    /// another thread.
    pub(crate) fn disarm(&self) {
        let in_flight_elsewhere = {
            let mut state = self.state.lock();
            state.generation = state.generation.wrapping_add(1);
            state.callback = None;
            state
                .firing_on
                .is_some_and(|id| id != thread::current().id())
        };
        if in_flight_elsewhere {
            drop(self.firing.lock());
        }
    }

    pub(crate) fn is_pending(&self) -> bool {
        self.state.lock().callback.is_some()
    }

    pub(crate) fn is_current(&self, generation: u64) -> bool {
        let state = self.state.lock();
        state.generation == generation && state.callback.is_some()
    }

    /// Run the callback armed under `generation`.
    ///
    /// Returns the period when a periodic callback must be queued again.
    pub(crate) fn fire(&self, generation: u64) -> Option<Duration> {
        let _running = self.firing.lock();
        let callback = {
            let mut state = self.state.lock();
            if state.generation != generation {
                return None;
            }
            let callback = state.callback.take()?;
            state.firing_on = Some(thread::current().id());
            callback
        };

        let periodic = match callback {
            Callback::Once(callback) => {
                callback();
                None
            }
            Callback::Periodic {
                mut callback,
                period,
            } => {
                callback(period);
                Some((callback, period))
            }
        };

        let mut state = self.state.lock();
        state.firing_on = None;
        match periodic {
            Some((callback, period))
                if state.generation == generation && state.callback.is_none() =>
            {
                state.callback = Some(Callback::Periodic { callback, period });
                Some(period)
            }
            _ => None,
        }
    }
}

/// Deadline queue entry, ordered by deadline then insertion order.
pub(crate) struct QueueEntry<T> {
    pub(crate) deadline: T,
    pub(crate) seq: u64,
    pub(crate) slot: Weak<TimerSlot>,
    pub(crate) generation: u64,
}

impl<T: Ord> QueueEntry<T> {
    pub(crate) fn is_live(&self) -> bool {
        self.slot
            .upgrade()
            .is_some_and(|slot| slot.is_current(self.generation))
    }
}

impl<T: Ord> PartialEq for QueueEntry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T: Ord> Eq for QueueEntry<T> {}

impl<T: Ord> PartialOrd for QueueEntry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: Ord> Ord for QueueEntry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.deadline
            .cmp(&other.deadline)
            .then(self.seq.cmp(&other.seq))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering as AtomicOrdering};

    fn counting_callback(counter: &Arc<AtomicU32>) -> Callback {
        let counter = Arc::clone(counter);
        Callback::Once(Box::new(move || {
            counter.fetch_add(1, AtomicOrdering::SeqCst);
        }))
    }

    #[test]
    fn test_stale_generation_never_fires() {
        let counter = Arc::new(AtomicU32::new(0));
        let slot = TimerSlot::new();

        let first = slot.arm(counting_callback(&counter));
        let second = slot.arm(counting_callback(&counter));

        assert_eq!(slot.fire(first), None);
        assert_eq!(counter.load(AtomicOrdering::SeqCst), 0);

        assert_eq!(slot.fire(second), None);
        assert_eq!(counter.load(AtomicOrdering::SeqCst), 1);
        assert!(!slot.is_pending());
    }

    #[test]
    fn test_disarm_clears_pending() {
        let counter = Arc::new(AtomicU32::new(0));
        let slot = TimerSlot::new();

        let generation = slot.arm(counting_callback(&counter));
        slot.disarm();

        assert!(!slot.is_pending());
        assert_eq!(slot.fire(generation), None);
        assert_eq!(counter.load(AtomicOrdering::SeqCst), 0);
    }

    #[test]
    fn test_periodic_callback_is_reinstalled() {
        let counter = Arc::new(AtomicU32::new(0));
        let slot = TimerSlot::new();
        let inner = Arc::clone(&counter);
        let generation = slot.arm(Callback::Periodic {
            callback: Box::new(move |_| {
                inner.fetch_add(1, AtomicOrdering::SeqCst);
            }),
            period: Duration::from_millis(5),
        });

        assert_eq!(slot.fire(generation), Some(Duration::from_millis(5)));
        assert_eq!(slot.fire(generation), Some(Duration::from_millis(5)));
        assert_eq!(counter.load(AtomicOrdering::SeqCst), 2);
        assert!(slot.is_current(generation));
    }

    #[test]
    fn test_queue_entry_ordering() {
        let slot = TimerSlot::new();
        let early = QueueEntry {
            deadline: 10u64,
            seq: 2,
            slot: Arc::downgrade(&slot),
            generation: 0,
        };
        let late = QueueEntry {
            deadline: 20u64,
            seq: 1,
            slot: Arc::downgrade(&slot),
            generation: 0,
        };
        assert!(early < late);
    }
}
