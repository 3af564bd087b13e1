//! Thread-backed timer service.
//!
//! One background thread owns a deadline queue and runs due callbacks in
//! deadline order. It stands in for the hardware timer interrupt on hosts:
//! callbacks run on the service thread, never on the thread that armed them.

use parking_lot::{Condvar, Mutex, MutexGuard};
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::clock::{Clock, MonotonicClock};
use crate::error::{TimerError, TimerResult};
use crate::slot::{COMPACT_THRESHOLD, QueueEntry, Scheduler, TimerSlot};
use crate::timer::{OneShotTimer, PeriodicTimer, Ticker, Timeout, TimerFactory};

struct Queue {
    entries: BinaryHeap<Reverse<QueueEntry<Instant>>>,
    next_seq: u64,
    compact_at: usize,
    shutdown: bool,
}

struct ServiceShared {
    queue: Mutex<Queue>,
    wakeup: Condvar,
    clock: MonotonicClock,
}

impl ServiceShared {
    fn push(&self, deadline: Instant, slot: Weak<TimerSlot>, generation: u64) {
        let mut queue = self.queue.lock();
        if queue.shutdown {
            tracing::warn!("Timer armed after the timer service stopped; it will never fire");
            return;
        }
        if queue.entries.len() >= queue.compact_at {
            queue.entries.retain(|Reverse(entry)| entry.is_live());
            queue.compact_at = COMPACT_THRESHOLD.max(queue.entries.len().saturating_mul(2));
        }
        let seq = queue.next_seq;
        queue.next_seq = seq.wrapping_add(1);
        queue.entries.push(Reverse(QueueEntry {
            deadline,
            seq,
            slot,
            generation,
        }));
        self.wakeup.notify_one();
    }

    fn dispatch(&self, entry: QueueEntry<Instant>) {
        let Some(slot) = entry.slot.upgrade() else {
            return;
        };
        let Some(period) = slot.fire(entry.generation) else {
            return;
        };
        let now = Instant::now();
        let next = entry
            .deadline
            .checked_add(period)
            .map_or(now, |next| next.max(now));
        if next == now {
            tracing::trace!(period_us = period.as_micros(), "Periodic timer fell behind");
        }
        self.push(next, entry.slot, entry.generation);
    }

    fn run(&self) {
        let mut queue = self.queue.lock();
        loop {
            if queue.shutdown {
                break;
            }
            let next_deadline = queue.entries.peek().map(|Reverse(entry)| entry.deadline);
            match next_deadline {
                Some(deadline) if deadline <= Instant::now() => {
                    if let Some(Reverse(entry)) = queue.entries.pop() {
                        MutexGuard::unlocked(&mut queue, || self.dispatch(entry));
                    }
                }
                Some(deadline) => {
                    let _woken = self.wakeup.wait_until(&mut queue, deadline);
                }
                None => self.wakeup.wait(&mut queue),
            }
        }
        tracing::debug!(
            dropped = queue.entries.len(),
            "Timer service stopped"
        );
    }
}

impl Scheduler for ServiceShared {
    fn schedule(&self, slot: Weak<TimerSlot>, generation: u64, delay: Duration) {
        match Instant::now().checked_add(delay) {
            Some(deadline) => self.push(deadline, slot, generation),
            None => tracing::warn!(
                delay_ms = delay.as_millis(),
                "Timer delay exceeds the clock range; it will never fire"
            ),
        }
    }
}

/// Background-thread timer service.
///
/// Implements [`TimerFactory`]: every timer it hands out is driven by the
/// same service thread. Dropping the service stops the thread; timers armed
/// afterwards never fire.
///
/// # Example
///
/// ```rust
/// use std::sync::mpsc;
/// use std::time::Duration;
/// use vwdog_timer::prelude::*;
///
/// let service = TimerService::new().expect("timer service");
/// let timeout = service.one_shot();
/// let (tx, rx) = mpsc::channel();
/// timeout.attach(Box::new(move || { let _ = tx.send(()); }), Duration::from_millis(5));
/// assert!(rx.recv_timeout(Duration::from_secs(1)).is_ok());
/// ```
pub struct TimerService {
    shared: Arc<ServiceShared>,
    worker: Option<JoinHandle<()>>,
}

impl TimerService {
    /// Start a timer service thread.
    ///
    /// # Errors
    ///
    /// Returns [`TimerError::SpawnFailed`] if the thread cannot be spawned.
    pub fn new() -> TimerResult<Self> {
        let shared = Arc::new(ServiceShared {
            queue: Mutex::new(Queue {
                entries: BinaryHeap::new(),
                next_seq: 0,
                compact_at: COMPACT_THRESHOLD,
                shutdown: false,
            }),
            wakeup: Condvar::new(),
            clock: MonotonicClock::new(),
        });

        let worker_shared = Arc::clone(&shared);
        let worker = thread::Builder::new()
            .name("vwdog-timer".to_string())
            .spawn(move || worker_shared.run())
            .map_err(|err| TimerError::spawn_failed(err.to_string()))?;

        tracing::debug!("Timer service started");
        Ok(Self {
            shared,
            worker: Some(worker),
        })
    }

    /// Number of queued deadlines, including ones already cancelled.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.shared.queue.lock().entries.len()
    }
}

impl TimerFactory for TimerService {
    fn one_shot(&self) -> Box<dyn OneShotTimer> {
        let scheduler: Arc<dyn Scheduler> = self.shared.clone();
        Box::new(Timeout::new(scheduler))
    }

    fn periodic(&self) -> Box<dyn PeriodicTimer> {
        let scheduler: Arc<dyn Scheduler> = self.shared.clone();
        Box::new(Ticker::new(scheduler))
    }
}

impl Clock for TimerService {
    fn now(&self) -> Duration {
        self.shared.clock.now()
    }
}

impl Drop for TimerService {
    fn drop(&mut self) {
        {
            let mut queue = self.shared.queue.lock();
            queue.shutdown = true;
        }
        self.shared.wakeup.notify_all();

        if let Some(worker) = self.worker.take() {
            // A callback may drop the last handle to the service.
            if worker.thread().id() == thread::current().id() {
                return;
            }
            if worker.join().is_err() {
                tracing::warn!("Timer service thread panicked");
            }
        }
    }
}

impl std::fmt::Debug for TimerService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerService")
            .field("queued", &self.queued())
            .finish()
    }
}
