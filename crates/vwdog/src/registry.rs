//! Registry of running tick-walk clients.
//!
//! Clients live in an arena addressed by [`ClientHandle`]s. Occupied slots
//! are threaded into a doubly linked list by index, giving O(1) insertion at
//! the tail, O(1) removal from any position and one ordered walk per tick.
//!
//! ```text
//!  head                                   tail
//!   │                                      │
//!   ▼                                      ▼
//! ┌─────┐ next ┌─────┐ next ┌─────┐ next ┌─────┐
//! │ s0  │─────►│ s3  │─────►│ s1  │─────►│ s4  │
//! └─────┘◄─────└─────┘◄─────└─────┘◄─────└─────┘
//!          prev         prev         prev
//! ```
//!
//! Vacated slots are reused, but their generation is bumped first, so a
//! handle to a removed client never matches a later occupant.

use std::sync::Arc;
use std::time::Duration;
use vwdog_hardware_watchdog::ResetCause;

/// Stable identity of a registered client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientHandle {
    index: usize,
    generation: u64,
}

/// Diagnostic view of one registered client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientStatus {
    /// Client name, if it has one.
    pub name: Option<Arc<str>>,
    /// Configured timeout.
    pub timeout: Duration,
    /// Time accumulated since the last kick.
    pub elapsed: Duration,
}

/// Result of one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Every client is within its timeout; the hardware may be kicked.
    Healthy,
    /// A client ran out of time. The caller must escalate with this cause.
    Expired(ResetCause),
    /// Escalation already happened; nothing was walked.
    Halted,
}

#[derive(Debug)]
struct ClientRecord {
    name: Option<Arc<str>>,
    timeout: Duration,
    elapsed: Duration,
    prev: Option<usize>,
    next: Option<usize>,
}

#[derive(Debug)]
struct Slot {
    generation: u64,
    record: Option<ClientRecord>,
}

/// Set of running tick-walk clients.
///
/// Not synchronized itself; the context wraps it in a
/// [`CriticalSection`](crate::CriticalSection).
#[derive(Debug, Default)]
pub struct WatchdogRegistry {
    slots: Vec<Slot>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
    escalated: bool,
}

impl WatchdogRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty registry with room for `capacity` clients.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::with_capacity(capacity),
            ..Self::default()
        }
    }

    fn record(&self, handle: ClientHandle) -> Option<&ClientRecord> {
        self.slots
            .get(handle.index)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.record.as_ref())
    }

    fn record_mut(&mut self, handle: ClientHandle) -> Option<&mut ClientRecord> {
        self.slots
            .get_mut(handle.index)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.record.as_mut())
    }

    fn link_mut(&mut self, index: usize) -> Option<&mut ClientRecord> {
        self.slots.get_mut(index).and_then(|slot| slot.record.as_mut())
    }

    /// Append a client at the tail with zero elapsed time.
    pub fn register(&mut self, name: Option<Arc<str>>, timeout: Duration) -> ClientHandle {
        let record = ClientRecord {
            name,
            timeout,
            elapsed: Duration::ZERO,
            prev: self.tail,
            next: None,
        };

        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    record: None,
                });
                self.slots.len() - 1
            }
        };
        let generation = match self.slots.get_mut(index) {
            Some(slot) => {
                slot.record = Some(record);
                slot.generation
            }
            None => 0,
        };

        match self.tail.and_then(|tail| self.link_mut(tail)) {
            Some(tail) => tail.next = Some(index),
            None => self.head = Some(index),
        }
        self.tail = Some(index);
        self.len += 1;

        ClientHandle { index, generation }
    }

    /// Remove a client from any position.
    ///
    /// Returns false if `handle` is not registered.
    pub fn unregister(&mut self, handle: ClientHandle) -> bool {
        let Some(slot) = self
            .slots
            .get_mut(handle.index)
            .filter(|slot| slot.generation == handle.generation)
        else {
            return false;
        };
        let Some(record) = slot.record.take() else {
            return false;
        };
        slot.generation = slot.generation.wrapping_add(1);

        match record.prev.and_then(|prev| self.link_mut(prev)) {
            Some(prev) => prev.next = record.next,
            None => self.head = record.next,
        }
        match record.next.and_then(|next| self.link_mut(next)) {
            Some(next) => next.prev = record.prev,
            None => self.tail = record.prev,
        }

        self.free.push(handle.index);
        self.len -= 1;
        true
    }

    /// Reset a client's elapsed time to zero.
    ///
    /// Returns false if `handle` is not registered.
    pub fn kick(&mut self, handle: ClientHandle) -> bool {
        match self.record_mut(handle) {
            Some(record) => {
                record.elapsed = Duration::ZERO;
                true
            }
            None => false,
        }
    }

    /// Check every client, then advance it by `period`, front to back.
    ///
    /// A client is checked before it is credited, so the partial period
    /// between `start()` or `kick()` and the next tick is never counted as
    /// a full one. Expiry is therefore detected no earlier than the timeout
    /// and at most two periods after it.
    ///
    /// The first client whose elapsed time exceeds its timeout stops the
    /// walk and latches the registry; its elapsed time is left as it was.
    /// Reaching the timeout exactly is not an expiry.
    pub fn on_tick(&mut self, period: Duration) -> TickOutcome {
        if self.escalated {
            return TickOutcome::Halted;
        }

        let mut cursor = self.head;
        while let Some(index) = cursor {
            let Some(record) = self.link_mut(index) else {
                break;
            };
            if record.elapsed > record.timeout {
                let cause = ResetCause::VirtualWatchdogExpired {
                    client: record.name.as_deref().map(str::to_owned),
                    timeout: record.timeout,
                };
                self.escalated = true;
                return TickOutcome::Expired(cause);
            }
            record.elapsed = record.elapsed.saturating_add(period);
            cursor = record.next;
        }
        TickOutcome::Healthy
    }

    /// Elapsed time of a registered client.
    #[must_use]
    pub fn elapsed(&self, handle: ClientHandle) -> Option<Duration> {
        self.record(handle).map(|record| record.elapsed)
    }

    /// Check whether `handle` is registered.
    #[must_use]
    pub fn contains(&self, handle: ClientHandle) -> bool {
        self.record(handle).is_some()
    }

    /// Number of registered clients.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check whether no client is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Check whether a client expired and supervision stopped.
    #[must_use]
    pub fn is_escalated(&self) -> bool {
        self.escalated
    }

    /// Registered clients in walk order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<ClientStatus> {
        let mut clients = Vec::with_capacity(self.len);
        let mut cursor = self.head;
        while let Some(record) = cursor.and_then(|index| self.slots.get(index)?.record.as_ref()) {
            clients.push(ClientStatus {
                name: record.name.clone(),
                timeout: record.timeout,
                elapsed: record.elapsed,
            });
            cursor = record.next;
        }
        clients
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    fn names(registry: &WatchdogRegistry) -> Vec<String> {
        registry
            .snapshot()
            .into_iter()
            .map(|client| client.name.as_deref().unwrap_or("").to_string())
            .collect()
    }

    #[test]
    fn test_register_appends_in_order() {
        let mut registry = WatchdogRegistry::new();
        registry.register(Some("a".into()), ms(10));
        registry.register(Some("b".into()), ms(10));
        registry.register(Some("c".into()), ms(10));

        assert_eq!(names(&registry), ["a", "b", "c"]);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_unregister_head_middle_tail() {
        let mut registry = WatchdogRegistry::new();
        let a = registry.register(Some("a".into()), ms(10));
        let b = registry.register(Some("b".into()), ms(10));
        let c = registry.register(Some("c".into()), ms(10));
        let d = registry.register(Some("d".into()), ms(10));

        assert!(registry.unregister(b));
        assert_eq!(names(&registry), ["a", "c", "d"]);

        assert!(registry.unregister(a));
        assert_eq!(names(&registry), ["c", "d"]);

        assert!(registry.unregister(d));
        assert_eq!(names(&registry), ["c"]);

        assert!(registry.unregister(c));
        assert!(registry.is_empty());
        assert!(registry.snapshot().is_empty());
    }

    #[test]
    fn test_stale_handle_does_not_match_new_occupant() {
        let mut registry = WatchdogRegistry::new();
        let old = registry.register(None, ms(10));
        assert!(registry.unregister(old));

        let new = registry.register(None, ms(20));

        assert!(!registry.contains(old));
        assert!(registry.contains(new));
        assert!(!registry.unregister(old));
        assert!(!registry.kick(old));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_reused_slot_goes_to_tail() {
        let mut registry = WatchdogRegistry::new();
        let a = registry.register(Some("a".into()), ms(10));
        registry.register(Some("b".into()), ms(10));
        registry.unregister(a);
        registry.register(Some("c".into()), ms(10));

        assert_eq!(names(&registry), ["b", "c"]);
    }

    #[test]
    fn test_tick_accumulates_and_kick_clears() {
        let mut registry = WatchdogRegistry::new();
        let handle = registry.register(None, ms(10));

        assert_eq!(registry.on_tick(ms(3)), TickOutcome::Healthy);
        assert_eq!(registry.on_tick(ms(3)), TickOutcome::Healthy);
        assert_eq!(registry.elapsed(handle), Some(ms(6)));

        assert!(registry.kick(handle));
        assert_eq!(registry.elapsed(handle), Some(Duration::ZERO));
    }

    #[test]
    fn test_reaching_timeout_exactly_is_not_expiry() {
        let mut registry = WatchdogRegistry::new();
        let handle = registry.register(None, ms(10));

        for _ in 0..10 {
            assert_eq!(registry.on_tick(ms(1)), TickOutcome::Healthy);
        }
        assert_eq!(registry.elapsed(handle), Some(ms(10)));

        // Checked at exactly the timeout, then credited past it.
        assert_eq!(registry.on_tick(ms(1)), TickOutcome::Healthy);
        assert_eq!(registry.elapsed(handle), Some(ms(11)));

        assert!(matches!(
            registry.on_tick(ms(1)),
            TickOutcome::Expired(_)
        ));
        assert_eq!(registry.elapsed(handle), Some(ms(11)));
    }

    #[test]
    fn test_first_tick_never_expires_a_fresh_client() {
        let mut registry = WatchdogRegistry::new();
        let handle = registry.register(None, ms(5));

        // The tick is longer than the timeout, but no time is known to have
        // passed since registration until this tick.
        assert_eq!(registry.on_tick(ms(10)), TickOutcome::Healthy);
        assert_eq!(registry.elapsed(handle), Some(ms(10)));
        assert!(matches!(
            registry.on_tick(ms(10)),
            TickOutcome::Expired(_)
        ));
    }

    #[test]
    fn test_kick_restarts_the_partial_period() {
        let mut registry = WatchdogRegistry::new();
        let handle = registry.register(None, ms(25));

        for _ in 0..3 {
            assert_eq!(registry.on_tick(ms(10)), TickOutcome::Healthy);
        }
        assert!(registry.kick(handle));

        // 0, 10 and 20 are within 25; 30 is not.
        for _ in 0..3 {
            assert_eq!(registry.on_tick(ms(10)), TickOutcome::Healthy);
        }
        assert!(matches!(
            registry.on_tick(ms(10)),
            TickOutcome::Expired(_)
        ));
    }

    #[test]
    fn test_expiry_stops_walk_and_latches() {
        let mut registry = WatchdogRegistry::new();
        registry.register(Some("short".into()), ms(1));
        let long = registry.register(Some("long".into()), ms(100));

        assert_eq!(registry.on_tick(ms(1)), TickOutcome::Healthy);
        assert_eq!(registry.on_tick(ms(1)), TickOutcome::Healthy);
        let outcome = registry.on_tick(ms(1));

        assert_eq!(
            outcome,
            TickOutcome::Expired(ResetCause::VirtualWatchdogExpired {
                client: Some("short".to_string()),
                timeout: ms(1),
            })
        );
        // The walk stopped before reaching the second client.
        assert_eq!(registry.elapsed(long), Some(ms(2)));
        assert!(registry.is_escalated());
        assert_eq!(registry.on_tick(ms(1)), TickOutcome::Halted);
    }

    #[test]
    fn test_empty_registry_is_healthy() {
        let mut registry = WatchdogRegistry::with_capacity(4);
        assert_eq!(registry.on_tick(ms(1)), TickOutcome::Healthy);
        assert!(!registry.is_escalated());
    }
}
