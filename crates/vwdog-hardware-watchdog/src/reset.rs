//! System reset escalation.
//!
//! Every expiry, virtual or hardware, ends in a call to
//! [`SystemReset::system_reset`]. On a target this reboots the device; the
//! [`AbortReset`] host implementation terminates the process, and
//! [`RecordingReset`] records the request so tests can observe it.

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::Duration;
use vwdog_timer::{Clock, MonotonicClock};

/// Why a system reset was requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResetCause {
    /// A virtual watchdog client was not kicked within its timeout.
    VirtualWatchdogExpired {
        /// Diagnostic name of the client, if it has one.
        client: Option<String>,
        /// The client's timeout.
        timeout: Duration,
    },
    /// The hardware watchdog itself was not kicked within its timeout.
    HardwareWatchdogExpired {
        /// The hardware watchdog timeout.
        timeout: Duration,
    },
}

impl std::fmt::Display for ResetCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::VirtualWatchdogExpired {
                client: Some(name),
                timeout,
            } => write!(
                f,
                "virtual watchdog '{name}' expired ({}ms)",
                timeout.as_millis()
            ),
            Self::VirtualWatchdogExpired {
                client: None,
                timeout,
            } => write!(f, "virtual watchdog expired ({}ms)", timeout.as_millis()),
            Self::HardwareWatchdogExpired { timeout } => {
                write!(f, "hardware watchdog expired ({}ms)", timeout.as_millis())
            }
        }
    }
}

/// Sink for system reset requests.
///
/// Implementations may return, which is what makes escalation observable in
/// tests. Callers must not assume the system is still in a consistent state
/// afterwards.
pub trait SystemReset: Send + Sync {
    /// Request a system reset.
    fn system_reset(&self, cause: ResetCause);
}

/// Production reset for hosted targets: logs the cause and aborts.
#[derive(Debug, Clone, Copy, Default)]
pub struct AbortReset;

impl SystemReset for AbortReset {
    fn system_reset(&self, cause: ResetCause) {
        tracing::error!(cause = %cause, "System reset requested, aborting");
        std::process::abort();
    }
}

/// A recorded reset request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetEvent {
    /// Why the reset was requested.
    pub cause: ResetCause,
    /// Clock time of the request.
    pub at: Duration,
}

/// Reset sink that records requests instead of acting on them.
pub struct RecordingReset {
    clock: Arc<dyn Clock>,
    events: Mutex<Vec<ResetEvent>>,
    signal: Condvar,
}

impl RecordingReset {
    /// Create a recorder stamping events with `clock`.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            events: Mutex::new(Vec::new()),
            signal: Condvar::new(),
        }
    }

    /// Number of recorded requests.
    #[must_use]
    pub fn count(&self) -> usize {
        self.events.lock().len()
    }

    /// All recorded requests in arrival order.
    #[must_use]
    pub fn events(&self) -> Vec<ResetEvent> {
        self.events.lock().clone()
    }

    /// The first recorded request.
    #[must_use]
    pub fn first(&self) -> Option<ResetEvent> {
        self.events.lock().first().cloned()
    }

    /// Block until a request has been recorded or `timeout` elapses.
    ///
    /// Returns the first recorded request.
    #[must_use]
    pub fn wait_for_reset(&self, timeout: Duration) -> Option<ResetEvent> {
        let mut events = self.events.lock();
        if events.is_empty() {
            let _timed_out = self
                .signal
                .wait_while_for(&mut events, |events| events.is_empty(), timeout);
        }
        events.first().cloned()
    }
}

impl Default for RecordingReset {
    fn default() -> Self {
        Self::new(Arc::new(MonotonicClock::new()))
    }
}

impl SystemReset for RecordingReset {
    fn system_reset(&self, cause: ResetCause) {
        let at = self.clock.now();
        tracing::error!(cause = %cause, at_ms = at.as_millis(), "System reset requested");
        self.events.lock().push(ResetEvent { cause, at });
        self.signal.notify_all();
    }
}

impl std::fmt::Debug for RecordingReset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingReset")
            .field("events", &self.events.lock().len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vwdog_timer::SimClock;

    #[test]
    fn test_recording_reset_stamps_clock_time() {
        let clock = SimClock::new();
        let reset = RecordingReset::new(Arc::new(clock.clone()));

        clock.advance(Duration::from_millis(42));
        reset.system_reset(ResetCause::HardwareWatchdogExpired {
            timeout: Duration::from_millis(10),
        });

        assert_eq!(reset.count(), 1);
        assert_eq!(
            reset.first().map(|event| event.at),
            Some(Duration::from_millis(42))
        );
    }

    #[test]
    fn test_wait_for_reset_times_out() {
        let reset = RecordingReset::default();
        assert!(reset.wait_for_reset(Duration::from_millis(10)).is_none());
    }

    #[test]
    fn test_cause_display() {
        let cause = ResetCause::VirtualWatchdogExpired {
            client: Some("uart".to_string()),
            timeout: Duration::from_millis(300),
        };
        assert_eq!(cause.to_string(), "virtual watchdog 'uart' expired (300ms)");
    }
}
