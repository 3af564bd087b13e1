//! Per-client one-shot supervision.
//!
//! In reschedule mode a client owns a private one-shot timer. Starting arms
//! it for the client's timeout, every kick re-arms it (the previous arming
//! never fires) and stopping detaches it. If it ever fires, the client missed
//! its deadline and the system is reset.

use std::sync::Arc;
use std::time::Duration;
use vwdog_hardware_watchdog::{ResetCause, SystemReset};
use vwdog_timer::OneShotTimer;

use crate::critical::CriticalSection;

pub(crate) struct RescheduleTimer {
    timer: CriticalSection<Box<dyn OneShotTimer>>,
    timeout: Duration,
    cause: ResetCause,
    reset: Arc<dyn SystemReset>,
}

impl RescheduleTimer {
    pub(crate) fn new(
        timer: Box<dyn OneShotTimer>,
        timeout: Duration,
        client: Option<&str>,
        reset: Arc<dyn SystemReset>,
    ) -> Self {
        Self {
            timer: CriticalSection::new(timer),
            timeout,
            cause: ResetCause::VirtualWatchdogExpired {
                client: client.map(str::to_owned),
                timeout,
            },
            reset,
        }
    }

    /// Arm, or re-arm, for a full timeout from now.
    pub(crate) fn arm(&self) {
        let cause = self.cause.clone();
        let reset = Arc::clone(&self.reset);
        self.timer.with(|timer| {
            timer.attach(
                Box::new(move || {
                    tracing::error!(cause = %cause, "Virtual watchdog expired, resetting system");
                    reset.system_reset(cause);
                }),
                self.timeout,
            );
        });
    }

    /// Cancel the pending expiry.
    pub(crate) fn disarm(&self) {
        self.timer.with(|timer| timer.detach());
    }

    pub(crate) fn is_armed(&self) -> bool {
        self.timer.with(|timer| timer.is_pending())
    }
}

impl std::fmt::Debug for RescheduleTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RescheduleTimer")
            .field("timeout", &self.timeout)
            .field("armed", &self.is_armed())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vwdog_hardware_watchdog::RecordingReset;
    use vwdog_timer::{SimClock, TimerFactory};

    fn fixture(timeout_ms: u64) -> (SimClock, Arc<RecordingReset>, RescheduleTimer) {
        let clock = SimClock::new();
        let reset = Arc::new(RecordingReset::new(Arc::new(clock.clone())));
        let timer = RescheduleTimer::new(
            clock.one_shot(),
            Duration::from_millis(timeout_ms),
            Some("uart"),
            reset.clone(),
        );
        (clock, reset, timer)
    }

    #[test]
    fn test_expiry_resets_with_client_cause() {
        let (clock, reset, timer) = fixture(50);

        timer.arm();
        clock.advance(Duration::from_millis(50));

        assert_eq!(
            reset.first().map(|event| event.cause),
            Some(ResetCause::VirtualWatchdogExpired {
                client: Some("uart".to_string()),
                timeout: Duration::from_millis(50),
            })
        );
    }

    #[test]
    fn test_rearm_overrides_previous_deadline() {
        let (clock, reset, timer) = fixture(50);

        timer.arm();
        clock.advance(Duration::from_millis(40));
        timer.arm();
        clock.advance(Duration::from_millis(40));
        assert_eq!(reset.count(), 0);

        clock.advance(Duration::from_millis(10));
        assert_eq!(
            reset.first().map(|event| event.at),
            Some(Duration::from_millis(90))
        );
        assert_eq!(reset.count(), 1);
    }

    #[test]
    fn test_disarm_prevents_expiry() {
        let (clock, reset, timer) = fixture(50);

        timer.arm();
        timer.disarm();
        clock.advance(Duration::from_secs(1));

        assert_eq!(reset.count(), 0);
        assert!(!timer.is_armed());
    }
}
