//! Property-based tests for hardware watchdog expiry timing.

use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use vwdog_hardware_watchdog::prelude::*;
use vwdog_timer::{Clock, SimClock};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_reset_happens_timeout_after_last_kick(
        timeout_ms in 1u64..500,
        kick_gaps in prop::collection::vec(0u64..1000, 0..20),
    ) {
        let clock = SimClock::new();
        let reset = Arc::new(RecordingReset::new(Arc::new(clock.clone())));
        let watchdog = SoftwareWatchdog::new(&clock, reset.clone());
        let timeout = Duration::from_millis(timeout_ms);
        prop_assert!(watchdog.start(timeout).is_ok());

        let mut deadline = timeout;
        for gap in kick_gaps {
            clock.advance(Duration::from_millis(gap));
            if clock.now() >= deadline {
                break;
            }
            prop_assert!(watchdog.kick().is_ok());
            deadline = clock.now() + timeout;
        }
        clock.advance(timeout * 2);

        prop_assert_eq!(reset.count(), 1);
        prop_assert_eq!(reset.first().map(|event| event.at), Some(deadline));
        prop_assert_eq!(watchdog.status(), WatchdogStatus::Expired);
    }

    #[test]
    fn prop_start_accepts_only_configured_range(
        min_ms in 1u32..100,
        span_ms in 0u32..1000,
        requested_ms in 0u64..2000,
    ) {
        let config = WatchdogConfig::builder()
            .min_timeout_ms(min_ms)
            .max_timeout_ms(min_ms + span_ms)
            .build();
        prop_assert!(config.is_ok());
        let Ok(config) = config else {
            return Ok(());
        };
        let clock = SimClock::new();
        let reset = Arc::new(RecordingReset::new(Arc::new(clock.clone())));
        let watchdog = SoftwareWatchdog::with_config(config, &clock, reset);

        let accepted = watchdog.start(Duration::from_millis(requested_ms)).is_ok();
        let in_range = requested_ms >= u64::from(min_ms)
            && requested_ms <= u64::from(min_ms + span_ms);
        prop_assert_eq!(accepted, in_range);
        prop_assert_eq!(watchdog.is_running(), in_range);
    }
}
