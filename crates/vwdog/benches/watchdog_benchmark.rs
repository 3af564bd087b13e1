//! Benchmarks for virtual watchdog hot paths.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::sync::Arc;
use std::time::Duration;
use vwdog::prelude::*;
use vwdog::{TickOutcome, WatchdogRegistry};
use vwdog_hardware_watchdog::RecordingReset;
use vwdog_timer::SimClock;

fn bench_tick_walk(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick_walk");

    for clients in [1usize, 16, 256] {
        let mut registry = WatchdogRegistry::with_capacity(clients);
        let handles: Vec<_> = (0..clients)
            .map(|_| registry.register(None, Duration::from_secs(3600)))
            .collect();

        group.bench_with_input(BenchmarkId::from_parameter(clients), &clients, |b, _| {
            b.iter(|| {
                let outcome = registry.on_tick(black_box(Duration::from_millis(1)));
                for handle in &handles {
                    registry.kick(*handle);
                }
                black_box(outcome == TickOutcome::Healthy)
            });
        });
    }

    group.finish();
}

fn bench_client_ops(c: &mut Criterion) {
    let clock = SimClock::new();
    let Ok(context) = WatchdogContext::builder()
        .timers(Arc::new(clock.clone()))
        .reset(Arc::new(RecordingReset::default()))
        .build()
    else {
        return;
    };
    let Ok(mut watchdog) = VirtualWatchdog::try_new(&context, Duration::from_secs(3600), None)
    else {
        return;
    };

    c.bench_function("kick", |b| {
        if watchdog.try_start().is_err() {
            return;
        }
        b.iter(|| black_box(watchdog.try_kick()));
        let _stopped = watchdog.try_stop();
    });

    c.bench_function("start_stop", |b| {
        b.iter(|| {
            let _started = watchdog.try_start();
            black_box(watchdog.try_stop())
        });
    });
}

criterion_group!(benches, bench_tick_walk, bench_client_ops);
criterion_main!(benches);
