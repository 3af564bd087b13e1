//! Benchmarks for hardware watchdog hot paths.

use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::sync::Arc;
use std::time::Duration;
use vwdog_hardware_watchdog::prelude::*;
use vwdog_timer::SimClock;

fn bench_kick(c: &mut Criterion) {
    let mut group = c.benchmark_group("kick");

    group.bench_function("kick_running", |b| {
        let clock = SimClock::new();
        let watchdog = SoftwareWatchdog::new(&clock, Arc::new(RecordingReset::default()));
        if watchdog.start(Duration::from_millis(1000)).is_err() {
            return;
        }
        b.iter(|| black_box(watchdog.kick()));
    });

    group.bench_function("kick_stopped", |b| {
        let clock = SimClock::new();
        let watchdog = SoftwareWatchdog::new(&clock, Arc::new(RecordingReset::default()));
        b.iter(|| black_box(watchdog.kick()));
    });

    group.finish();
}

fn bench_status(c: &mut Criterion) {
    let clock = SimClock::new();
    let watchdog = SoftwareWatchdog::new(&clock, Arc::new(RecordingReset::default()));

    c.bench_function("is_running", |b| {
        b.iter(|| black_box(watchdog.is_running()));
    });
}

criterion_group!(benches, bench_kick, bench_status);
criterion_main!(benches);
