use criterion::{Criterion, black_box, criterion_group, criterion_main};
use tickline_scheduler::{ManualDriver, OwnerId, Scheduler, StateRegistry};

fn benchmark_queue(c: &mut Criterion) {
    c.bench_function("queue 1000", |b| {
        b.iter(|| {
            let registry = StateRegistry::new();
            let driver = ManualDriver::new();
            let scheduler = Scheduler::new(OwnerId::unique(), &registry, &driver).unwrap();
            for _ in 0..1000 {
                scheduler.queue(|| {
                    black_box(1 + 1);
                });
            }
            black_box(scheduler.pending_count());
        })
    });
}

fn benchmark_ticks(c: &mut Criterion) {
    c.bench_function("queue + tick 1000", |b| {
        b.iter(|| {
            let registry = StateRegistry::new();
            let driver = ManualDriver::new();
            let scheduler = Scheduler::new(OwnerId::unique(), &registry, &driver).unwrap();
            for _ in 0..1000 {
                scheduler.queue(|| {
                    black_box(1 + 1);
                });
            }
            driver.tick_n(1000);
            black_box(scheduler.current_task());
        })
    });
}

criterion_group!(benches, benchmark_queue, benchmark_ticks);
criterion_main!(benches);
