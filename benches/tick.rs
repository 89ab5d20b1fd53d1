use criterion::*;
use std::cell::Cell;
use std::hint::black_box;
use std::rc::Rc;

mod common;
use common::*;

fn tick_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick");

    for count in [COMMANDS_SMALL, COMMANDS_MED, COMMANDS_LARGE] {
        group.throughput(Throughput::Elements(count as u64));

        group.bench_with_input(BenchmarkId::new("run_commands", count), &count, |b, &count| {
            let (scheduler, subsystems) = setup_scheduler(count);
            let counter = Rc::new(Cell::new(0));
            for command in run_commands(&subsystems, &counter) {
                scheduler.schedule(&command).unwrap();
            }

            b.iter(|| {
                scheduler.run();
                black_box(counter.get());
            });
        });

        group.bench_with_input(BenchmarkId::new("default_backfill", count), &count, |b, &count| {
            b.iter_batched(
                || {
                    let (scheduler, subsystems) = setup_scheduler(count);
                    idle_defaults(&subsystems);
                    scheduler
                },
                |scheduler| {
                    // first tick schedules every default command
                    scheduler.run();
                    black_box(scheduler.scheduled_commands().len());
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

fn interrupt_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("interrupt");

    group.bench_function("schedule_over_defaults_256", |b| {
        let (scheduler, subsystems) = setup_scheduler(COMMANDS_MED);
        idle_defaults(&subsystems);
        let counter = Rc::new(Cell::new(0));
        let commands = run_commands(&subsystems, &counter);

        b.iter(|| {
            // defaults in, defaults interrupted, commands cancelled
            scheduler.run();
            for command in &commands {
                scheduler.schedule(command).unwrap();
            }
            scheduler.cancel_all();
        });
    });

    group.finish();
}

criterion_group!(benches, tick_benchmark, interrupt_benchmark);
criterion_main!(benches);
