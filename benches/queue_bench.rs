//! Benchmarks for the dispatch queue and end-to-end task execution.
//!
//! Covers:
//! - Queue operations (push/pop, contended multi-producer push)
//! - Executor round-trips (invoke -> get) at different pool sizes

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;
use std::sync::Arc;
use std::thread;

use gantry::core::{make_thread_pool_executor, CancellableQueue};

fn bench_queue_push_pop(c: &mut Criterion) {
    let mut group = c.benchmark_group("queue");
    group.throughput(Throughput::Elements(1));

    group.bench_function("push_pop", |b| {
        let queue = CancellableQueue::new();
        b.iter(|| {
            queue.push(black_box(1u64));
            black_box(queue.pop());
        });
    });

    group.bench_function("contended_push", |b| {
        b.iter(|| {
            let queue = Arc::new(CancellableQueue::new());
            let mut producers = Vec::new();
            for p in 0..4u64 {
                let queue = Arc::clone(&queue);
                producers.push(thread::spawn(move || {
                    for i in 0..256u64 {
                        queue.push(p * 256 + i);
                    }
                }));
            }
            for producer in producers {
                producer.join().unwrap();
            }
            black_box(queue.len())
        });
    });

    group.finish();
}

fn bench_invoke_round_trip(c: &mut Criterion) {
    let mut group = c.benchmark_group("executor");
    group.throughput(Throughput::Elements(1));

    for workers in [1usize, 4] {
        group.bench_with_input(
            BenchmarkId::new("invoke_get", workers),
            &workers,
            |b, &workers| {
                let executor = make_thread_pool_executor(workers).expect("spawn pool");
                b.iter(|| {
                    let future = executor.invoke(|| Ok(black_box(1u64)));
                    black_box(future.get().expect("result"))
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_queue_push_pop, bench_invoke_round_trip);
criterion_main!(benches);
