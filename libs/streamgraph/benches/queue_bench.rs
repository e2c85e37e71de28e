use std::sync::Arc;
use std::thread;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use streamgraph::{BoundedQueue, Datum, QueueCapacity, Take};

const ITEMS: u64 = 10_000;

fn bench_single_thread_put_take(c: &mut Criterion) {
    let mut group = c.benchmark_group("put_take_single_thread");
    group.throughput(Throughput::Elements(1));

    for capacity in [16usize, 1024].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(capacity),
            capacity,
            |b, &capacity| {
                let queue = BoundedQueue::new("bench", QueueCapacity::bounded(capacity).unwrap());
                let mut n = 0u64;
                b.iter(|| {
                    queue.put(Datum::new(black_box(n))).unwrap();
                    n += 1;
                    black_box(queue.take());
                });
            },
        );
    }
    group.finish();
}

fn bench_producer_consumer(c: &mut Criterion) {
    let mut group = c.benchmark_group("producer_consumer");
    group.throughput(Throughput::Elements(ITEMS));
    group.sample_size(20);

    for consumers in [1usize, 4].iter() {
        group.bench_with_input(
            BenchmarkId::new("consumers", consumers),
            consumers,
            |b, &consumers| {
                b.iter(|| {
                    let queue = Arc::new(BoundedQueue::new(
                        "bench",
                        QueueCapacity::bounded(256).unwrap(),
                    ));
                    queue.register_producers(1);

                    let workers: Vec<_> = (0..consumers)
                        .map(|_| {
                            let queue = queue.clone();
                            thread::spawn(move || {
                                let mut taken = 0u64;
                                while let Take::Item(datum) = queue.take() {
                                    black_box(datum);
                                    taken += 1;
                                }
                                taken
                            })
                        })
                        .collect();

                    for n in 0..ITEMS {
                        queue.put(Datum::new(n)).unwrap();
                    }
                    queue.release_producer();

                    let total: u64 = workers.into_iter().map(|w| w.join().unwrap()).sum();
                    assert_eq!(total, ITEMS);
                });
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_single_thread_put_take, bench_producer_consumer);
criterion_main!(benches);
