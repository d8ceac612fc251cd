//! Benchmarks for the shared circuit breaker.
//!
//! Every upstream call takes the breaker's lock at least twice (admission
//! check and outcome), so the uncontended and contended costs both matter.

#![allow(missing_docs)]

use std::sync::Arc;
use std::thread;

use completion_gateway::inference::{CircuitBreaker, CircuitBreakerConfig};
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

fn bench_admission(c: &mut Criterion) {
    let mut group = c.benchmark_group("breaker_admission");

    let closed = CircuitBreaker::new("bench", CircuitBreakerConfig::new());
    group.bench_function("closed", |b| {
        b.iter(|| black_box(closed.is_open()));
    });

    let open = CircuitBreaker::new("bench", CircuitBreakerConfig::new().with_failure_threshold(1));
    open.record_failure();
    group.bench_function("open", |b| {
        b.iter(|| black_box(open.is_open()));
    });

    group.finish();
}

fn bench_record_outcome(c: &mut Criterion) {
    let breaker = CircuitBreaker::new("bench", CircuitBreakerConfig::new());

    c.bench_function("record_success", |b| {
        b.iter(|| breaker.record_success());
    });

    c.bench_function("get_state", |b| {
        b.iter(|| black_box(breaker.get_state()));
    });
}

fn bench_contended(c: &mut Criterion) {
    let mut group = c.benchmark_group("breaker_contended");

    for threads in [2_usize, 4, 8] {
        group.bench_with_input(BenchmarkId::from_parameter(threads), &threads, |b, &threads| {
            let breaker = Arc::new(CircuitBreaker::new("bench", CircuitBreakerConfig::new()));
            b.iter(|| {
                let handles: Vec<_> = (0..threads)
                    .map(|_| {
                        let breaker = Arc::clone(&breaker);
                        thread::spawn(move || {
                            for _ in 0..100 {
                                if !breaker.is_open() {
                                    breaker.record_success();
                                }
                            }
                        })
                    })
                    .collect();
                for handle in handles {
                    let _ = handle.join();
                }
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_admission, bench_record_outcome, bench_contended);
criterion_main!(benches);
