//! Benchmarks for structured reply extraction.
//!
//! Performance-critical paths:
//! - `strip_fences`: runs on every structured reply
//! - `parse_structured`: fence removal plus typed deserialization
//! - `parse_or`: the failure path, which keeps the raw content for diagnostics

#![allow(missing_docs)]

use completion_gateway::inference::{parse_or, parse_structured, strip_fences};
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct Finding {
    title: String,
    severity: String,
    lines: Vec<u32>,
}

fn findings_json(count: usize) -> String {
    let items: Vec<String> = (0..count)
        .map(|i| {
            format!(r#"{{"title": "finding {i}", "severity": "medium", "lines": [{i}, {}]}}"#, i + 1)
        })
        .collect();
    format!("[{}]", items.join(", "))
}

fn bench_strip_fences(c: &mut Criterion) {
    let mut group = c.benchmark_group("strip_fences");

    for count in [1, 10, 100] {
        let plain = findings_json(count);
        let fenced = format!("```json\n{plain}\n```\n");
        group.throughput(Throughput::Bytes(fenced.len() as u64));

        group.bench_with_input(BenchmarkId::new("plain", count), &plain, |b, input| {
            b.iter(|| strip_fences(black_box(input)));
        });
        group.bench_with_input(BenchmarkId::new("fenced", count), &fenced, |b, input| {
            b.iter(|| strip_fences(black_box(input)));
        });
    }

    group.finish();
}

fn bench_parse_structured(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_structured");

    for count in [1, 10, 100] {
        let fenced = format!("```json\n{}\n```", findings_json(count));
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("findings", count), &fenced, |b, input| {
            b.iter(|| parse_structured::<Vec<Finding>>(black_box(input)));
        });
    }

    group.finish();
}

fn bench_fallback(c: &mut Criterion) {
    let prose = "I reviewed the change and found nothing alarming. ".repeat(20);

    c.bench_function("parse_or_fallback", |b| {
        b.iter(|| parse_or::<Vec<Finding>>(black_box(&prose), Vec::new()));
    });
}

criterion_group!(
    benches,
    bench_strip_fences,
    bench_parse_structured,
    bench_fallback
);
criterion_main!(benches);
