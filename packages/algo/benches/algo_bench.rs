//! Benchmark suite for pathway-algo
//!
//! Run with: cargo bench

use std::collections::HashSet;

use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pathway_algo::{is_unlocked, schedule, validate_catalog, Rating, ReviewState, StepNode};

fn chain(len: u32) -> Vec<StepNode> {
    (1..=len)
        .map(|order| {
            let prereqs = if order == 1 { vec![] } else { vec![order - 1] };
            StepNode::new(order, prereqs)
        })
        .collect()
}

fn bench_schedule(c: &mut Criterion) {
    let prior = ReviewState {
        interval_days: 6,
        ease_factor: 2.5,
        repetitions: 2,
    };
    let now = Utc::now();
    c.bench_function("sm2::schedule", |b| {
        b.iter(|| schedule(black_box(Some(&prior)), black_box(Rating::Good), now))
    });
}

fn bench_unlock_scan(c: &mut Criterion) {
    let steps = chain(500);
    let completed: HashSet<u32> = (1..=250).collect();
    c.bench_function("unlock::scan_500", |b| {
        b.iter(|| steps.iter().filter(|s| is_unlocked(*s, black_box(&completed))).count())
    });
}

fn bench_validate(c: &mut Criterion) {
    let steps = chain(500);
    c.bench_function("catalog::validate_500", |b| {
        b.iter(|| validate_catalog(black_box(&steps)))
    });
}

criterion_group!(benches, bench_schedule, bench_unlock_scan, bench_validate);
criterion_main!(benches);
