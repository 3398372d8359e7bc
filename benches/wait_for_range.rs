// SPDX-License-Identifier: Apache-2.0 OR MIT

//! `wait_for_range` throughput benchmark.
//!
//! Measures registration + gap-resolution latency as the number of
//! already-present segments in the tracker grows, since every call walks
//! the segment list to find absent sub-ranges.

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use sparsetrack::{ByteRange, Tracker};
use std::hint::black_box as bb;

fn seeded_tracker(segment_count: u64) -> Tracker<String> {
    let length = segment_count * 4;
    let seed = (0..segment_count).map(|i| ByteRange::new(i * 4, i * 4 + 2));
    Tracker::with_seed("bench", length, seed).expect("seed construction")
}

fn bench_wait_for_range(c: &mut Criterion) {
    let mut group = c.benchmark_group("wait_for_range");

    for &segment_count in &[10u64, 100, 1_000] {
        group.bench_with_input(
            BenchmarkId::from_parameter(segment_count),
            &segment_count,
            |b, &segment_count| {
                // Every byte is COMPLETE after the first iteration's gaps
                // resolve, so each iteration needs its own freshly seeded
                // tracker to keep measuring gap creation rather than the
                // degenerate "already present" path.
                b.iter_batched(
                    || seeded_tracker(segment_count),
                    |tracker| {
                        let outer = ByteRange::new(0, tracker.length());
                        let gaps = tracker
                            .wait_for_range(outer, outer, |_| {})
                            .expect("wait_for_range");
                        for gap in &gaps {
                            gap.on_completion().expect("on_completion");
                        }
                        bb(gaps.len())
                    },
                    BatchSize::SmallInput,
                );
            },
        );
    }

    group.finish();
}

fn bench_completed_ranges(c: &mut Criterion) {
    let mut group = c.benchmark_group("completed_ranges");

    for &segment_count in &[10u64, 100, 1_000] {
        group.bench_with_input(
            BenchmarkId::from_parameter(segment_count),
            &segment_count,
            |b, &segment_count| {
                let tracker = seeded_tracker(segment_count);
                b.iter(|| bb(tracker.completed_ranges()));
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_wait_for_range, bench_completed_ranges);
criterion_main!(benches);
