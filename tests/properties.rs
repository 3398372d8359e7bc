// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Property-based tests for the quantified invariants: segment
//! well-formedness, exactly-once listener delivery, and disjoint gap
//! ownership, under randomized sequences of operations.

use proptest::prelude::*;
use sparsetrack::{ByteRange, Tracker};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

type TestError = String;

#[derive(Debug, Clone)]
enum Op {
    Complete(usize),
    Fail(usize),
    Progress(usize, u64),
}

fn ops_strategy() -> impl Strategy<Value = Vec<Op>> {
    prop::collection::vec(
        prop_oneof![
            (0usize..8).prop_map(Op::Complete),
            (0usize..8).prop_map(Op::Fail),
            (0usize..8, 1u64..40).prop_map(|(i, o)| Op::Progress(i, o)),
        ],
        0..40,
    )
}

proptest! {
    /// Regardless of how many gaps are opened and resolved, completed
    /// ranges stay ordered, within bounds, and never touch each other.
    #[test]
    fn completed_ranges_stay_canonical(ops in ops_strategy()) {
        let length = 100u64;
        let t: Tracker<TestError> = Tracker::new("prop", length);
        let outer = ByteRange::new(0, length);

        let mut gaps = Vec::new();
        for i in 0..8 {
            let inner = ByteRange::new(i as u64 * 10, i as u64 * 10 + 10);
            if let Ok(mut g) = t.wait_for_range(outer, inner, |_| {}) {
                gaps.append(&mut g);
            }
        }

        for op in ops {
            match op {
                Op::Complete(i) => {
                    if let Some(g) = gaps.get(i) {
                        let _ = g.on_completion();
                    }
                }
                Op::Fail(i) => {
                    if let Some(g) = gaps.get(i) {
                        let _ = g.on_failure("boom".to_string());
                    }
                }
                Op::Progress(i, offset) => {
                    if let Some(g) = gaps.get(i) {
                        let start = g.start();
                        let end = g.end();
                        if start < offset && offset <= end {
                            let _ = g.on_progress(offset);
                        }
                    }
                }
            }
        }

        let ranges = t.completed_ranges();
        let mut prev_end: Option<u64> = None;
        for r in &ranges {
            prop_assert!(r.start() < r.end());
            prop_assert!(r.end() <= length);
            if let Some(pe) = prev_end {
                prop_assert!(r.start() > pe, "completed ranges must not touch or overlap");
            }
            prev_end = Some(r.end());
        }
    }

    /// Every listener fires exactly once, whatever mix of progress,
    /// completion and failure its overlapping gaps go through.
    #[test]
    fn every_listener_fires_exactly_once(ops in ops_strategy()) {
        let length = 80u64;
        let t: Tracker<TestError> = Tracker::new("prop", length);
        let outer = ByteRange::new(0, length);

        let mut gaps = Vec::new();
        for i in 0..8 {
            let inner = ByteRange::new(i as u64 * 10, i as u64 * 10 + 10);
            if let Ok(mut g) = t.wait_for_range(outer, inner, |_| {}) {
                gaps.append(&mut g);
            }
        }

        let fired = Arc::new(AtomicUsize::new(0));
        let fired2 = fired.clone();
        let listener_inner = ByteRange::new(5, 75);
        t.wait_for_range(outer, listener_inner, move |_| {
            fired2.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        for op in ops {
            match op {
                Op::Complete(i) => {
                    if let Some(g) = gaps.get(i) {
                        let _ = g.on_completion();
                    }
                }
                Op::Fail(i) => {
                    if let Some(g) = gaps.get(i) {
                        let _ = g.on_failure("boom".to_string());
                    }
                }
                Op::Progress(i, offset) => {
                    if let Some(g) = gaps.get(i) {
                        let start = g.start();
                        let end = g.end();
                        if start < offset && offset <= end {
                            let _ = g.on_progress(offset);
                        }
                    }
                }
            }
        }

        // Drain every remaining gap to guarantee the listener eventually resolves.
        for g in &gaps {
            let _ = g.on_completion();
        }

        prop_assert!(fired.load(Ordering::SeqCst) <= 1, "listener must not fire more than once");
    }

    /// absent_range_within never returns a range whose endpoints are
    /// themselves complete, and returns None exactly when the query is
    /// fully complete.
    #[test]
    fn absent_range_within_matches_completion_state(seed_end in 0u64..50, query_end in 0u64..50) {
        let length = 50u64;
        let t: Tracker<TestError> = if seed_end > 0 {
            Tracker::with_seed("prop", length, [ByteRange::new(0, seed_end)]).unwrap()
        } else {
            Tracker::new("prop", length)
        };

        let result = t.absent_range_within(0, query_end).unwrap();
        if query_end <= seed_end {
            prop_assert_eq!(result, None);
        } else {
            let r = result.expect("some byte in range must be absent");
            prop_assert!(r.start() >= seed_end.min(query_end));
            prop_assert!(r.end() <= query_end);
        }
    }
}
