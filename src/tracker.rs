// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The tracker facade: a single mutex guarding an interval set of
//! [`Segment`]s plus a registry of one-shot [`ListenerEntry`] waiters.

use crate::error::TrackerError;
use crate::gap::Gap;
use crate::listener::{Callback, ListenerEntry};
use crate::range::ByteRange;
use crate::segment::{Segment, SegmentState};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// A resolved listener callback paired with the outcome it should fire
/// with, collected while the lock is held and drained after it is released.
type Firing<E> = (Callback<E>, Result<(), TrackerError<E>>);

struct TrackerInner<E> {
    segments: Vec<Segment>,
    listeners: HashMap<u64, ListenerEntry<E>>,
    /// Owners whose pending segment drained to zero width via
    /// `on_progress(end)` but have not yet received their `on_completion`.
    drained: HashSet<u64>,
    next_listener_id: u64,
    next_owner_id: u64,
}

impl<E> TrackerInner<E> {
    fn new() -> Self {
        Self {
            segments: Vec::new(),
            listeners: HashMap::new(),
            drained: HashSet::new(),
            next_listener_id: 0,
            next_owner_id: 0,
        }
    }

    /// Maximal sub-ranges of `outer` covered by no segment (pending or
    /// complete), found by binary-searching for the first segment that
    /// could overlap `outer` and walking forward from there.
    fn absent_subranges(&self, outer: ByteRange) -> Vec<ByteRange> {
        let mut result = Vec::new();
        let mut cursor = outer.start();
        let start_idx = self.segments.partition_point(|s| s.end <= cursor);
        for seg in &self.segments[start_idx..] {
            if seg.start >= outer.end() {
                break;
            }
            if seg.start > cursor {
                result.push(ByteRange::new(cursor, seg.start.min(outer.end())));
            }
            cursor = cursor.max(seg.end);
            if cursor >= outer.end() {
                break;
            }
        }
        if cursor < outer.end() {
            result.push(ByteRange::new(cursor, outer.end()));
        }
        result
    }

    fn overlapping_pending(&self, r: ByteRange) -> Vec<usize> {
        self.segments
            .iter()
            .enumerate()
            .filter(|(_, s)| s.state == SegmentState::Pending && s.overlaps(r))
            .map(|(i, _)| i)
            .collect()
    }

    fn resolve_listener(
        &mut self,
        lid: u64,
        outcome: Result<(), TrackerError<E>>,
        fires: &mut Vec<Firing<E>>,
    ) {
        let done = match self.listeners.get_mut(&lid) {
            Some(entry) => {
                entry.remaining = entry.remaining.saturating_sub(1);
                entry.remaining == 0
            }
            None => false,
        };
        if done {
            if let Some(mut entry) = self.listeners.remove(&lid) {
                if let Some(cb) = entry.take_callback() {
                    fires.push((cb, outcome));
                }
            }
            for seg in &mut self.segments {
                seg.listeners.retain(|&l| l != lid);
            }
        }
    }

    /// Split the pending segment at `idx` at `new_start`: the prefix
    /// `[old_start, new_start)` becomes complete (merging with touching
    /// complete neighbors), and the suffix (if non-empty) is reinserted as
    /// pending, keeping the same owner. Returns listener callbacks to fire
    /// once the lock is released.
    fn advance_pending(
        &mut self,
        idx: usize,
        new_start: u64,
    ) -> Vec<Firing<E>> {
        let owner = self.segments[idx]
            .owner
            .expect("advance_pending called on a non-pending segment");
        let seg_start = self.segments[idx].start;
        let seg_end = self.segments[idx].end;
        let old_listeners = std::mem::take(&mut self.segments[idx].listeners);
        self.segments.remove(idx);

        let mut complete_idx = idx;
        let merged_left = idx > 0
            && self.segments.get(idx - 1).is_some_and(|left| {
                left.state == SegmentState::Complete && left.end == seg_start
            });
        if merged_left {
            complete_idx = idx - 1;
            self.segments[complete_idx].end = new_start;
        } else {
            self.segments.insert(idx, Segment::complete(seg_start, new_start));
        }

        let right_idx = complete_idx + 1;
        if let Some(right) = self.segments.get(right_idx) {
            if right.state == SegmentState::Complete && right.start == new_start {
                let right_end = right.end;
                self.segments.remove(right_idx);
                self.segments[complete_idx].end = right_end;
            }
        }

        let mut fires = Vec::new();
        let insert_at = complete_idx + 1;
        if new_start < seg_end {
            let remainder_range = ByteRange::new(new_start, seg_end);
            let mut remainder_listeners = Vec::new();
            for lid in old_listeners {
                let still_overlaps = self
                    .listeners
                    .get(&lid)
                    .is_some_and(|e| e.inner.overlaps(remainder_range));
                if still_overlaps {
                    remainder_listeners.push(lid);
                } else {
                    self.resolve_listener(lid, Ok(()), &mut fires);
                }
            }
            let mut remainder = Segment::pending(new_start, seg_end, owner);
            remainder.listeners = remainder_listeners;
            self.segments.insert(insert_at, remainder);
        } else {
            self.drained.insert(owner);
            for lid in old_listeners {
                self.resolve_listener(lid, Ok(()), &mut fires);
            }
        }
        fires
    }
}

/// Cheap-to-clone handle onto a shared sparse file tracker.
///
/// Every clone refers to the same underlying state; the tracker is meant to
/// be held by both waiters and the fillers producing the bytes they are
/// waiting on.
pub struct Tracker<E> {
    shared: Arc<TrackerShared<E>>,
}

struct TrackerShared<E> {
    name: String,
    length: u64,
    inner: Mutex<TrackerInner<E>>,
}

impl<E> Clone for Tracker<E> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<E> Tracker<E>
where
    E: Clone + Send + 'static,
{
    /// Create an empty tracker for a file of `length` bytes, no bytes yet
    /// present.
    pub fn new(name: impl Into<String>, length: u64) -> Self {
        Self {
            shared: Arc::new(TrackerShared {
                name: name.into(),
                length,
                inner: Mutex::new(TrackerInner::new()),
            }),
        }
    }

    /// Create a tracker seeded with an already-present subset of the file.
    /// `seed` must be given in ascending, non-overlapping, non-touching
    /// order; violations, or any range outside `[0, length)`, fail with
    /// [`TrackerError::InvalidRange`].
    pub fn with_seed(
        name: impl Into<String>,
        length: u64,
        seed: impl IntoIterator<Item = ByteRange>,
    ) -> Result<Self, TrackerError<E>> {
        let mut segments = Vec::new();
        let mut prev_end: Option<u64> = None;
        for r in seed {
            if r.end() > length {
                return Err(TrackerError::InvalidRange {
                    start: r.start(),
                    end: r.end(),
                    length,
                });
            }
            if let Some(pe) = prev_end {
                if r.start() <= pe {
                    return Err(TrackerError::InvalidRange {
                        start: r.start(),
                        end: r.end(),
                        length,
                    });
                }
            }
            prev_end = Some(r.end());
            segments.push(Segment::complete(r.start(), r.end()));
        }
        let mut inner = TrackerInner::new();
        inner.segments = segments;
        Ok(Self {
            shared: Arc::new(TrackerShared {
                name: name.into(),
                length,
                inner: Mutex::new(inner),
            }),
        })
    }

    /// Diagnostic name, included in every log line this tracker emits.
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Total length of the logical file this tracker covers.
    pub fn length(&self) -> u64 {
        self.shared.length
    }

    fn validate_bounds(&self, r: ByteRange) -> Result<(), TrackerError<E>> {
        if r.end() > self.shared.length {
            return Err(TrackerError::InvalidRange {
                start: r.start(),
                end: r.end(),
                length: self.shared.length,
            });
        }
        Ok(())
    }

    /// Ensure every absent byte of `outer` is covered by a pending segment
    /// (creating new ones as needed, owned by this call), then register a
    /// one-shot `callback` against `inner`'s completion. Returns the gaps
    /// newly created by this call; pre-existing pending segments are left
    /// for their original owners to drive.
    pub fn wait_for_range<F>(
        &self,
        outer: ByteRange,
        inner: ByteRange,
        callback: F,
    ) -> Result<Vec<Gap<E>>, TrackerError<E>>
    where
        F: FnOnce(Result<(), TrackerError<E>>) + Send + 'static,
    {
        self.validate_bounds(outer)?;
        self.validate_bounds(inner)?;
        if !outer.contains_range(inner) {
            return Err(TrackerError::InvalidListenerRange { inner, outer });
        }

        let mut immediate: Option<Firing<E>> = None;
        let gaps;
        {
            let mut st = self.shared.inner.lock();
            let absent = st.absent_subranges(outer);
            let mut new_gaps = Vec::with_capacity(absent.len());
            for r in &absent {
                let owner = st.next_owner_id;
                st.next_owner_id += 1;
                let idx = st.segments.partition_point(|s| s.start < r.start());
                st.segments.insert(idx, Segment::pending(r.start(), r.end(), owner));
                log::debug!(
                    "tracker {}: opened gap {} (owner {})",
                    self.shared.name,
                    r,
                    owner
                );
                new_gaps.push(Gap::new(self.clone(), owner, r.start(), r.end()));
            }

            let overlapping = st.overlapping_pending(inner);
            let boxed: Callback<E> = Box::new(callback);
            if overlapping.is_empty() {
                immediate = Some((boxed, Ok(())));
            } else {
                let lid = st.next_listener_id;
                st.next_listener_id += 1;
                let remaining = overlapping.len();
                st.listeners.insert(lid, ListenerEntry::new(inner, remaining, boxed));
                for idx in overlapping {
                    st.segments[idx].listeners.push(lid);
                }
            }
            gaps = new_gaps;
        }
        if let Some((cb, res)) = immediate {
            cb(res);
        }
        Ok(gaps)
    }

    /// Register a listener for `inner` only if it is currently covered
    /// entirely by pending and/or complete segments with at least one byte
    /// still pending. Returns `false` (without invoking `callback`) if
    /// `inner` is already entirely complete, or if any byte of it is not
    /// covered by any segment at all.
    pub fn wait_for_range_if_pending<F>(
        &self,
        inner: ByteRange,
        callback: F,
    ) -> Result<bool, TrackerError<E>>
    where
        F: FnOnce(Result<(), TrackerError<E>>) + Send + 'static,
    {
        self.validate_bounds(inner)?;
        let mut st = self.shared.inner.lock();
        if !st.absent_subranges(inner).is_empty() {
            return Ok(false);
        }
        let overlapping = st.overlapping_pending(inner);
        if overlapping.is_empty() {
            return Ok(false);
        }
        let lid = st.next_listener_id;
        st.next_listener_id += 1;
        let remaining = overlapping.len();
        st.listeners
            .insert(lid, ListenerEntry::new(inner, remaining, Box::new(callback)));
        for idx in overlapping {
            st.segments[idx].listeners.push(lid);
        }
        Ok(true)
    }

    /// The first (smallest-start) maximal sub-range of `[start, end)` that
    /// is not complete, or `None` if every byte in it is. `start == end` is
    /// a valid empty query and always returns `None`.
    pub fn absent_range_within(
        &self,
        start: u64,
        end: u64,
    ) -> Result<Option<ByteRange>, TrackerError<E>> {
        if end > self.shared.length || start > end {
            return Err(TrackerError::InvalidRange {
                start,
                end,
                length: self.shared.length,
            });
        }
        if start == end {
            return Ok(None);
        }
        let st = self.shared.inner.lock();
        // Pending segments are still absent from a reader's point of view,
        // so only complete segments count as coverage here.
        let mut cursor = start;
        for seg in &st.segments {
            if seg.state != SegmentState::Complete {
                continue;
            }
            if seg.end <= cursor {
                continue;
            }
            if seg.start >= end {
                break;
            }
            if seg.start > cursor {
                return Ok(Some(ByteRange::new(cursor, seg.start.min(end))));
            }
            cursor = cursor.max(seg.end);
            if cursor >= end {
                break;
            }
        }
        if cursor < end {
            Ok(Some(ByteRange::new(cursor, end)))
        } else {
            Ok(None)
        }
    }

    /// All complete segments, in ascending order, with no two touching.
    pub fn completed_ranges(&self) -> Vec<ByteRange> {
        let st = self.shared.inner.lock();
        st.segments
            .iter()
            .filter(|s| s.state == SegmentState::Complete)
            .map(Segment::range)
            .collect()
    }

    pub(crate) fn gap_progress(&self, owner: u64, offset: u64) -> Result<(), TrackerError<E>> {
        let fires;
        {
            let mut st = self.shared.inner.lock();
            let idx = match st.segments.iter().position(|s| s.owner == Some(owner)) {
                Some(i) => i,
                None => {
                    if st.drained.contains(&owner) {
                        return Ok(());
                    }
                    return Err(TrackerError::IllegalState(
                        "on_progress called on an already-resolved gap",
                    ));
                }
            };
            let seg_start = st.segments[idx].start;
            let seg_end = st.segments[idx].end;
            if offset > seg_end {
                return Err(TrackerError::IllegalState(
                    "on_progress offset is beyond the gap's end",
                ));
            }
            if offset <= seg_start {
                return Ok(());
            }
            log::trace!(
                "tracker {}: gap owner {} progressed to {}",
                self.shared.name,
                owner,
                offset
            );
            fires = st.advance_pending(idx, offset);
        }
        for (cb, res) in fires {
            cb(res);
        }
        Ok(())
    }

    pub(crate) fn gap_complete(&self, owner: u64, gap_end: u64) -> Result<(), TrackerError<E>> {
        let mut fires = Vec::new();
        {
            let mut st = self.shared.inner.lock();
            if let Some(idx) = st.segments.iter().position(|s| s.owner == Some(owner)) {
                let seg_end = st.segments[idx].end.max(gap_end);
                fires = st.advance_pending(idx, seg_end);
                st.drained.remove(&owner);
            } else if st.drained.remove(&owner) {
                // Already fully drained by a prior on_progress(end); nothing more to fire.
            } else {
                return Err(TrackerError::IllegalState(
                    "on_completion called on an unknown or already-resolved gap",
                ));
            }
            log::debug!("tracker {}: gap owner {} completed", self.shared.name, owner);
        }
        for (cb, res) in fires {
            cb(res);
        }
        Ok(())
    }

    pub(crate) fn gap_fail(&self, owner: u64, error: E) -> Result<(), TrackerError<E>> {
        let mut fires = Vec::new();
        {
            let mut st = self.shared.inner.lock();
            if let Some(idx) = st.segments.iter().position(|s| s.owner == Some(owner)) {
                let seg = st.segments.remove(idx);
                log::warn!(
                    "tracker {}: gap owner {} failed, returning [{}, {}) to absent",
                    self.shared.name,
                    owner,
                    seg.start,
                    seg.end
                );
                for lid in seg.listeners {
                    if let Some(mut entry) = st.listeners.remove(&lid) {
                        if let Some(cb) = entry.take_callback() {
                            fires.push((cb, Err(TrackerError::FillerFailure(error.clone()))));
                        }
                    }
                    for other in &mut st.segments {
                        other.listeners.retain(|&l| l != lid);
                    }
                }
            } else if st.drained.contains(&owner) {
                return Err(TrackerError::IllegalState(
                    "on_failure called after the gap already drained to completion",
                ));
            } else {
                return Err(TrackerError::IllegalState(
                    "on_failure called on an unknown or already-resolved gap",
                ));
            }
        }
        for (cb, res) in fires {
            cb(res);
        }
        Ok(())
    }
}
