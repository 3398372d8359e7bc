// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Internal segment bookkeeping for the tracker's interval set.

use crate::range::ByteRange;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SegmentState {
    Pending,
    Complete,
}

/// One entry of the tracker's ordered, non-overlapping interval set.
///
/// A `Pending` segment is owned by exactly one `Gap`, identified by `owner`.
/// Two `Pending` segments are never merged even when touching, since merging
/// would conflate the ownership of two independent fillers; only touching
/// `Complete` segments are merged.
#[derive(Debug, Clone)]
pub(crate) struct Segment {
    pub start: u64,
    pub end: u64,
    pub state: SegmentState,
    pub owner: Option<u64>,
    pub listeners: Vec<u64>,
}

impl Segment {
    pub fn complete(start: u64, end: u64) -> Self {
        Self {
            start,
            end,
            state: SegmentState::Complete,
            owner: None,
            listeners: Vec::new(),
        }
    }

    pub fn pending(start: u64, end: u64, owner: u64) -> Self {
        Self {
            start,
            end,
            state: SegmentState::Pending,
            owner: Some(owner),
            listeners: Vec::new(),
        }
    }

    pub fn range(&self) -> ByteRange {
        ByteRange::new(self.start, self.end)
    }

    pub fn is_drained(&self) -> bool {
        self.start >= self.end
    }

    pub fn overlaps(&self, r: ByteRange) -> bool {
        !self.is_drained() && self.range().overlaps(r)
    }
}
