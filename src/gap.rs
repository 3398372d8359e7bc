// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Filler-facing handle for a single absent sub-range.

use crate::error::TrackerError;
use crate::tracker::Tracker;
use std::sync::atomic::{AtomicBool, Ordering};

/// A contiguous absent byte range handed to a filler by
/// [`Tracker::wait_for_range`].
///
/// The filler drives the gap with [`Gap::on_progress`] as bytes land, then
/// resolves it with exactly one of [`Gap::on_completion`] or
/// [`Gap::on_failure`]. A second terminal call fails with
/// [`TrackerError::IllegalState`].
pub struct Gap<E> {
    tracker: Tracker<E>,
    owner: u64,
    start: u64,
    end: u64,
    done: AtomicBool,
}

impl<E> Gap<E>
where
    E: Clone + Send + 'static,
{
    pub(crate) fn new(tracker: Tracker<E>, owner: u64, start: u64, end: u64) -> Self {
        Self {
            tracker,
            owner,
            start,
            end,
            done: AtomicBool::new(false),
        }
    }

    /// Start of the absent range (inclusive), fixed for the gap's lifetime.
    pub fn start(&self) -> u64 {
        self.start
    }

    /// End of the absent range (exclusive), fixed for the gap's lifetime.
    pub fn end(&self) -> u64 {
        self.end
    }

    /// Report that bytes up to (but not including) `offset` are now
    /// present. `offset` must be greater than the start of the gap and no
    /// greater than its end. Reports that do not advance past the
    /// previously reported offset are silently ignored, since retrying
    /// fillers may redeliver the same progress.
    pub fn on_progress(&self, offset: u64) -> Result<(), TrackerError<E>> {
        self.tracker.gap_progress(self.owner, offset)
    }

    /// Mark the gap fully resolved. Equivalent to `on_progress(end)`
    /// followed by removing the now-empty pending segment and firing any
    /// listeners still attached to it.
    pub fn on_completion(&self) -> Result<(), TrackerError<E>> {
        if self.done.swap(true, Ordering::AcqRel) {
            return Err(TrackerError::IllegalState(
                "on_completion called after a terminal gap operation",
            ));
        }
        self.tracker.gap_complete(self.owner, self.end)
    }

    /// Mark the gap failed. Every listener still attached to its pending
    /// segment fires with `error`; the bytes return to the absent state.
    pub fn on_failure(&self, error: E) -> Result<(), TrackerError<E>> {
        if self.done.swap(true, Ordering::AcqRel) {
            return Err(TrackerError::IllegalState(
                "on_failure called after a terminal gap operation",
            ));
        }
        self.tracker.gap_fail(self.owner, error)
    }
}

impl<E> Drop for Gap<E> {
    fn drop(&mut self) {
        if !self.done.load(Ordering::Acquire) {
            log::warn!(
                "gap [{}, {}) dropped without a terminal call; its bytes remain pending forever",
                self.start,
                self.end
            );
        }
    }
}
