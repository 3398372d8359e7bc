// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # sparsetrack
//!
//! A concurrent, in-memory tracker for which byte ranges of a
//! fixed-length logical file have been materialized.
//!
//! `sparsetrack` is the coordination primitive underneath a block-range
//! cache that fetches fixed-length artifacts from remote storage and serves
//! reads locally as the bytes arrive. It answers three questions under a
//! single short-held lock:
//!
//! - which bytes of the file are present right now (`completed_ranges`,
//!   `absent_range_within`)
//! - which absent bytes are already being produced by someone else, so two
//!   concurrent fillers never race to fetch the same byte
//!   (`wait_for_range`'s [`Gap`] handles)
//! - when does a byte range of interest become fully available
//!   (one-shot listener callbacks)
//!
//! ## Architecture
//!
//! ```text
//! +-------------------------------------------------------------+
//! |                          Tracker<E>                         |
//! |   Arc<Mutex<segments: Vec<Segment>, listeners: HashMap<..>>> |
//! +-------------------------------------------------------------+
//! |  wait_for_range -> splits absent sub-ranges into new Gaps,   |
//! |                     registers a one-shot listener             |
//! |  Gap::on_progress/on_completion/on_failure -> re-enter the    |
//! |                     tracker, split/merge segments, collect    |
//! |                     listener callbacks to fire after unlock   |
//! +-------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Tracker`] | Cheap-to-clone handle to the shared tracker state |
//! | [`Gap`] | Filler-facing handle for one absent sub-range |
//! | [`ByteRange`] | Half-open `[start, end)` byte range |
//! | [`TrackerError`] | Error kinds returned by tracker operations |
//!
//! ## Non-goals
//!
//! The tracker does not persist its state across restarts (callers re-seed
//! via [`Tracker::with_seed`]), does not evict completed ranges (coverage is
//! monotonic), and performs no I/O of its own: byte storage, fetch
//! scheduling, and retry policy all live in the caller.

mod error;
mod gap;
mod listener;
mod range;
mod segment;
mod tracker;

pub use error::TrackerError;
pub use gap::Gap;
pub use range::ByteRange;
pub use tracker::Tracker;
