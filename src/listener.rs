// SPDX-License-Identifier: Apache-2.0 OR MIT

//! One-shot listener bookkeeping.

use crate::error::TrackerError;
use crate::range::ByteRange;

/// One-shot callback invoked exactly once with the final outcome of a
/// registered range of interest.
pub(crate) type Callback<E> = Box<dyn FnOnce(Result<(), TrackerError<E>>) + Send>;

pub(crate) struct ListenerEntry<E> {
    pub inner: ByteRange,
    pub remaining: usize,
    pub callback: Option<Callback<E>>,
}

impl<E> ListenerEntry<E> {
    pub fn new(inner: ByteRange, remaining: usize, callback: Callback<E>) -> Self {
        Self {
            inner,
            remaining,
            callback: Some(callback),
        }
    }

    /// Take the callback for firing. Subsequent calls return `None`, which
    /// is how exactly-once delivery is enforced even if bookkeeping bugs
    /// cause a double-resolve attempt.
    pub fn take_callback(&mut self) -> Option<Callback<E>> {
        self.callback.take()
    }
}
