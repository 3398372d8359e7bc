// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types for the sparse file tracker.

use crate::range::ByteRange;
use std::fmt;

/// Errors produced by [`crate::Tracker`] operations.
///
/// `E` is the error type a filler reports through [`crate::Gap::on_failure`];
/// the tracker never inspects it, only relays it to listeners.
#[derive(Debug)]
pub enum TrackerError<E> {
    /// A requested range violates `0 <= start < end <= length`.
    InvalidRange { start: u64, end: u64, length: u64 },

    /// A listener's range of interest is not contained within the outer
    /// range it was registered against.
    InvalidListenerRange { inner: ByteRange, outer: ByteRange },

    /// A terminal `Gap` operation (`on_completion`/`on_failure`) was invoked
    /// on a gap that has already reached a terminal state.
    IllegalState(&'static str),

    /// A filler reported failure while producing its assigned range.
    FillerFailure(E),
}

impl<E: fmt::Debug> fmt::Display for TrackerError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRange { start, end, length } => {
                write!(
                    f,
                    "invalid range [{}, {}) for file of length {}",
                    start, end, length
                )
            }
            Self::InvalidListenerRange { inner, outer } => {
                write!(
                    f,
                    "listener range {} is not contained in outer range {}",
                    inner, outer
                )
            }
            Self::IllegalState(msg) => write!(f, "illegal tracker state: {}", msg),
            Self::FillerFailure(e) => write!(f, "filler failed: {:?}", e),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for TrackerError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::FillerFailure(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct BoomError;
    impl fmt::Display for BoomError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "boom")
        }
    }
    impl std::error::Error for BoomError {}

    #[test]
    fn display_messages_are_human_readable() {
        let e: TrackerError<BoomError> = TrackerError::InvalidRange {
            start: 5,
            end: 3,
            length: 10,
        };
        assert!(e.to_string().contains("[5, 3)"));
    }

    #[test]
    fn filler_failure_exposes_source() {
        use std::error::Error as _;
        let e = TrackerError::FillerFailure(BoomError);
        assert!(e.source().is_some());
    }
}
