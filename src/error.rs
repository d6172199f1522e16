//! Error kinds returned by every fallible public operation (§7).
//!
//! No caller-reachable path panics: bad offsets, bad ranges, and similar
//! misuse all come back as an [`EngineError`] instead of `unwrap()`/`panic!`.
//! `debug_assert!` is reserved for internal invariants that a caller cannot
//! violate (a corrupt rope built by our own code).

use thiserror::Error;

use crate::ids::RevisionId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("offset {offset} out of range (len {len})")]
    OffsetOutOfRange { offset: usize, len: usize },

    #[error("range {start}..{end} invalid (len {len})")]
    RangeInvalid {
        start: usize,
        end: usize,
        len: usize,
    },

    #[error("edits overlap or are out of order at offset {offset}")]
    EditsOverlap { offset: usize },

    #[error("offset {offset} does not fall on a UTF-8 character boundary")]
    InvalidUtf8 { offset: usize },

    #[error("nothing to undo")]
    NothingToUndo,

    #[error("nothing to redo")]
    NothingToRedo,

    #[error("snapshot {0:?} not found")]
    SnapshotNotFound(String),

    #[error("revision {0} not found")]
    RevisionNotFound(RevisionId),

    #[error("buffer is read-only")]
    ReadOnly,
}

pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_human_readable() {
        let e = EngineError::OffsetOutOfRange { offset: 5, len: 3 };
        assert_eq!(e.to_string(), "offset 5 out of range (len 3)");
    }
}
