//! Process-wide monotonic ID generators for revisions and snapshots (§3,
//! SPEC_FULL A.5). Both are thin `u64` newtypes minted from their own
//! `AtomicU64`, so uniqueness holds even across multiple `Engine` instances
//! in the same process — intentional, per §5.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_REVISION: AtomicU64 = AtomicU64::new(1);
static NEXT_SNAPSHOT: AtomicU64 = AtomicU64::new(1);

/// A total-ordered identifier of a buffer state, issued on every successful
/// write. Zero is reserved to mean "no revision".
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RevisionId(u64);

impl RevisionId {
    pub const NONE: RevisionId = RevisionId(0);

    pub(crate) fn next() -> Self {
        RevisionId(NEXT_REVISION.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }

    pub fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for RevisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a named snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SnapshotId(u64);

impl SnapshotId {
    pub(crate) fn next() -> Self {
        SnapshotId(NEXT_SNAPSHOT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revision_ids_are_strictly_increasing() {
        let a = RevisionId::next();
        let b = RevisionId::next();
        assert!(b > a);
    }

    #[test]
    fn snapshot_ids_are_strictly_increasing() {
        let a = SnapshotId::next();
        let b = SnapshotId::next();
        assert!(b > a);
    }
}
