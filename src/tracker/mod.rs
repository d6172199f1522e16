//! Bounded history of recorded [`Change`]s plus named, immutable
//! [`Snapshot`]s, and the AI-context digest built on top of both (§4.5).

mod snapshot_manager;

pub use snapshot_manager::SnapshotManager;

use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::trace;

use crate::buffer::Snapshot;
use crate::change::Change;
use crate::error::EngineError;
use crate::ids::{RevisionId, SnapshotId};
use crate::rope::Rope;

const DEFAULT_MAX_CHANGES: usize = 10_000;
const DEFAULT_MAX_REVISIONS: usize = 100;

/// The changes and a textual summary produced for an AI-consumable context
/// window, optionally paired with a line diff (§4.5 `get_ai_context`).
#[derive(Clone, Debug)]
pub struct AiContext {
    pub changes: Vec<Change>,
    pub summary: String,
    pub diff: Option<String>,
}

struct ChangeEntry {
    revision: RevisionId,
    change: Change,
}

struct TrackerState {
    changes: VecDeque<ChangeEntry>,
    /// Pre-edit rope captured at each revision, oldest (lowest ID) evicted
    /// first once `max_revisions` is exceeded.
    revisions: BTreeMap<RevisionId, Rope>,
}

/// Fixed-capacity ring buffer of changes, a bounded revision→pre-edit-rope
/// map, and a [`SnapshotManager`]. All three share one mutex; snapshot ropes
/// are immutable, so callers can drop the lock immediately after cloning one
/// out (§4.5 concurrency note).
pub struct Tracker {
    state: Mutex<TrackerState>,
    snapshots: SnapshotManager,
    max_changes: usize,
    max_revisions: usize,
}

impl Tracker {
    pub fn new(max_changes: usize, max_revisions: usize) -> Self {
        Tracker {
            state: Mutex::new(TrackerState {
                changes: VecDeque::new(),
                revisions: BTreeMap::new(),
            }),
            snapshots: SnapshotManager::new(),
            max_changes,
            max_revisions,
        }
    }

    /// Records one change at `revision`, evicting the oldest change past
    /// `max_changes` and the lowest revision past `max_revisions`.
    pub fn record_change(&self, revision: RevisionId, change: Change, pre_rope: Rope) {
        self.record_changes(revision, vec![change], pre_rope);
    }

    /// Atomically records every change in `changes` as produced by a single
    /// revision, with one shared pre-edit rope snapshot (§4.7 step 4, batch
    /// variant).
    pub fn record_changes(&self, revision: RevisionId, changes: Vec<Change>, pre_rope: Rope) {
        let mut state = self.state.lock();
        debug_assert!(
            state
                .revisions
                .keys()
                .next_back()
                .is_none_or(|&last| revision >= last),
            "revision IDs must be assigned monotonically"
        );
        for change in changes {
            state.changes.push_back(ChangeEntry { revision, change });
            while state.changes.len() > self.max_changes {
                state.changes.pop_front();
                trace!("tracker dropped oldest change past max_changes");
            }
        }
        state.revisions.insert(revision, pre_rope);
        while state.revisions.len() > self.max_revisions {
            let lowest = *state.revisions.keys().next().unwrap();
            state.revisions.remove(&lowest);
            trace!(%lowest, "tracker evicted oldest revision past max_revisions");
        }
    }

    /// Every recorded change with `revision > since`, oldest first.
    pub fn changes_since(&self, since: RevisionId) -> Vec<Change> {
        let state = self.state.lock();
        state
            .changes
            .iter()
            .filter(|e| e.revision > since)
            .map(|e| e.change.clone())
            .collect()
    }

    pub fn changes_since_with_limit(&self, since: RevisionId, limit: usize) -> Vec<Change> {
        let mut out = self.changes_since(since);
        out.truncate(limit);
        out
    }

    pub fn changes_between(&self, from: RevisionId, to: RevisionId) -> Vec<Change> {
        let state = self.state.lock();
        state
            .changes
            .iter()
            .filter(|e| e.revision > from && e.revision <= to)
            .map(|e| e.change.clone())
            .collect()
    }

    pub fn latest_changes(&self, n: usize) -> Vec<Change> {
        let state = self.state.lock();
        let len = state.changes.len();
        state
            .changes
            .iter()
            .skip(len.saturating_sub(n))
            .map(|e| e.change.clone())
            .collect()
    }

    pub fn change_count(&self) -> usize {
        self.state.lock().changes.len()
    }

    /// The pre-edit rope recorded for `revision`, if it hasn't been evicted.
    pub fn rope_at_revision(&self, revision: RevisionId) -> Result<Rope, EngineError> {
        self.state
            .lock()
            .revisions
            .get(&revision)
            .cloned()
            .ok_or(EngineError::RevisionNotFound(revision))
    }

    // ---- snapshots ----

    pub fn create_snapshot(&self, name: impl Into<String>, rope: Rope, revision: RevisionId) -> SnapshotId {
        self.snapshots.create(name, rope, revision)
    }

    pub fn get_snapshot(&self, id: SnapshotId) -> Result<Snapshot, EngineError> {
        self.snapshots.by_id(id)
    }

    pub fn get_snapshot_by_name(&self, name: &str) -> Result<Snapshot, EngineError> {
        self.snapshots.by_name(name)
    }

    pub fn delete_snapshot(&self, id: SnapshotId) -> Result<(), EngineError> {
        self.snapshots.delete(id)
    }

    pub fn delete_snapshot_by_name(&self, name: &str) -> Result<(), EngineError> {
        self.snapshots.delete_by_name(name)
    }

    pub fn list_snapshots(&self) -> Vec<(SnapshotId, String, Snapshot)> {
        self.snapshots.list()
    }

    pub fn snapshot_count(&self) -> usize {
        self.snapshots.len()
    }

    pub fn prune_snapshots_older_than(&self, age: Duration, now: std::time::SystemTime) {
        self.snapshots.prune_older_than(age, now);
    }

    pub fn prune_snapshots_keep_n(&self, n: usize) {
        self.snapshots.prune_keep_n(n);
    }

    /// Raw change list since the revision `id`'s snapshot was taken.
    pub fn diff_since_snapshot(&self, id: SnapshotId) -> Result<Vec<Change>, EngineError> {
        let snap = self.snapshots.by_id(id)?;
        Ok(self.changes_since(snap.revision))
    }

    /// Computes a line diff between a snapshot and the current rope.
    pub fn compute_diff_since_snapshot(
        &self,
        id: SnapshotId,
        current: &Rope,
        opts: crate::diff::DiffOptions,
    ) -> Result<crate::diff::LineDiff, EngineError> {
        let snap = self.snapshots.by_id(id)?;
        Ok(crate::diff::diff_ropes(&snap.rope, current, opts))
    }

    pub fn compute_diff_between_snapshots(
        &self,
        a: SnapshotId,
        b: SnapshotId,
        opts: crate::diff::DiffOptions,
    ) -> Result<crate::diff::LineDiff, EngineError> {
        let snap_a = self.snapshots.by_id(a)?;
        let snap_b = self.snapshots.by_id(b)?;
        Ok(crate::diff::diff_ropes(&snap_a.rope, &snap_b.rope, opts))
    }

    /// Builds an AI-consumable digest: the raw changes since `current`'s
    /// revision diverged from the tracker's oldest retained state, a
    /// one-line-per-change textual summary, and (if `opts.include_diff`)
    /// a unified diff against the oldest change's pre-edit rope.
    pub fn get_ai_context(
        &self,
        current: &Rope,
        opts: AiContextOptions,
    ) -> AiContext {
        let state = self.state.lock();
        let changes: Vec<Change> = state
            .changes
            .iter()
            .rev()
            .take(opts.max_changes)
            .map(|e| e.change.clone())
            .rev()
            .collect();
        drop(state);
        self.build_ai_context(changes, current, opts)
    }

    fn build_ai_context(&self, changes: Vec<Change>, current: &Rope, opts: AiContextOptions) -> AiContext {
        let summary = summarize_changes(&changes);
        let diff = if opts.include_diff {
            changes.first().map(|first| {
                let pre = self
                    .rope_at_revision(first.revision)
                    .unwrap_or_else(|_| current.clone());
                let line_diff = crate::diff::diff_ropes(&pre, current, opts.diff_options);
                crate::diff::unified_diff(&line_diff, "before", "after")
            })
        } else {
            None
        };
        AiContext {
            changes,
            summary,
            diff,
        }
    }
}

/// Options controlling [`Tracker::get_ai_context`]'s scope and whether a
/// unified diff is computed alongside the change summary.
#[derive(Clone, Copy, Debug)]
pub struct AiContextOptions {
    pub max_changes: usize,
    pub include_diff: bool,
    pub diff_options: crate::diff::DiffOptions,
}

impl Default for AiContextOptions {
    fn default() -> Self {
        AiContextOptions {
            max_changes: 50,
            include_diff: true,
            diff_options: crate::diff::DiffOptions::default(),
        }
    }
}

fn summarize_changes(changes: &[Change]) -> String {
    if changes.is_empty() {
        return "no changes recorded".to_string();
    }
    let inserted: usize = changes.iter().map(|c| c.new_text.len()).sum();
    let deleted: usize = changes.iter().map(|c| c.old_text.len()).sum();
    format!(
        "{} change(s): +{} / -{} bytes across revisions {}..={}",
        changes.len(),
        inserted,
        deleted,
        changes.first().map(|c| c.revision).unwrap_or(RevisionId::NONE),
        changes.last().map(|c| c.revision).unwrap_or(RevisionId::NONE),
    )
}

impl Default for Tracker {
    fn default() -> Self {
        Tracker::new(DEFAULT_MAX_CHANGES, DEFAULT_MAX_REVISIONS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::ChangeKind;
    use crate::range::Range;

    fn change(revision: RevisionId, text: &str) -> Change {
        Change {
            kind: ChangeKind::Insert,
            range: Range::at(0),
            new_range: Range::new(0, text.len()),
            old_text: String::new(),
            new_text: text.to_string(),
            revision,
        }
    }

    #[test]
    fn changes_since_filters_by_revision() {
        let tracker = Tracker::new(100, 10);
        let r1 = RevisionId::next();
        let r2 = RevisionId::next();
        tracker.record_change(r1, change(r1, "a"), Rope::new());
        tracker.record_change(r2, change(r2, "b"), Rope::new());
        assert_eq!(tracker.changes_since(r1).len(), 1);
        assert_eq!(tracker.changes_since(RevisionId::NONE).len(), 2);
    }

    #[test]
    fn ring_buffer_evicts_oldest_changes() {
        let tracker = Tracker::new(2, 100);
        for _ in 0..5 {
            let r = RevisionId::next();
            tracker.record_change(r, change(r, "x"), Rope::new());
        }
        assert_eq!(tracker.change_count(), 2);
    }

    #[test]
    fn revision_map_evicts_lowest_id_first() {
        let tracker = Tracker::new(100, 2);
        let mut revisions = Vec::new();
        for _ in 0..5 {
            let r = RevisionId::next();
            revisions.push(r);
            tracker.record_change(r, change(r, "x"), Rope::new());
        }
        assert!(tracker.rope_at_revision(revisions[0]).is_err());
        assert!(tracker.rope_at_revision(*revisions.last().unwrap()).is_ok());
    }

    #[test]
    fn snapshot_diff_reflects_changes_since_creation() {
        let tracker = Tracker::new(100, 100);
        let rope = Rope::from_str("line 1\nline 2");
        let r0 = RevisionId::next();
        let id = tracker.create_snapshot("before", rope.clone(), r0);
        let r1 = RevisionId::next();
        tracker.record_change(r1, change(r1, "modified"), rope);
        let since = tracker.diff_since_snapshot(id).unwrap();
        assert_eq!(since.len(), 1);
    }

    #[test]
    fn ai_context_summarizes_recent_changes() {
        let tracker = Tracker::new(100, 100);
        let r1 = RevisionId::next();
        tracker.record_change(r1, change(r1, "hello"), Rope::new());
        let ctx = tracker.get_ai_context(
            &Rope::from_str("hello"),
            AiContextOptions {
                max_changes: 10,
                include_diff: false,
                diff_options: Default::default(),
            },
        );
        assert_eq!(ctx.changes.len(), 1);
        assert!(ctx.summary.contains('1'));
        assert!(ctx.diff.is_none());
    }
}
