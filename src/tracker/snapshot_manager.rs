//! ID- and name-indexed store of immutable [`Snapshot`]s (§3, §4.5).

use std::collections::HashMap;
use std::time::{Duration, SystemTime};

use parking_lot::Mutex;
use tracing::trace;

use crate::buffer::Snapshot;
use crate::error::EngineError;
use crate::ids::{RevisionId, SnapshotId};
use crate::rope::Rope;

struct Entry {
    name: String,
    snapshot: Snapshot,
    created_at: SystemTime,
}

struct State {
    by_id: HashMap<SnapshotId, Entry>,
    /// Name → currently-live ID. Creating a snapshot under a name already in
    /// use retires the old ID (it becomes unreachable by name, but a caller
    /// still holding the old `SnapshotId` can look it up by ID until it's
    /// explicitly deleted or pruned).
    by_name: HashMap<String, SnapshotId>,
}

/// Maps [`SnapshotId`]s and names to immutable [`Snapshot`] handles sharing
/// rope structure with whatever buffer state produced them.
pub struct SnapshotManager {
    state: Mutex<State>,
}

impl SnapshotManager {
    pub fn new() -> Self {
        SnapshotManager {
            state: Mutex::new(State {
                by_id: HashMap::new(),
                by_name: HashMap::new(),
            }),
        }
    }

    pub fn create(&self, name: impl Into<String>, rope: Rope, revision: RevisionId) -> SnapshotId {
        let name = name.into();
        let id = SnapshotId::next();
        let snapshot = Snapshot {
            rope,
            revision,
            line_ending: crate::buffer::LineEnding::default(),
            tab_width: 4,
        };
        let mut state = self.state.lock();
        if let Some(old_id) = state.by_name.insert(name.clone(), id) {
            trace!(?old_id, %name, "snapshot name replaced, old id now unreachable by name");
        }
        state.by_id.insert(
            id,
            Entry {
                name,
                snapshot,
                created_at: SystemTime::now(),
            },
        );
        id
    }

    /// As [`SnapshotManager::create`], but preserving the caller's full
    /// [`Snapshot`] (line ending / tab width) rather than defaulting them.
    pub fn create_from_snapshot(&self, name: impl Into<String>, snapshot: Snapshot) -> SnapshotId {
        let name = name.into();
        let id = SnapshotId::next();
        let mut state = self.state.lock();
        state.by_name.insert(name.clone(), id);
        state.by_id.insert(
            id,
            Entry {
                name,
                snapshot,
                created_at: SystemTime::now(),
            },
        );
        id
    }

    pub fn by_id(&self, id: SnapshotId) -> Result<Snapshot, EngineError> {
        self.state
            .lock()
            .by_id
            .get(&id)
            .map(|e| e.snapshot.clone())
            .ok_or_else(|| EngineError::SnapshotNotFound(id.to_string()))
    }

    pub fn by_name(&self, name: &str) -> Result<Snapshot, EngineError> {
        let state = self.state.lock();
        let id = state
            .by_name
            .get(name)
            .ok_or_else(|| EngineError::SnapshotNotFound(name.to_string()))?;
        state
            .by_id
            .get(id)
            .map(|e| e.snapshot.clone())
            .ok_or_else(|| EngineError::SnapshotNotFound(name.to_string()))
    }

    pub fn delete(&self, id: SnapshotId) -> Result<(), EngineError> {
        let mut state = self.state.lock();
        let entry = state
            .by_id
            .remove(&id)
            .ok_or_else(|| EngineError::SnapshotNotFound(id.to_string()))?;
        if state.by_name.get(&entry.name) == Some(&id) {
            state.by_name.remove(&entry.name);
        }
        Ok(())
    }

    pub fn delete_by_name(&self, name: &str) -> Result<(), EngineError> {
        let id = {
            let state = self.state.lock();
            *state
                .by_name
                .get(name)
                .ok_or_else(|| EngineError::SnapshotNotFound(name.to_string()))?
        };
        self.delete(id)
    }

    /// All snapshots, oldest-first by creation time.
    pub fn list(&self) -> Vec<(SnapshotId, String, Snapshot)> {
        let state = self.state.lock();
        let mut entries: Vec<(SnapshotId, &Entry)> = state.by_id.iter().map(|(id, e)| (*id, e)).collect();
        entries.sort_by_key(|(_, e)| e.created_at);
        entries
            .into_iter()
            .map(|(id, e)| (id, e.name.clone(), e.snapshot.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.state.lock().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deletes every snapshot created more than `age` before `now`.
    pub fn prune_older_than(&self, age: Duration, now: SystemTime) {
        let to_delete: Vec<SnapshotId> = {
            let state = self.state.lock();
            state
                .by_id
                .iter()
                .filter(|(_, e)| now.duration_since(e.created_at).unwrap_or_default() > age)
                .map(|(id, _)| *id)
                .collect()
        };
        for id in to_delete {
            let _ = self.delete(id);
        }
    }

    /// Keeps only the `n` most recently created snapshots, deleting the rest.
    pub fn prune_keep_n(&self, n: usize) {
        let mut entries = self.list();
        if entries.len() <= n {
            return;
        }
        entries.sort_by_key(|_| 0); // list() is already oldest-first
        let to_delete = entries.len() - n;
        for (id, _, _) in entries.into_iter().take(to_delete) {
            let _ = self.delete(id);
        }
    }
}

impl Default for SnapshotManager {
    fn default() -> Self {
        SnapshotManager::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_and_lookup_by_id_and_name() {
        let mgr = SnapshotManager::new();
        let id = mgr.create("before", Rope::from_str("hi"), RevisionId::next());
        assert_eq!(mgr.by_id(id).unwrap().rope.to_text(), "hi");
        assert_eq!(mgr.by_name("before").unwrap().rope.to_text(), "hi");
    }

    #[test]
    fn recreating_name_replaces_old_snapshot() {
        let mgr = SnapshotManager::new();
        let old_id = mgr.create("x", Rope::from_str("one"), RevisionId::next());
        let new_id = mgr.create("x", Rope::from_str("two"), RevisionId::next());
        assert_eq!(mgr.by_name("x").unwrap().rope.to_text(), "two");
        // old id is still independently dereferenceable until deleted.
        assert_eq!(mgr.by_id(old_id).unwrap().rope.to_text(), "one");
        assert_ne!(old_id, new_id);
    }

    #[test]
    fn delete_removes_from_both_indexes() {
        let mgr = SnapshotManager::new();
        let id = mgr.create("x", Rope::from_str("one"), RevisionId::next());
        mgr.delete(id).unwrap();
        assert!(mgr.by_id(id).is_err());
        assert!(mgr.by_name("x").is_err());
    }

    #[test]
    fn list_is_oldest_first() {
        let mgr = SnapshotManager::new();
        mgr.create("a", Rope::new(), RevisionId::next());
        mgr.create("b", Rope::new(), RevisionId::next());
        let list = mgr.list();
        assert_eq!(list[0].1, "a");
        assert_eq!(list[1].1, "b");
    }

    #[test]
    fn prune_keep_n_drops_oldest() {
        let mgr = SnapshotManager::new();
        for name in ["a", "b", "c"] {
            mgr.create(name, Rope::new(), RevisionId::next());
        }
        mgr.prune_keep_n(1);
        assert_eq!(mgr.len(), 1);
        assert!(mgr.by_name("c").is_ok());
    }
}
