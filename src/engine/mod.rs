//! The atomic façade composing [`Buffer`] + [`CursorSet`] + [`History`] +
//! [`Tracker`] behind one reader/writer lock (§4.7, §5).
//!
//! Every mutating call performs the façade's seven-step transaction:
//! validate read-only, capture pre-state, mutate the buffer, record a
//! tracked [`Change`], transform cursors, push an undo [`Command`], release
//! the lock. The engine's own lock is always acquired before the buffer's,
//! the tracker's, or the history's (§5's lock hierarchy) — those inner locks
//! are leaves taken only while the façade already holds its write guard.

mod config;

pub use config::EngineConfig;

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, SystemTime};

use parking_lot::RwLock;

use crate::buffer::{AppliedEdit, Buffer, LineEnding, Snapshot};
use crate::change::Change;
use crate::cursor::{CursorSet, EditSpan, Selection};
use crate::diff::{DiffOptions, LineDiff};
use crate::error::EngineError;
use crate::history::{AppliedEditCommand, Checkpoint, Command, CompoundCommand, History};
use crate::ids::{RevisionId, SnapshotId};
use crate::range::Range;
use crate::rope::{Point, PointUtf16, Rope};
use crate::tracker::{AiContext, AiContextOptions, Tracker};

struct EngineState {
    cursors: CursorSet,
}

/// Single embeddable entry point: one document, one multi-cursor set, one
/// undo/redo timeline, one change tracker, all reachable only through this
/// type's methods.
pub struct Engine {
    state: RwLock<EngineState>,
    buffer: Buffer,
    history: History,
    tracker: Tracker,
    read_only: AtomicBool,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let buffer = Buffer::new(&config.initial_content, config.line_ending, config.tab_width);
        Engine {
            state: RwLock::new(EngineState {
                cursors: CursorSet::new(),
            }),
            buffer,
            history: History::new(config.max_undo_entries),
            tracker: Tracker::new(config.max_changes, config.max_revisions),
            read_only: AtomicBool::new(config.read_only),
        }
    }

    /// Builds an engine from a raw byte stream: decodes it as UTF-8 (failing
    /// with [`EngineError::InvalidUtf8`] if it isn't), normalizes line
    /// endings per `config`, and proceeds as if constructed from the
    /// resulting string (§6.1).
    pub fn from_bytes(bytes: &[u8], mut config: EngineConfig) -> Result<Self, EngineError> {
        let text = String::from_utf8(bytes.to_vec()).map_err(|_| EngineError::InvalidUtf8 { offset: 0 })?;
        config.initial_content = text;
        Ok(Engine::new(config))
    }

    fn ensure_writable(&self) -> Result<(), EngineError> {
        if self.read_only.load(Ordering::Acquire) {
            Err(EngineError::ReadOnly)
        } else {
            Ok(())
        }
    }

    // ---- reads ----

    pub fn text(&self) -> String {
        self.buffer.text()
    }

    pub fn text_range(&self, range: Range) -> Result<String, EngineError> {
        self.buffer.text_range(range)
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn line_count(&self) -> usize {
        self.buffer.line_count()
    }

    pub fn line_text(&self, line: usize) -> Result<String, EngineError> {
        self.buffer.line_text(line)
    }

    pub fn line_len(&self, line: usize) -> Result<usize, EngineError> {
        self.buffer.line_len(line)
    }

    pub fn byte_at(&self, offset: usize) -> Result<u8, EngineError> {
        self.buffer.byte_at(offset)
    }

    pub fn rune_at(&self, offset: usize) -> Result<char, EngineError> {
        self.buffer.rune_at(offset)
    }

    pub fn offset_to_point(&self, offset: usize) -> Result<Point, EngineError> {
        self.buffer.offset_to_point(offset)
    }

    pub fn point_to_offset(&self, point: Point) -> Result<usize, EngineError> {
        self.buffer.point_to_offset(point)
    }

    pub fn offset_to_point_utf16(&self, offset: usize) -> Result<PointUtf16, EngineError> {
        self.buffer.offset_to_point_utf16(offset)
    }

    pub fn point_utf16_to_offset(&self, point: PointUtf16) -> Result<usize, EngineError> {
        self.buffer.point_utf16_to_offset(point)
    }

    pub fn line_start_offset(&self, line: usize) -> Result<usize, EngineError> {
        self.buffer.line_start_offset(line)
    }

    pub fn line_end_offset(&self, line: usize) -> Result<usize, EngineError> {
        self.buffer.line_end_offset(line)
    }

    pub fn revision_id(&self) -> RevisionId {
        self.buffer.revision_id()
    }

    pub fn tab_width(&self) -> u32 {
        self.buffer.tab_width()
    }

    pub fn set_tab_width(&self, width: u32) -> Result<(), EngineError> {
        self.ensure_writable()?;
        self.buffer.set_tab_width(width);
        Ok(())
    }

    pub fn line_ending(&self) -> LineEnding {
        self.buffer.line_ending()
    }

    pub fn set_line_ending(&self, ending: LineEnding) -> Result<(), EngineError> {
        self.ensure_writable()?;
        self.buffer.set_line_ending(ending);
        Ok(())
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only.load(Ordering::Acquire)
    }

    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::Release);
    }

    pub fn snapshot(&self) -> Snapshot {
        self.buffer.snapshot()
    }

    pub fn rope(&self) -> Rope {
        self.buffer.rope()
    }

    // ---- writes ----

    pub fn insert(&self, offset: usize, text: &str) -> Result<RevisionId, EngineError> {
        self.apply_single(Range::at(offset), text)
    }

    pub fn delete(&self, range: Range) -> Result<RevisionId, EngineError> {
        self.apply_single(range, "")
    }

    pub fn replace(&self, range: Range, text: &str) -> Result<RevisionId, EngineError> {
        self.apply_single(range, text)
    }

    pub fn apply_edit(&self, range: Range, text: &str) -> Result<RevisionId, EngineError> {
        self.apply_single(range, text)
    }

    /// The §4.7 transaction shared by `insert`/`delete`/`replace`/`apply_edit`:
    /// one buffer mutation, one tracked `Change`, one cursor transform, one
    /// undo entry.
    fn apply_single(&self, range: Range, text: &str) -> Result<RevisionId, EngineError> {
        self.ensure_writable()?;
        let mut state = self.state.write();
        let cursors_before = state.cursors.clone();
        let pre_rope = self.buffer.rope();
        let applied = self.buffer.apply_edit(range, text)?;

        let change = Change::new(
            applied.range,
            applied.old_text.clone(),
            applied.new_text.clone(),
            applied.revision,
        );
        self.tracker.record_change(applied.revision, change, pre_rope.clone());

        let span = EditSpan::new(applied.range, applied.new_text.len());
        let mut cursors_after = cursors_before.clone();
        cursors_after.transform(span);
        state.cursors = cursors_after.clone();

        let cmd = AppliedEditCommand::from_applied(pre_rope, &applied)
            .with_cursors(cursors_before, cursors_after);
        self.history.push(Command::AppliedEdit(cmd));

        Ok(applied.revision)
    }

    /// Applies every edit atomically (one revision for the whole batch, one
    /// compound undo entry), per `Buffer::apply_edits`'s descending,
    /// non-overlapping ordering requirement.
    pub fn apply_edits(&self, edits: &[(Range, String)]) -> Result<RevisionId, EngineError> {
        self.ensure_writable()?;
        if edits.is_empty() {
            return Ok(self.buffer.revision_id());
        }
        let mut state = self.state.write();
        let cursors_before = state.cursors.clone();
        let pre_rope = self.buffer.rope();
        let applied = self.buffer.apply_edits(edits)?;
        let revision = applied[0].revision;

        let changes: Vec<Change> = applied
            .iter()
            .map(|a| Change::new(a.range, a.old_text.clone(), a.new_text.clone(), a.revision))
            .collect();
        self.tracker.record_changes(revision, changes, pre_rope.clone());

        let spans: Vec<EditSpan> = applied
            .iter()
            .map(|a| EditSpan::new(a.range, a.new_text.len()))
            .collect();
        let mut cursors_after = cursors_before.clone();
        cursors_after.transform_multi(&spans);
        state.cursors = cursors_after.clone();

        let subcommands: Vec<Command> = applied
            .iter()
            .map(|a| Command::AppliedEdit(AppliedEditCommand::from_applied(pre_rope.clone(), a)))
            .collect();
        let compound = CompoundCommand::new(
            "batch edit",
            subcommands,
            Some((cursors_before, cursors_after)),
        );
        self.history.push(Command::Compound(compound));

        Ok(revision)
    }

    /// Runs `cmd.execute`, which owns cursor transformation internally
    /// (§4.7); the façade only records the edits it produced with the
    /// tracker and surfaces the revisions involved.
    pub fn execute(&self, cmd: Command) -> Result<Vec<RevisionId>, EngineError> {
        self.ensure_writable()?;
        let mut state = self.state.write();
        let records = self.history.execute(cmd, &self.buffer, &mut state.cursors)?;
        Ok(self.record_tracker(&records))
    }

    pub fn undo(&self) -> Result<Vec<RevisionId>, EngineError> {
        self.ensure_writable()?;
        let mut state = self.state.write();
        let records = self.history.undo(&self.buffer, &mut state.cursors)?;
        Ok(self.record_tracker(&records))
    }

    pub fn redo(&self) -> Result<Vec<RevisionId>, EngineError> {
        self.ensure_writable()?;
        let mut state = self.state.write();
        let records = self.history.redo(&self.buffer, &mut state.cursors)?;
        Ok(self.record_tracker(&records))
    }

    fn record_tracker(&self, records: &[crate::history::EditRecord]) -> Vec<RevisionId> {
        records
            .iter()
            .map(|r| {
                self.tracker
                    .record_change(r.revision, Change::from_record(r), r.pre_rope.clone());
                r.revision
            })
            .collect()
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn undo_count(&self) -> usize {
        self.history.undo_count()
    }

    pub fn redo_count(&self) -> usize {
        self.history.redo_count()
    }

    pub fn begin_undo_group(&self, name: impl Into<String>) -> Result<(), EngineError> {
        self.ensure_writable()?;
        self.history.begin_group(name);
        Ok(())
    }

    pub fn end_undo_group(&self) -> Result<(), EngineError> {
        self.ensure_writable()?;
        self.history.end_group();
        Ok(())
    }

    pub fn cancel_undo_group(&self) {
        self.history.cancel_group();
    }

    pub fn clear_history(&self) {
        self.history.clear();
    }

    /// Captures the undo stack's current depth (§4.4). Valid until eviction
    /// drops the undo stack below the depth it recorded.
    pub fn checkpoint(&self) -> Checkpoint {
        self.history.checkpoint()
    }

    /// Undoes repeatedly until the undo stack's depth is at or below
    /// `checkpoint`, or an undo fails. Each step goes through [`Self::undo`]
    /// so every intermediate edit still reaches the tracker.
    pub fn undo_to_checkpoint(&self, checkpoint: Checkpoint) -> Result<(), EngineError> {
        while self.history.undo_count() > checkpoint.depth() {
            self.undo()?;
        }
        Ok(())
    }

    /// Replaces the entire buffer content in one transaction, resetting
    /// cursors to a single one at offset 0. Reversible like any other edit.
    pub fn set_content(&self, content: &str) -> Result<RevisionId, EngineError> {
        self.ensure_writable()?;
        let mut state = self.state.write();
        let cursors_before = state.cursors.clone();
        let pre_rope = self.buffer.rope();
        let old_text = pre_rope.to_text();
        let revision = self.buffer.set_content(content);
        let new_text = self.buffer.text();

        let change = Change::new(
            Range::new(0, old_text.len()),
            old_text.clone(),
            new_text.clone(),
            revision,
        );
        self.tracker.record_change(revision, change, pre_rope.clone());

        let cursors_after = CursorSet::new();
        state.cursors = cursors_after.clone();

        let applied = AppliedEdit {
            range: Range::new(0, old_text.len()),
            old_text,
            new_range: Range::new(0, new_text.len()),
            new_text,
            revision,
        };
        let cmd = AppliedEditCommand::from_applied(pre_rope, &applied)
            .with_cursors(cursors_before, cursors_after);
        self.history.push(Command::AppliedEdit(cmd));

        Ok(revision)
    }

    /// Empties the buffer. Shorthand for `set_content("")`.
    pub fn clear(&self) -> Result<RevisionId, EngineError> {
        self.set_content("")
    }

    // ---- cursors ----

    pub fn cursors(&self) -> CursorSet {
        self.state.read().cursors.clone()
    }

    pub fn set_cursors(&self, mut cursors: CursorSet) {
        cursors.clamp(self.buffer.len());
        self.state.write().cursors = cursors;
    }

    pub fn primary_cursor(&self) -> usize {
        self.state.read().cursors.primary().head
    }

    pub fn primary_selection(&self) -> Selection {
        self.state.read().cursors.primary()
    }

    pub fn set_primary_cursor(&self, offset: usize) {
        let mut cs = CursorSet::new();
        cs.set(Selection::cursor(offset));
        self.set_cursors(cs);
    }

    pub fn set_primary_selection(&self, selection: Selection) {
        let mut cs = CursorSet::new();
        cs.set(selection);
        self.set_cursors(cs);
    }

    pub fn cursor_count(&self) -> usize {
        self.state.read().cursors.len()
    }

    pub fn has_multiple_cursors(&self) -> bool {
        self.cursor_count() > 1
    }

    pub fn add_cursor(&self, offset: usize) {
        self.state.write().cursors.add(Selection::cursor(offset));
    }

    pub fn add_selection(&self, selection: Selection) {
        self.state.write().cursors.add(selection);
    }

    pub fn clear_secondary(&self) {
        self.state.write().cursors.clear();
    }

    pub fn clamp_cursors(&self) {
        let len = self.buffer.len();
        self.state.write().cursors.clamp(len);
    }

    // ---- tracking ----

    pub fn create_snapshot(&self, name: impl Into<String>) -> SnapshotId {
        self.tracker
            .create_snapshot(name, self.buffer.rope(), self.buffer.revision_id())
    }

    pub fn get_snapshot(&self, id: SnapshotId) -> Result<Snapshot, EngineError> {
        self.tracker.get_snapshot(id)
    }

    pub fn get_snapshot_by_name(&self, name: &str) -> Result<Snapshot, EngineError> {
        self.tracker.get_snapshot_by_name(name)
    }

    pub fn get_snapshot_text(&self, id: SnapshotId) -> Result<String, EngineError> {
        Ok(self.tracker.get_snapshot(id)?.rope.to_text())
    }

    pub fn delete_snapshot(&self, id: SnapshotId) -> Result<(), EngineError> {
        self.tracker.delete_snapshot(id)
    }

    pub fn delete_snapshot_by_name(&self, name: &str) -> Result<(), EngineError> {
        self.tracker.delete_snapshot_by_name(name)
    }

    pub fn list_snapshots(&self) -> Vec<(SnapshotId, String, Snapshot)> {
        self.tracker.list_snapshots()
    }

    pub fn snapshot_count(&self) -> usize {
        self.tracker.snapshot_count()
    }

    pub fn prune_snapshots_older_than(&self, age: Duration, now: SystemTime) {
        self.tracker.prune_snapshots_older_than(age, now);
    }

    pub fn prune_snapshots_keep_n(&self, n: usize) {
        self.tracker.prune_snapshots_keep_n(n);
    }

    pub fn changes_since(&self, since: RevisionId) -> Vec<Change> {
        self.tracker.changes_since(since)
    }

    pub fn changes_since_with_limit(&self, since: RevisionId, limit: usize) -> Vec<Change> {
        self.tracker.changes_since_with_limit(since, limit)
    }

    pub fn changes_between(&self, from: RevisionId, to: RevisionId) -> Vec<Change> {
        self.tracker.changes_between(from, to)
    }

    pub fn latest_changes(&self, n: usize) -> Vec<Change> {
        self.tracker.latest_changes(n)
    }

    pub fn change_count(&self) -> usize {
        self.tracker.change_count()
    }

    pub fn diff_since_snapshot(&self, id: SnapshotId) -> Result<Vec<Change>, EngineError> {
        self.tracker.diff_since_snapshot(id)
    }

    pub fn compute_diff_since_snapshot(
        &self,
        id: SnapshotId,
        opts: DiffOptions,
    ) -> Result<LineDiff, EngineError> {
        self.tracker
            .compute_diff_since_snapshot(id, &self.buffer.rope(), opts)
    }

    pub fn compute_diff_between_snapshots(
        &self,
        from: SnapshotId,
        to: SnapshotId,
        opts: DiffOptions,
    ) -> Result<LineDiff, EngineError> {
        self.tracker.compute_diff_between_snapshots(from, to, opts)
    }

    pub fn get_ai_context(&self, opts: AiContextOptions) -> AiContext {
        self.tracker.get_ai_context(&self.buffer.rope(), opts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::{DeleteCommand, DeleteDirection, InsertCommand};

    fn engine_with(content: &str) -> Engine {
        Engine::new(EngineConfig {
            initial_content: content.to_string(),
            ..EngineConfig::default()
        })
    }

    #[test]
    fn insert_then_undo_then_redo() {
        let engine = engine_with("");
        let before = engine.revision_id();
        engine.insert(0, "Hello").unwrap();
        assert_eq!(engine.text(), "Hello");
        assert_eq!(engine.len(), 5);
        assert!(engine.revision_id() > before);
        engine.undo().unwrap();
        assert_eq!(engine.text(), "");
        engine.redo().unwrap();
        assert_eq!(engine.text(), "Hello");
    }

    #[test]
    fn multi_cursor_typing_via_execute() {
        let engine = engine_with("aa bb cc");
        engine.set_cursors({
            let mut cs = CursorSet::new();
            cs.set_all(vec![
                Selection::cursor(2),
                Selection::cursor(5),
                Selection::cursor(8),
            ]);
            cs
        });
        engine.execute(Command::Insert(InsertCommand::new("!"))).unwrap();
        assert_eq!(engine.text(), "aa! bb! cc!");
        assert_eq!(
            engine.cursors().all(),
            vec![
                Selection::cursor(3),
                Selection::cursor(7),
                Selection::cursor(11)
            ]
        );
        engine.undo().unwrap();
        assert_eq!(engine.text(), "aa bb cc");
    }

    #[test]
    fn batch_edits_apply_as_one_revision() {
        let engine = engine_with("foo bar baz");
        let before = engine.revision_id();
        let revision = engine
            .apply_edits(&[
                (Range::new(8, 11), "qux".to_string()),
                (Range::new(4, 7), "XYZ".to_string()),
                (Range::new(0, 3), "ABC".to_string()),
            ])
            .unwrap();
        assert_eq!(engine.text(), "ABC XYZ qux");
        assert!(revision > before);
        assert_eq!(engine.revision_id(), revision);
        engine.undo().unwrap();
        assert_eq!(engine.text(), "foo bar baz");
    }

    #[test]
    fn utf8_boundary_point_conversions() {
        let engine = engine_with("a\u{1F600}b"); // 'a' + 4-byte emoji (2 UTF-16 units) + 'b'
        let p = engine.offset_to_point_utf16(1).unwrap();
        assert_eq!(p.column, 1); // start of the emoji
        let p_end = engine.offset_to_point_utf16(engine.len()).unwrap();
        assert_eq!(p_end.column, 1 + 2 + 1); // past 'a', the surrogate pair, and 'b'
    }

    #[test]
    fn snapshot_diff_reports_single_hunk() {
        let engine = engine_with("line 1\nline 2");
        let id = engine.create_snapshot("before");
        engine.replace(Range::new(7, 13), "modified").unwrap();
        let diff = engine
            .compute_diff_since_snapshot(id, DiffOptions {
                context_lines: 1,
                ..DiffOptions::default()
            })
            .unwrap();
        assert_eq!(diff.hunks.len(), 1);
    }

    #[test]
    fn undo_group_flushes_as_one_entry() {
        let engine = engine_with("");
        engine.begin_undo_group("format").unwrap();
        engine.insert(0, "Hello").unwrap();
        engine.insert(5, " World").unwrap();
        engine.end_undo_group().unwrap();
        assert_eq!(engine.undo_count(), 1);
        assert_eq!(engine.text(), "Hello World");
        engine.undo().unwrap();
        assert_eq!(engine.text(), "");
        engine.redo().unwrap();
        assert_eq!(engine.text(), "Hello World");
    }

    #[test]
    fn read_only_engine_rejects_mutations() {
        let engine = Engine::new(EngineConfig {
            read_only: true,
            ..EngineConfig::default()
        });
        assert!(matches!(engine.insert(0, "x"), Err(EngineError::ReadOnly)));
        assert!(matches!(
            engine.set_tab_width(8),
            Err(EngineError::ReadOnly)
        ));
        assert!(matches!(
            engine.set_line_ending(LineEnding::Crlf),
            Err(EngineError::ReadOnly)
        ));
    }

    #[test]
    fn delete_forward_via_execute() {
        let engine = engine_with("abc");
        engine.set_primary_cursor(0);
        engine.execute(Command::Delete(DeleteCommand::new(DeleteDirection::Forward))).unwrap();
        assert_eq!(engine.text(), "bc");
    }

    #[test]
    fn set_content_resets_cursors_and_is_undoable() {
        let engine = engine_with("old");
        engine.set_primary_cursor(3);
        engine.set_content("new content").unwrap();
        assert_eq!(engine.text(), "new content");
        assert_eq!(engine.primary_cursor(), 0);
        engine.undo().unwrap();
        assert_eq!(engine.text(), "old");
    }

    #[test]
    fn undo_to_checkpoint_reverts_and_still_tracks_changes() {
        let engine = engine_with("");
        engine.insert(0, "a").unwrap();
        let cp = engine.checkpoint();
        engine.insert(1, "b").unwrap();
        engine.insert(2, "c").unwrap();
        let before_count = engine.change_count();
        engine.undo_to_checkpoint(cp).unwrap();
        assert_eq!(engine.text(), "a");
        assert!(engine.change_count() > before_count);
    }

    #[test]
    fn ai_context_reflects_recorded_changes() {
        let engine = engine_with("");
        engine.insert(0, "hello").unwrap();
        let ctx = engine.get_ai_context(AiContextOptions::default());
        assert_eq!(ctx.changes.len(), 1);
    }
}
