//! Undo/redo stacks of [`Command`]s, with nestable-looking (but flat, per
//! §9) grouping and depth-based checkpoints (§4.4).

pub mod command;

pub use command::{
    AppliedEditCommand, Command, CompoundCommand, DeleteCommand, DeleteDirection, EditRecord,
    InsertCommand, ReplaceCommand,
};

use std::collections::VecDeque;
use std::time::SystemTime;

use parking_lot::Mutex;
use tracing::debug;

use crate::buffer::Buffer;
use crate::cursor::CursorSet;
use crate::error::EngineError;

struct Entry {
    command: Command,
    #[allow(dead_code)]
    timestamp: SystemTime,
}

struct GroupState {
    name: String,
    pending: Vec<Command>,
}

struct HistoryState {
    undo_stack: VecDeque<Entry>,
    redo_stack: Vec<Entry>,
    group: Option<GroupState>,
}

/// An opaque undo-depth marker. Valid for [`History::undo_to_checkpoint`] as
/// long as eviction hasn't dropped below the depth it captured; crossing
/// that boundary makes it unrecoverable (documented limitation, §4.4).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Checkpoint(usize);

impl Checkpoint {
    /// The undo stack depth this checkpoint captured.
    pub fn depth(&self) -> usize {
        self.0
    }
}

/// Bounded undo/redo history. Its internal lock is released while a
/// command's `execute`/`undo` runs against the buffer and cursor set, and
/// re-acquired only to update the stacks (§4.4, §5 leaf-lock rule).
pub struct History {
    inner: Mutex<HistoryState>,
    max_entries: usize,
}

impl History {
    pub fn new(max_entries: usize) -> Self {
        History {
            inner: Mutex::new(HistoryState {
                undo_stack: VecDeque::new(),
                redo_stack: Vec::new(),
                group: None,
            }),
            max_entries,
        }
    }

    /// Runs `command.execute`, and on success pushes it onto the undo
    /// stack (or the active group's stash). On failure neither the command
    /// nor the history is touched. Returns the edits the command produced,
    /// for the engine façade to feed to the tracker.
    pub fn execute(
        &self,
        mut command: Command,
        buffer: &Buffer,
        cursors: &mut CursorSet,
    ) -> Result<Vec<EditRecord>, EngineError> {
        let records = command.execute(buffer, cursors)?;
        self.push(command);
        Ok(records)
    }

    /// Appends an already-executed command to the current group (if any)
    /// or the undo stack, evicting the oldest entry past `max_entries` and
    /// clearing the redo stack.
    pub fn push(&self, command: Command) {
        let mut state = self.inner.lock();
        if let Some(group) = state.group.as_mut() {
            group.pending.push(command);
            return;
        }
        state.redo_stack.clear();
        state.undo_stack.push_back(Entry {
            command,
            timestamp: SystemTime::now(),
        });
        while state.undo_stack.len() > self.max_entries {
            state.undo_stack.pop_front();
            debug!("history entry evicted past max_entries");
        }
    }

    pub fn undo(
        &self,
        buffer: &Buffer,
        cursors: &mut CursorSet,
    ) -> Result<Vec<EditRecord>, EngineError> {
        let mut entry = {
            let mut state = self.inner.lock();
            state.undo_stack.pop_back().ok_or(EngineError::NothingToUndo)?
        };
        match entry.command.undo(buffer, cursors) {
            Ok(records) => {
                self.inner.lock().redo_stack.push(entry);
                Ok(records)
            }
            Err(err) => {
                entry.timestamp = SystemTime::now();
                self.inner.lock().undo_stack.push_back(entry);
                Err(err)
            }
        }
    }

    pub fn redo(
        &self,
        buffer: &Buffer,
        cursors: &mut CursorSet,
    ) -> Result<Vec<EditRecord>, EngineError> {
        let mut entry = {
            let mut state = self.inner.lock();
            state.redo_stack.pop().ok_or(EngineError::NothingToRedo)?
        };
        match entry.command.execute(buffer, cursors) {
            Ok(records) => {
                self.inner.lock().undo_stack.push_back(entry);
                Ok(records)
            }
            Err(err) => {
                self.inner.lock().redo_stack.push(entry);
                Err(err)
            }
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.inner.lock().undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.inner.lock().redo_stack.is_empty()
    }

    pub fn undo_count(&self) -> usize {
        self.inner.lock().undo_stack.len()
    }

    pub fn redo_count(&self) -> usize {
        self.inner.lock().redo_stack.len()
    }

    /// Begins a named group. Nested calls are ignored (grouping is flat,
    /// per §9): a `begin_group` while one is already active is a no-op.
    pub fn begin_group(&self, name: impl Into<String>) {
        let mut state = self.inner.lock();
        if state.group.is_some() {
            return;
        }
        state.group = Some(GroupState {
            name: name.into(),
            pending: Vec::new(),
        });
    }

    /// Flushes the active group's pending commands as a single
    /// [`CompoundCommand`] onto the undo stack, or is a no-op if nothing
    /// was pending. No-op if no group is active.
    pub fn end_group(&self) {
        let flushed = {
            let mut state = self.inner.lock();
            state.group.take()
        };
        let Some(group) = flushed else { return };
        if group.pending.is_empty() {
            return;
        }
        let compound = CompoundCommand::from_subcommands(group.name, group.pending);
        let mut state = self.inner.lock();
        state.redo_stack.clear();
        state.undo_stack.push_back(Entry {
            command: Command::Compound(compound),
            timestamp: SystemTime::now(),
        });
        while state.undo_stack.len() > self.max_entries {
            state.undo_stack.pop_front();
        }
    }

    /// Discards the active group's pending commands without reverting
    /// their buffer side effects (§9 chosen resolution (a): callers must
    /// not cancel once a sub-command has already mutated the buffer unless
    /// they're prepared to compensate themselves).
    pub fn cancel_group(&self) {
        self.inner.lock().group = None;
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint(self.inner.lock().undo_stack.len())
    }

    /// Undoes repeatedly until the undo stack's depth is at or below the
    /// checkpoint's, or an undo fails.
    pub fn undo_to_checkpoint(
        &self,
        checkpoint: Checkpoint,
        buffer: &Buffer,
        cursors: &mut CursorSet,
    ) -> Result<(), EngineError> {
        loop {
            if self.inner.lock().undo_stack.len() <= checkpoint.0 {
                return Ok(());
            }
            self.undo(buffer, cursors).map(|_| ())?;
        }
    }

    pub fn clear(&self) {
        let mut state = self.inner.lock();
        state.undo_stack.clear();
        state.redo_stack.clear();
        state.group = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::LineEnding;
    use crate::range::Range;

    fn buffer(text: &str) -> Buffer {
        Buffer::new(text, LineEnding::Lf, 4)
    }

    #[test]
    fn execute_then_undo_restores_text() {
        let buf = buffer("");
        let mut cursors = CursorSet::new();
        let history = History::new(100);
        let cmd = Command::Insert(InsertCommand::new("Hello"));
        history.execute(cmd, &buf, &mut cursors).unwrap();
        assert_eq!(buf.text(), "Hello");
        history.undo(&buf, &mut cursors).unwrap();
        assert_eq!(buf.text(), "");
        history.redo(&buf, &mut cursors).unwrap();
        assert_eq!(buf.text(), "Hello");
    }

    #[test]
    fn undo_on_empty_stack_errors() {
        let buf = buffer("x");
        let mut cursors = CursorSet::new();
        let history = History::new(100);
        assert!(matches!(
            history.undo(&buf, &mut cursors),
            Err(EngineError::NothingToUndo)
        ));
    }

    #[test]
    fn pushing_after_undo_clears_redo() {
        let buf = buffer("");
        let mut cursors = CursorSet::new();
        let history = History::new(100);
        history
            .execute(Command::Insert(InsertCommand::new("a")), &buf, &mut cursors)
            .unwrap();
        history.undo(&buf, &mut cursors).unwrap();
        assert!(history.can_redo());
        history
            .execute(Command::Insert(InsertCommand::new("b")), &buf, &mut cursors)
            .unwrap();
        assert!(!history.can_redo());
    }

    #[test]
    fn eviction_drops_oldest_entries() {
        let buf = buffer("");
        let mut cursors = CursorSet::new();
        let history = History::new(2);
        for _ in 0..5 {
            history
                .execute(Command::Insert(InsertCommand::new("x")), &buf, &mut cursors)
                .unwrap();
        }
        assert_eq!(history.undo_count(), 2);
    }

    #[test]
    fn group_flushes_as_single_undo_entry() {
        let buf = buffer("");
        let mut cursors = CursorSet::new();
        let history = History::new(100);
        history.begin_group("format");
        history
            .execute(Command::Insert(InsertCommand::new("Hello")), &buf, &mut cursors)
            .unwrap();
        let cursors_before = cursors.clone();
        let pre_rope = buf.rope();
        let applied = buf.insert(5, " World").unwrap();
        cursors.map_in_place(|sel| {
            crate::cursor::transform_selection(
                sel,
                crate::cursor::EditSpan::new(applied.range, applied.new_text.len()),
            )
        });
        let cmd = Command::AppliedEdit(
            AppliedEditCommand::from_applied(pre_rope, &applied)
                .with_cursors(cursors_before, cursors.clone()),
        );
        history.push(cmd);
        history.end_group();
        assert_eq!(history.undo_count(), 1);
        assert_eq!(buf.text(), "Hello World");
        history.undo(&buf, &mut cursors).unwrap();
        assert_eq!(buf.text(), "");
        history.redo(&buf, &mut cursors).unwrap();
        assert_eq!(buf.text(), "Hello World");
    }

    #[test]
    fn empty_group_is_a_no_op() {
        let history = History::new(100);
        history.begin_group("noop");
        history.end_group();
        assert_eq!(history.undo_count(), 0);
    }

    #[test]
    fn nested_begin_group_is_ignored() {
        let buf = buffer("");
        let mut cursors = CursorSet::new();
        let history = History::new(100);
        history.begin_group("outer");
        history.begin_group("inner");
        history
            .execute(Command::Insert(InsertCommand::new("x")), &buf, &mut cursors)
            .unwrap();
        history.end_group();
        assert_eq!(history.undo_count(), 1);
    }

    #[test]
    fn checkpoint_undoes_back_to_depth() {
        let buf = buffer("");
        let mut cursors = CursorSet::new();
        let history = History::new(100);
        history
            .execute(Command::Insert(InsertCommand::new("a")), &buf, &mut cursors)
            .unwrap();
        let cp = history.checkpoint();
        history
            .execute(Command::Insert(InsertCommand::new("b")), &buf, &mut cursors)
            .unwrap();
        history
            .execute(Command::Insert(InsertCommand::new("c")), &buf, &mut cursors)
            .unwrap();
        history.undo_to_checkpoint(cp, &buf, &mut cursors).unwrap();
        assert_eq!(buf.text(), "a");
    }
}
