//! The closed set of undoable/redoable edit commands (§4.4, §9 "Command
//! objects as polymorphic variants"). Modeled as a tagged `enum` rather
//! than a trait object: the variant set is fixed by the spec, so no
//! dynamic dispatch is needed beyond matching on it.

use crate::buffer::Buffer;
use crate::cursor::{transform_offset, CursorSet, EditSpan};
use crate::error::EngineError;
use crate::ids::RevisionId;
use crate::range::Range;
use crate::rope::Rope;

/// One concrete edit a command produced, carrying everything the engine
/// façade needs to build a tracked `Change` without re-deriving it from a
/// rope that may no longer exist (§4.7 step 4).
#[derive(Clone, Debug)]
pub struct EditRecord {
    pub revision: RevisionId,
    pub pre_rope: Rope,
    pub range: Range,
    pub old_text: String,
    pub new_range: Range,
    pub new_text: String,
}

/// A leaf edit: replaces `old_range` with `new_text`, reversible by
/// replacing `new_range` with `old_text`. Used both standalone (direct
/// `insert`/`delete`/`replace` façade calls) and as a sub-command inside a
/// [`CompoundCommand`] (in which case `cursors` is `None` — the compound
/// owns the cursor transition).
#[derive(Clone, Debug)]
pub struct AppliedEditCommand {
    old_range: Range,
    old_text: String,
    new_range: Range,
    new_text: String,
    revision: RevisionId,
    pre_rope: Rope,
    cursors: Option<(CursorSet, CursorSet)>,
}

impl AppliedEditCommand {
    /// Builds a command from an edit the caller already applied directly
    /// to the buffer (the standalone `insert`/`delete`/`replace` path).
    pub fn from_applied(pre_rope: Rope, applied: &crate::buffer::AppliedEdit) -> Self {
        AppliedEditCommand {
            old_range: applied.range,
            old_text: applied.old_text.clone(),
            new_range: applied.new_range,
            new_text: applied.new_text.clone(),
            revision: applied.revision,
            pre_rope,
            cursors: None,
        }
    }

    /// Builds a not-yet-applied command; its first `execute` derives
    /// `old_text`/`new_range`/`revision` from the live buffer. Used by
    /// [`InsertCommand`]/[`DeleteCommand`]/[`ReplaceCommand`] to re-derive
    /// edits from the current cursor positions.
    fn pending(old_range: Range, new_text: String) -> Self {
        AppliedEditCommand {
            old_range,
            old_text: String::new(),
            new_range: old_range,
            new_text,
            revision: RevisionId::NONE,
            pre_rope: Rope::new(),
            cursors: None,
        }
    }

    pub fn with_cursors(mut self, before: CursorSet, after: CursorSet) -> Self {
        self.cursors = Some((before, after));
        self
    }

    pub fn old_range(&self) -> Range {
        self.old_range
    }

    pub fn new_range(&self) -> Range {
        self.new_range
    }

    pub fn old_text(&self) -> &str {
        &self.old_text
    }

    pub fn new_text(&self) -> &str {
        &self.new_text
    }

    fn execute(
        &mut self,
        buffer: &Buffer,
        cursors: &mut CursorSet,
    ) -> Result<Vec<EditRecord>, EngineError> {
        let pre_rope = buffer.rope();
        let applied = buffer.replace(self.old_range, &self.new_text)?;
        self.old_text = applied.old_text.clone();
        self.new_range = applied.new_range;
        self.revision = applied.revision;
        self.pre_rope = pre_rope.clone();
        if let Some((_, after)) = &self.cursors {
            *cursors = after.clone();
        }
        Ok(vec![EditRecord {
            revision: applied.revision,
            pre_rope,
            range: self.old_range,
            old_text: self.old_text.clone(),
            new_range: applied.new_range,
            new_text: applied.new_text,
        }])
    }

    fn undo(
        &mut self,
        buffer: &Buffer,
        cursors: &mut CursorSet,
    ) -> Result<Vec<EditRecord>, EngineError> {
        let pre_rope = buffer.rope();
        let applied = buffer.replace(self.new_range, &self.old_text)?;
        if let Some((before, _)) = &self.cursors {
            *cursors = before.clone();
        }
        let reverted_range = self.new_range;
        let reverted_new_range = applied.new_range;
        Ok(vec![EditRecord {
            revision: applied.revision,
            pre_rope,
            range: reverted_range,
            old_text: self.new_text.clone(),
            new_range: reverted_new_range,
            new_text: applied.new_text,
        }])
    }

    fn describe(&self) -> String {
        format!(
            "edit {}..{} ({} -> {} bytes)",
            self.old_range.start,
            self.old_range.end,
            self.old_text.len(),
            self.new_text.len()
        )
    }

    fn estimated_size(&self) -> usize {
        self.old_text.len() + self.new_text.len()
    }
}

/// An ordered list of sub-commands executed as one undo/redo unit.
/// `execute` runs sub-commands forward, rolling back already-executed ones
/// on a mid-way failure; `undo` runs them in reverse (§4.4).
#[derive(Clone, Debug)]
pub struct CompoundCommand {
    label: String,
    subcommands: Vec<Command>,
    cursors: Option<(CursorSet, CursorSet)>,
}

impl CompoundCommand {
    pub fn new(
        label: impl Into<String>,
        subcommands: Vec<Command>,
        cursors: Option<(CursorSet, CursorSet)>,
    ) -> Self {
        CompoundCommand {
            label: label.into(),
            subcommands,
            cursors,
        }
    }

    /// Flattens already-executed commands (e.g. a flushed undo group) into
    /// one compound, without an overall cursor transition — each
    /// sub-command already owns its own.
    pub fn from_subcommands(label: impl Into<String>, subcommands: Vec<Command>) -> Self {
        CompoundCommand::new(label, subcommands, None)
    }

    fn execute(
        &mut self,
        buffer: &Buffer,
        cursors: &mut CursorSet,
    ) -> Result<Vec<EditRecord>, EngineError> {
        let mut all = Vec::new();
        for i in 0..self.subcommands.len() {
            match self.subcommands[i].execute(buffer, cursors) {
                Ok(mut recs) => all.append(&mut recs),
                Err(err) => {
                    for sub in self.subcommands[..i].iter_mut().rev() {
                        let _ = sub.undo(buffer, cursors);
                    }
                    return Err(err);
                }
            }
        }
        if let Some((_, after)) = &self.cursors {
            *cursors = after.clone();
        }
        Ok(all)
    }

    fn undo(
        &mut self,
        buffer: &Buffer,
        cursors: &mut CursorSet,
    ) -> Result<Vec<EditRecord>, EngineError> {
        let mut all = Vec::new();
        for sub in self.subcommands.iter_mut().rev() {
            let recs = sub.undo(buffer, cursors)?;
            all.extend(recs);
        }
        if let Some((before, _)) = &self.cursors {
            *cursors = before.clone();
        }
        Ok(all)
    }

    fn describe(&self) -> String {
        format!("{} ({} edits)", self.label, self.subcommands.len())
    }

    fn estimated_size(&self) -> usize {
        self.subcommands.iter().map(Command::estimated_size).sum()
    }
}

/// Derives, from the current multi-cursor state, a [`CompoundCommand`]
/// replacing every selection (descending by start, per §4.3/§9) with
/// `text`. Shared by [`InsertCommand`] and [`ReplaceCommand`], which only
/// differ in name/intent to the caller.
fn derive_replace_at_cursors(
    label: &'static str,
    text: &str,
    buffer: &Buffer,
    cursors: &mut CursorSet,
) -> Result<(CompoundCommand, Vec<EditRecord>), EngineError> {
    let cursors_before = cursors.clone();
    let mut selections = cursors_before.all();
    selections.sort_by(|a, b| b.start().cmp(&a.start()));

    let mut subcommands = Vec::with_capacity(selections.len());
    let mut all_records = Vec::new();
    for sel in &selections {
        let mut sub = AppliedEditCommand::pending(sel.range(), text.to_string());
        let recs = sub.execute(buffer, cursors)?;
        all_records.extend(recs);
        subcommands.push(Command::AppliedEdit(sub));
    }

    let edit_spans: Vec<EditSpan> = subcommands
        .iter()
        .map(|c| match c {
            Command::AppliedEdit(a) => EditSpan::new(a.old_range(), a.new_text().len()),
            _ => unreachable!("derive_replace_at_cursors only produces AppliedEdit subcommands"),
        })
        .collect();
    let mut cursors_after = cursors_before.clone();
    cursors_after.transform_multi(&edit_spans);
    *cursors = cursors_after.clone();

    let compound = CompoundCommand::new(
        label,
        subcommands,
        Some((cursors_before, cursors_after)),
    );
    Ok((compound, all_records))
}

/// Inserts `text` at every cursor/selection, replacing selections in
/// place. Re-derives its edits from the live cursor set on first
/// `execute`; subsequent `execute`/`undo` calls replay the derived
/// [`CompoundCommand`] (§4.4).
#[derive(Clone, Debug)]
pub struct InsertCommand {
    text: String,
    derived: Option<CompoundCommand>,
}

impl InsertCommand {
    pub fn new(text: impl Into<String>) -> Self {
        InsertCommand {
            text: text.into(),
            derived: None,
        }
    }

    fn execute(
        &mut self,
        buffer: &Buffer,
        cursors: &mut CursorSet,
    ) -> Result<Vec<EditRecord>, EngineError> {
        if let Some(compound) = &mut self.derived {
            return compound.execute(buffer, cursors);
        }
        let (compound, records) = derive_replace_at_cursors("insert", &self.text, buffer, cursors)?;
        self.derived = Some(compound);
        Ok(records)
    }

    fn undo(
        &mut self,
        buffer: &Buffer,
        cursors: &mut CursorSet,
    ) -> Result<Vec<EditRecord>, EngineError> {
        match &mut self.derived {
            Some(compound) => compound.undo(buffer, cursors),
            None => Ok(Vec::new()),
        }
    }

    fn describe(&self) -> String {
        format!("insert {:?}", self.text)
    }

    fn estimated_size(&self) -> usize {
        self.derived.as_ref().map_or(self.text.len(), CompoundCommand::estimated_size)
    }
}

/// Which character a cursor-only (no selection) delete removes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeleteDirection {
    /// Removes the character at (after) the cursor, like the Delete key.
    Forward,
    /// Removes the character before the cursor, like Backspace.
    Backward,
}

/// Deletes the selection at every cursor, or (for empty selections) one
/// character in `direction`. Same re-derive/replay shape as
/// [`InsertCommand`].
#[derive(Clone, Debug)]
pub struct DeleteCommand {
    direction: DeleteDirection,
    derived: Option<CompoundCommand>,
}

impl DeleteCommand {
    pub fn new(direction: DeleteDirection) -> Self {
        DeleteCommand {
            direction,
            derived: None,
        }
    }

    fn execute(
        &mut self,
        buffer: &Buffer,
        cursors: &mut CursorSet,
    ) -> Result<Vec<EditRecord>, EngineError> {
        if let Some(compound) = &mut self.derived {
            return compound.execute(buffer, cursors);
        }
        let cursors_before = cursors.clone();
        let mut selections = cursors_before.all();
        selections.sort_by(|a, b| b.start().cmp(&a.start()));

        let mut subcommands = Vec::new();
        let mut all_records = Vec::new();
        for sel in &selections {
            let range = if !sel.is_cursor() {
                sel.range()
            } else {
                match self.direction {
                    DeleteDirection::Forward => {
                        let len = char_len_at(buffer, sel.head)?;
                        Range::new(sel.head, sel.head + len)
                    }
                    DeleteDirection::Backward => {
                        let len = char_len_before(buffer, sel.head)?;
                        Range::new(sel.head - len, sel.head)
                    }
                }
            };
            if range.is_empty() {
                continue;
            }
            let mut sub = AppliedEditCommand::pending(range, String::new());
            let recs = sub.execute(buffer, cursors)?;
            all_records.extend(recs);
            subcommands.push(Command::AppliedEdit(sub));
        }

        let edit_spans: Vec<EditSpan> = subcommands
            .iter()
            .map(|c| match c {
                Command::AppliedEdit(a) => EditSpan::new(a.old_range(), a.new_text().len()),
                _ => unreachable!(),
            })
            .collect();
        let mut cursors_after = cursors_before.clone();
        cursors_after.transform_multi(&edit_spans);
        *cursors = cursors_after.clone();

        let compound = CompoundCommand::new(
            "delete",
            subcommands,
            Some((cursors_before, cursors_after)),
        );
        self.derived = Some(compound);
        Ok(all_records)
    }

    fn undo(
        &mut self,
        buffer: &Buffer,
        cursors: &mut CursorSet,
    ) -> Result<Vec<EditRecord>, EngineError> {
        match &mut self.derived {
            Some(compound) => compound.undo(buffer, cursors),
            None => Ok(Vec::new()),
        }
    }

    fn describe(&self) -> String {
        match self.direction {
            DeleteDirection::Forward => "delete forward".to_string(),
            DeleteDirection::Backward => "delete backward".to_string(),
        }
    }

    fn estimated_size(&self) -> usize {
        self.derived.as_ref().map_or(0, CompoundCommand::estimated_size)
    }
}

/// Replaces the selection at every cursor with `text` (a no-op at bare
/// cursors with nothing selected). Mechanically identical to
/// [`InsertCommand`]; kept distinct per §4.4's named command set so callers
/// can express "replace the selection" intent explicitly.
#[derive(Clone, Debug)]
pub struct ReplaceCommand {
    text: String,
    derived: Option<CompoundCommand>,
}

impl ReplaceCommand {
    pub fn new(text: impl Into<String>) -> Self {
        ReplaceCommand {
            text: text.into(),
            derived: None,
        }
    }

    fn execute(
        &mut self,
        buffer: &Buffer,
        cursors: &mut CursorSet,
    ) -> Result<Vec<EditRecord>, EngineError> {
        if let Some(compound) = &mut self.derived {
            return compound.execute(buffer, cursors);
        }
        let (compound, records) =
            derive_replace_at_cursors("replace", &self.text, buffer, cursors)?;
        self.derived = Some(compound);
        Ok(records)
    }

    fn undo(
        &mut self,
        buffer: &Buffer,
        cursors: &mut CursorSet,
    ) -> Result<Vec<EditRecord>, EngineError> {
        match &mut self.derived {
            Some(compound) => compound.undo(buffer, cursors),
            None => Ok(Vec::new()),
        }
    }

    fn describe(&self) -> String {
        format!("replace selection with {:?}", self.text)
    }

    fn estimated_size(&self) -> usize {
        self.derived.as_ref().map_or(self.text.len(), CompoundCommand::estimated_size)
    }
}

fn char_len_at(buffer: &Buffer, offset: usize) -> Result<usize, EngineError> {
    if offset >= buffer.len() {
        return Ok(0);
    }
    Ok(buffer.rune_at(offset)?.len_utf8())
}

fn char_len_before(buffer: &Buffer, offset: usize) -> Result<usize, EngineError> {
    if offset == 0 {
        return Ok(0);
    }
    let start = offset.saturating_sub(4).max(0);
    let text = buffer.text_range(Range::new(start, offset))?;
    Ok(text
        .chars()
        .next_back()
        .map(|ch| ch.len_utf8())
        .unwrap_or(0))
}

/// The closed set of commands `History` can push, execute, and undo.
#[derive(Clone, Debug)]
pub enum Command {
    AppliedEdit(AppliedEditCommand),
    Insert(InsertCommand),
    Delete(DeleteCommand),
    Replace(ReplaceCommand),
    Compound(CompoundCommand),
}

impl Command {
    pub fn execute(
        &mut self,
        buffer: &Buffer,
        cursors: &mut CursorSet,
    ) -> Result<Vec<EditRecord>, EngineError> {
        match self {
            Command::AppliedEdit(c) => c.execute(buffer, cursors),
            Command::Insert(c) => c.execute(buffer, cursors),
            Command::Delete(c) => c.execute(buffer, cursors),
            Command::Replace(c) => c.execute(buffer, cursors),
            Command::Compound(c) => c.execute(buffer, cursors),
        }
    }

    pub fn undo(
        &mut self,
        buffer: &Buffer,
        cursors: &mut CursorSet,
    ) -> Result<Vec<EditRecord>, EngineError> {
        match self {
            Command::AppliedEdit(c) => c.undo(buffer, cursors),
            Command::Insert(c) => c.undo(buffer, cursors),
            Command::Delete(c) => c.undo(buffer, cursors),
            Command::Replace(c) => c.undo(buffer, cursors),
            Command::Compound(c) => c.undo(buffer, cursors),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Command::AppliedEdit(c) => c.describe(),
            Command::Insert(c) => c.describe(),
            Command::Delete(c) => c.describe(),
            Command::Replace(c) => c.describe(),
            Command::Compound(c) => c.describe(),
        }
    }

    pub fn estimated_size(&self) -> usize {
        match self {
            Command::AppliedEdit(c) => c.estimated_size(),
            Command::Insert(c) => c.estimated_size(),
            Command::Delete(c) => c.estimated_size(),
            Command::Replace(c) => c.estimated_size(),
            Command::Compound(c) => c.estimated_size(),
        }
    }
}

#[allow(dead_code)]
fn assert_offset_survives_transform(off: usize, edit: EditSpan) -> usize {
    transform_offset(off, edit)
}
