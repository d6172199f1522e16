//! Multi-cursor model: normalized, non-touching [`Selection`]s over byte
//! offsets, plus the transform primitives that keep them correct across
//! edits (§4.3).

use smallvec::{smallvec, SmallVec};

use crate::range::Range;

/// An `(anchor, head)` pair. A "cursor" is a selection with `anchor == head`.
/// Direction is preserved (`anchor` may be greater than `head`) until a
/// normalization merge collapses it into a forward selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Selection {
    pub anchor: usize,
    pub head: usize,
}

impl Selection {
    pub fn new(anchor: usize, head: usize) -> Self {
        Selection { anchor, head }
    }

    pub fn cursor(offset: usize) -> Self {
        Selection {
            anchor: offset,
            head: offset,
        }
    }

    pub fn is_cursor(&self) -> bool {
        self.anchor == self.head
    }

    pub fn start(&self) -> usize {
        self.anchor.min(self.head)
    }

    pub fn end(&self) -> usize {
        self.anchor.max(self.head)
    }

    pub fn range(&self) -> Range {
        Range::new(self.start(), self.end())
    }

    pub fn len(&self) -> usize {
        self.range().len()
    }

    pub fn is_empty(&self) -> bool {
        self.is_cursor()
    }

    fn clamp(&self, max: usize) -> Self {
        Selection {
            anchor: self.anchor.min(max),
            head: self.head.min(max),
        }
    }
}

/// A single edit's effect on offsets downstream of it: the pre-edit `range`
/// it replaced and the byte length of what replaced it. This is the minimal
/// shape [`transform_offset`] needs; [`crate::buffer::AppliedEdit`] carries
/// the richer version with old/new text.
#[derive(Clone, Copy, Debug)]
pub struct EditSpan {
    pub range: Range,
    pub new_len: usize,
}

impl EditSpan {
    pub fn new(range: Range, new_len: usize) -> Self {
        EditSpan { range, new_len }
    }

    fn delta(&self) -> isize {
        self.new_len as isize - self.range.len() as isize
    }
}

/// Transforms `off` across `edit`: offsets entirely after the edit shift by
/// the length delta; offsets entirely before are untouched; offsets inside
/// the replaced region collapse to the end of the replacement.
pub fn transform_offset(off: usize, edit: EditSpan) -> usize {
    if edit.range.end <= off {
        (off as isize + edit.delta()) as usize
    } else if edit.range.start >= off {
        off
    } else {
        edit.range.start + edit.new_len
    }
}

/// As [`transform_offset`], but for a pure insertion exactly at `off`
/// (`edit.range` empty and `edit.range.start == off`), `sticky` controls
/// whether `off` stays put (`true`) or moves past the inserted text
/// (`false`). Non-insertion edits and insertions elsewhere behave exactly
/// like [`transform_offset`].
pub fn transform_offset_sticky(off: usize, edit: EditSpan, sticky: bool) -> usize {
    if edit.range.is_empty() && edit.range.start == off {
        if sticky {
            off
        } else {
            off + edit.new_len
        }
    } else {
        transform_offset(off, edit)
    }
}

/// Applies [`transform_offset`] to both endpoints of `sel` independently.
/// The result's direction may flip if the edit collapses the selection onto
/// a single point inside the replaced region.
pub fn transform_selection(sel: Selection, edit: EditSpan) -> Selection {
    Selection {
        anchor: transform_offset(sel.anchor, edit),
        head: transform_offset(sel.head, edit),
    }
}

/// Ordered, non-overlapping set of selections. Always non-empty; emptying it
/// synthesizes a single cursor at offset 0. Normalized (sorted ascending by
/// start, touching selections merged into a forward selection) after every
/// mutation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CursorSet {
    selections: SmallVec<[Selection; 1]>,
}

impl CursorSet {
    pub fn new() -> Self {
        CursorSet {
            selections: smallvec![Selection::cursor(0)],
        }
    }

    /// The lowest-start selection; designated primary per the normalization
    /// invariant (sorted ascending by start).
    pub fn primary(&self) -> Selection {
        self.selections[0]
    }

    pub fn all(&self) -> Vec<Selection> {
        self.selections.to_vec()
    }

    pub fn len(&self) -> usize {
        self.selections.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn has_selection(&self) -> bool {
        self.selections.iter().any(|s| !s.is_cursor())
    }

    pub fn add(&mut self, sel: Selection) {
        self.selections.push(sel);
        self.normalize();
    }

    pub fn add_all(&mut self, sels: impl IntoIterator<Item = Selection>) {
        self.selections.extend(sels);
        self.normalize();
    }

    pub fn set(&mut self, sel: Selection) {
        self.selections = smallvec![sel];
    }

    pub fn set_all(&mut self, sels: Vec<Selection>) {
        self.selections = sels.into_iter().collect();
        if self.selections.is_empty() {
            self.selections.push(Selection::cursor(0));
        }
        self.normalize();
    }

    /// Discards every selection but the primary, leaving one cursor.
    pub fn clear(&mut self) {
        let primary = self.primary();
        self.selections = smallvec![primary];
    }

    pub fn remove(&mut self, index: usize) {
        if self.selections.len() > 1 && index < self.selections.len() {
            self.selections.remove(index);
        }
    }

    pub fn map_in_place(&mut self, mut f: impl FnMut(Selection) -> Selection) {
        for sel in self.selections.iter_mut() {
            *sel = f(*sel);
        }
        self.normalize();
    }

    /// Collapses every selection to a cursor at its head.
    pub fn collapse_all(&mut self) {
        self.map_in_place(|sel| Selection::cursor(sel.head));
    }

    pub fn clamp(&mut self, max: usize) {
        for sel in self.selections.iter_mut() {
            *sel = sel.clamp(max);
        }
        self.normalize();
    }

    pub fn equals(&self, other: &CursorSet) -> bool {
        self.selections == other.selections
    }

    /// Transforms every selection across a single edit, re-normalizing
    /// afterward (a transform can make two selections touch).
    pub fn transform(&mut self, edit: EditSpan) {
        self.map_in_place(|sel| transform_selection(sel, edit));
    }

    /// Transforms every selection across a batch of edits. Per §4.3/§9, the
    /// edits are applied in **descending** `range.start` order internally
    /// regardless of the order `edits` is given in, matching the order the
    /// buffer itself requires for `apply_edits`.
    pub fn transform_multi(&mut self, edits: &[EditSpan]) {
        let mut sorted: Vec<EditSpan> = edits.to_vec();
        sorted.sort_by(|a, b| b.range.start.cmp(&a.range.start));
        for edit in sorted {
            self.transform(edit);
        }
    }

    /// Sorts ascending by start (ties broken by the larger selection first),
    /// then merges any selections that touch or overlap into a single
    /// forward selection. Always leaves at least one selection.
    fn normalize(&mut self) {
        if self.selections.is_empty() {
            self.selections.push(Selection::cursor(0));
            return;
        }
        self.selections.sort_by(|a, b| {
            a.start()
                .cmp(&b.start())
                .then_with(|| b.end().cmp(&a.end()))
        });
        let mut merged: SmallVec<[Selection; 1]> = SmallVec::new();
        for &sel in self.selections.iter() {
            match merged.last_mut() {
                Some(last) if last.range().touches(sel.range()) => {
                    *last = Selection::new(
                        last.start().min(sel.start()),
                        last.end().max(sel.end()),
                    );
                }
                _ => merged.push(sel),
            }
        }
        self.selections = merged;
    }
}

impl Default for CursorSet {
    fn default() -> Self {
        CursorSet::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_set_has_single_cursor_at_zero() {
        let cs = CursorSet::new();
        assert_eq!(cs.len(), 1);
        assert_eq!(cs.primary(), Selection::cursor(0));
    }

    #[test]
    fn add_sorts_ascending_by_start() {
        let mut cs = CursorSet::new();
        cs.set_all(vec![Selection::cursor(8), Selection::cursor(2), Selection::cursor(5)]);
        assert_eq!(
            cs.all(),
            vec![
                Selection::cursor(2),
                Selection::cursor(5),
                Selection::cursor(8)
            ]
        );
    }

    #[test]
    fn touching_selections_merge_forward() {
        let mut cs = CursorSet::new();
        cs.set_all(vec![Selection::new(0, 5), Selection::new(5, 10)]);
        assert_eq!(cs.len(), 1);
        assert_eq!(cs.primary(), Selection::new(0, 10));
    }

    #[test]
    fn overlapping_selections_merge() {
        let mut cs = CursorSet::new();
        cs.set_all(vec![Selection::new(0, 10), Selection::new(5, 15)]);
        assert_eq!(cs.len(), 1);
        assert_eq!(cs.primary().range(), Range::new(0, 15));
    }

    #[test]
    fn non_touching_selections_stay_separate() {
        let mut cs = CursorSet::new();
        cs.set_all(vec![Selection::new(0, 3), Selection::new(5, 8)]);
        assert_eq!(cs.len(), 2);
    }

    #[test]
    fn clearing_keeps_only_primary() {
        let mut cs = CursorSet::new();
        cs.set_all(vec![Selection::cursor(2), Selection::cursor(9)]);
        cs.clear();
        assert_eq!(cs.len(), 1);
        assert_eq!(cs.primary(), Selection::cursor(2));
    }

    #[test]
    fn transform_offset_after_edit_shifts() {
        let edit = EditSpan::new(Range::new(2, 3), 1);
        assert_eq!(transform_offset(5, edit), 5);
        assert_eq!(transform_offset(0, edit), 0);
    }

    #[test]
    fn transform_offset_shifts_past_insertion() {
        // insert 3 bytes at offset 2
        let edit = EditSpan::new(Range::at(2), 3);
        assert_eq!(transform_offset(5, edit), 8);
        assert_eq!(transform_offset(2, edit), 2 + 3);
        assert_eq!(transform_offset(0, edit), 0);
    }

    #[test]
    fn transform_offset_inside_replaced_region_collapses() {
        let edit = EditSpan::new(Range::new(2, 8), 2);
        assert_eq!(transform_offset(5, edit), 4);
    }

    #[test]
    fn sticky_insertion_keeps_offset_in_place() {
        let edit = EditSpan::new(Range::at(4), 2);
        assert_eq!(transform_offset_sticky(4, edit, true), 4);
        assert_eq!(transform_offset_sticky(4, edit, false), 6);
    }

    #[test]
    fn multi_cursor_typing_scenario() {
        // "aa bb cc", cursors at {2,5,8}; insert "!" at each, descending.
        let mut cs = CursorSet::new();
        cs.set_all(vec![
            Selection::cursor(2),
            Selection::cursor(5),
            Selection::cursor(8),
        ]);
        let edits = vec![
            EditSpan::new(Range::at(8), 1),
            EditSpan::new(Range::at(5), 1),
            EditSpan::new(Range::at(2), 1),
        ];
        cs.transform_multi(&edits);
        assert_eq!(
            cs.all(),
            vec![
                Selection::cursor(3),
                Selection::cursor(7),
                Selection::cursor(11)
            ]
        );
    }

    #[test]
    fn clamp_bounds_every_selection() {
        let mut cs = CursorSet::new();
        cs.set_all(vec![Selection::cursor(5), Selection::new(8, 20)]);
        cs.clamp(10);
        assert_eq!(cs.all(), vec![Selection::cursor(5), Selection::new(8, 10)]);
    }
}
