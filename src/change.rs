//! A single recorded edit: the old/new text and ranges it replaced, tagged
//! with the revision it produced (§3, SPEC_FULL B).

use crate::history::EditRecord;
use crate::ids::RevisionId;
use crate::range::Range;

/// What kind of edit a [`Change`] describes, derived from the relative
/// lengths of its old and new text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeKind {
    Insert,
    Delete,
    Replace,
}

/// A record of one edit: the pre-edit region it replaced (`range`) and the
/// post-edit region that now holds `new_text` (`new_range`), tagged with the
/// revision the edit produced.
///
/// Invariant: `new_range.start == range.start` and
/// `new_range.len() == new_text.len()`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Change {
    pub kind: ChangeKind,
    pub range: Range,
    pub new_range: Range,
    pub old_text: String,
    pub new_text: String,
    pub revision: RevisionId,
}

impl Change {
    pub fn new(range: Range, old_text: String, new_text: String, revision: RevisionId) -> Self {
        let new_range = Range::new(range.start, range.start + new_text.len());
        let kind = if old_text.is_empty() {
            ChangeKind::Insert
        } else if new_text.is_empty() {
            ChangeKind::Delete
        } else {
            ChangeKind::Replace
        };
        Change {
            kind,
            range,
            new_range,
            old_text,
            new_text,
            revision,
        }
    }

    pub fn from_record(record: &EditRecord) -> Self {
        Change::new(
            record.range,
            record.old_text.clone(),
            record.new_text.clone(),
            record.revision,
        )
    }

    /// Swaps old/new text and ranges, producing the change that reverses
    /// this one against the post-edit state.
    pub fn invert(&self) -> Change {
        Change {
            kind: match self.kind {
                ChangeKind::Insert => ChangeKind::Delete,
                ChangeKind::Delete => ChangeKind::Insert,
                ChangeKind::Replace => ChangeKind::Replace,
            },
            range: self.new_range,
            new_range: self.range,
            old_text: self.new_text.clone(),
            new_text: self.old_text.clone(),
            revision: self.revision,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_has_empty_old_text() {
        let c = Change::new(Range::at(3), String::new(), "abc".into(), RevisionId::next());
        assert_eq!(c.kind, ChangeKind::Insert);
        assert_eq!(c.new_range, Range::new(3, 6));
    }

    #[test]
    fn invert_swaps_text_and_ranges() {
        let c = Change::new(Range::new(0, 3), "old".into(), "newer".into(), RevisionId::next());
        let inv = c.invert();
        assert_eq!(inv.old_text, "newer");
        assert_eq!(inv.new_text, "old");
        assert_eq!(inv.range, Range::new(0, 5));
        assert_eq!(inv.new_range, Range::new(0, 3));
    }

    #[test]
    fn double_invert_is_identity() {
        let c = Change::new(Range::new(2, 5), "xyz".into(), "ab".into(), RevisionId::next());
        let back = c.invert().invert();
        assert_eq!(back, c);
    }
}
