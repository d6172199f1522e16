//! Lock-protected owner of the current rope, its revision, and the
//! line-ending/tab-width policy applied to every write (§3, §4.2).

mod line_ending;

pub use line_ending::LineEnding;

use parking_lot::RwLock;
use tracing::debug;

use crate::error::EngineError;
use crate::ids::RevisionId;
use crate::range::Range;
use crate::rope::{Point, PointUtf16, Rope};

/// Outcome of a single applied edit, carrying everything the engine façade
/// needs to build a tracked `Change` and an undo `Command` without having to
/// re-derive old text from a rope that no longer exists.
#[derive(Clone, Debug)]
pub struct AppliedEdit {
    pub range: Range,
    pub old_text: String,
    pub new_range: Range,
    pub new_text: String,
    pub revision: RevisionId,
}

/// An immutable, shareable handle onto a buffer's state at a point in time.
/// Survives arbitrary future writes to its originating buffer; creating one
/// is `O(1)` since the rope it holds is itself structurally shared.
#[derive(Clone, Debug)]
pub struct Snapshot {
    pub rope: Rope,
    pub revision: RevisionId,
    pub line_ending: LineEnding,
    pub tab_width: u32,
}

struct BufferState {
    rope: Rope,
    revision: RevisionId,
    line_ending: LineEnding,
    tab_width: u32,
}

pub struct Buffer {
    inner: RwLock<BufferState>,
}

impl Buffer {
    pub fn new(initial_content: &str, line_ending: LineEnding, tab_width: u32) -> Self {
        let normalized = line_ending.normalize(initial_content);
        Buffer {
            inner: RwLock::new(BufferState {
                rope: Rope::from_str(&normalized),
                revision: RevisionId::NONE,
                line_ending,
                tab_width,
            }),
        }
    }

    // ---- reads ----

    pub fn text(&self) -> String {
        self.inner.read().rope.to_text()
    }

    pub fn text_range(&self, range: Range) -> Result<String, EngineError> {
        self.inner.read().rope.slice(range)
    }

    pub fn len(&self) -> usize {
        self.inner.read().rope.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().rope.is_empty()
    }

    pub fn line_count(&self) -> usize {
        self.inner.read().rope.line_count()
    }

    pub fn line_text(&self, line: usize) -> Result<String, EngineError> {
        self.inner.read().rope.line_text(line)
    }

    pub fn line_len(&self, line: usize) -> Result<usize, EngineError> {
        self.inner.read().rope.line_len(line)
    }

    pub fn byte_at(&self, offset: usize) -> Result<u8, EngineError> {
        self.inner.read().rope.byte_at(offset)
    }

    pub fn rune_at(&self, offset: usize) -> Result<char, EngineError> {
        self.inner.read().rope.rune_at(offset)
    }

    pub fn offset_to_point(&self, offset: usize) -> Result<Point, EngineError> {
        self.inner.read().rope.offset_to_point(offset)
    }

    pub fn point_to_offset(&self, point: Point) -> Result<usize, EngineError> {
        self.inner.read().rope.point_to_offset(point)
    }

    pub fn offset_to_point_utf16(&self, offset: usize) -> Result<PointUtf16, EngineError> {
        self.inner.read().rope.offset_to_point_utf16(offset)
    }

    pub fn point_utf16_to_offset(&self, point: PointUtf16) -> Result<usize, EngineError> {
        self.inner.read().rope.point_utf16_to_offset(point)
    }

    pub fn line_start_offset(&self, line: usize) -> Result<usize, EngineError> {
        self.inner.read().rope.line_start_offset(line)
    }

    pub fn line_end_offset(&self, line: usize) -> Result<usize, EngineError> {
        self.inner.read().rope.line_end_offset(line)
    }

    pub fn revision_id(&self) -> RevisionId {
        self.inner.read().revision
    }

    pub fn tab_width(&self) -> u32 {
        self.inner.read().tab_width
    }

    pub fn set_tab_width(&self, width: u32) {
        self.inner.write().tab_width = width;
    }

    pub fn line_ending(&self) -> LineEnding {
        self.inner.read().line_ending
    }

    pub fn set_line_ending(&self, ending: LineEnding) {
        self.inner.write().line_ending = ending;
    }

    pub fn rope(&self) -> Rope {
        self.inner.read().rope.clone()
    }

    pub fn snapshot(&self) -> Snapshot {
        let state = self.inner.read();
        Snapshot {
            rope: state.rope.clone(),
            revision: state.revision,
            line_ending: state.line_ending,
            tab_width: state.tab_width,
        }
    }

    // ---- writes ----

    pub fn insert(&self, offset: usize, text: &str) -> Result<AppliedEdit, EngineError> {
        self.apply_edit(Range::at(offset), text)
    }

    pub fn delete(&self, range: Range) -> Result<AppliedEdit, EngineError> {
        self.apply_edit(range, "")
    }

    pub fn replace(&self, range: Range, text: &str) -> Result<AppliedEdit, EngineError> {
        self.apply_edit(range, text)
    }

    pub fn apply_edit(&self, range: Range, text: &str) -> Result<AppliedEdit, EngineError> {
        let mut state = self.inner.write();
        let normalized = state.line_ending.normalize(text);
        let old_text = state.rope.slice(range)?;
        let new_rope = state.rope.replace(range, &normalized)?;
        let revision = RevisionId::next();
        state.rope = new_rope;
        state.revision = revision;
        let new_range = Range::new(range.start, range.start + normalized.len());
        debug!(?range, new_len = normalized.len(), %revision, "buffer edit applied");
        Ok(AppliedEdit {
            range,
            old_text,
            new_range,
            new_text: normalized,
            revision,
        })
    }

    /// Applies every edit atomically: either all apply and a single new
    /// revision is issued, or none do and the buffer is unchanged.
    /// `edits` must be in strictly descending `start` order with no
    /// overlap; touching edits (`edits[i].end == edits[i-1].start`) are
    /// allowed (§9).
    pub fn apply_edits(
        &self,
        edits: &[(Range, String)],
    ) -> Result<Vec<AppliedEdit>, EngineError> {
        if edits.is_empty() {
            return Ok(Vec::new());
        }
        for window in edits.windows(2) {
            let (prev_range, _) = &window[0];
            let (next_range, _) = &window[1];
            if next_range.start > prev_range.start || next_range.end > prev_range.start {
                return Err(EngineError::EditsOverlap {
                    offset: next_range.start,
                });
            }
        }

        let mut state = self.inner.write();
        let mut working = state.rope.clone();
        let mut applied = Vec::with_capacity(edits.len());
        let mut deltas = Vec::with_capacity(edits.len());
        for (range, text) in edits {
            let normalized = state.line_ending.normalize(text);
            let old_text = working.slice(*range)?;
            working = working.replace(*range, &normalized)?;
            let new_range = Range::new(range.start, range.start + normalized.len());
            deltas.push(normalized.len() as isize - range.len() as isize);
            applied.push(AppliedEdit {
                range: *range,
                old_text,
                new_range,
                new_text: normalized,
                revision: RevisionId::NONE, // filled in below, once, for the whole batch
            });
        }
        // `new_range` above was computed against `working` at the moment each
        // edit was applied, before any edit further left (processed later in
        // this loop, since `edits` runs right-to-left) shifted it. Walk back
        // right-to-left accumulating those later deltas onto the earlier
        // entries so every `new_range` reflects the fully-applied buffer.
        let mut shift = 0isize;
        for (edit, delta) in applied.iter_mut().zip(deltas.iter()).rev() {
            edit.new_range = Range::new(
                (edit.new_range.start as isize + shift) as usize,
                (edit.new_range.end as isize + shift) as usize,
            );
            shift += delta;
        }
        let revision = RevisionId::next();
        for edit in applied.iter_mut() {
            edit.revision = revision;
        }
        state.rope = working;
        state.revision = revision;
        debug!(count = edits.len(), %revision, "batch buffer edit applied");
        Ok(applied)
    }

    pub fn set_content(&self, content: &str) -> RevisionId {
        let mut state = self.inner.write();
        let normalized = state.line_ending.normalize(content);
        state.rope = Rope::from_str(&normalized);
        let revision = RevisionId::next();
        state.revision = revision;
        revision
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_bumps_revision_and_returns_outcome() {
        let buf = Buffer::new("hello", LineEnding::Lf, 4);
        let before = buf.revision_id();
        let edit = buf.insert(5, " world").unwrap();
        assert!(buf.revision_id() > before);
        assert_eq!(edit.new_text, " world");
        assert_eq!(buf.text(), "hello world");
    }

    #[test]
    fn writes_normalize_line_endings() {
        let buf = Buffer::new("", LineEnding::Crlf, 4);
        buf.insert(0, "a\nb\r\nc").unwrap();
        assert_eq!(buf.text(), "a\r\nb\r\nc");
    }

    #[test]
    fn apply_edits_is_all_or_nothing_on_overlap() {
        let buf = Buffer::new("foo bar baz", LineEnding::Lf, 4);
        let edits = vec![
            (Range::new(0, 3), "ABC".to_string()),
            (Range::new(2, 7), "XYZ".to_string()), // overlaps the previous
        ];
        let before = buf.text();
        assert!(buf.apply_edits(&edits).is_err());
        assert_eq!(buf.text(), before);
    }

    #[test]
    fn apply_edits_descending_order_applies_atomically() {
        let buf = Buffer::new("foo bar baz", LineEnding::Lf, 4);
        let before_rev = buf.revision_id();
        let edits = vec![
            (Range::new(8, 11), "qux".to_string()),
            (Range::new(4, 7), "XYZ".to_string()),
            (Range::new(0, 3), "ABC".to_string()),
        ];
        let applied = buf.apply_edits(&edits).unwrap();
        assert_eq!(buf.text(), "ABC XYZ qux");
        assert!(buf.revision_id() > before_rev);
        assert!(applied.iter().all(|e| e.revision == buf.revision_id()));
    }

    #[test]
    fn apply_edits_new_ranges_account_for_later_left_shifts() {
        let buf = Buffer::new("foo bar baz", LineEnding::Lf, 4);
        // "baz" -> "q" (shrinks by 2) is rightmost and processed first, so
        // its own new_range is unaffected by anything left of it. "bar" ->
        // "lengthy" (grows by 4) is processed after and sits to its left, so
        // the "baz" edit's recorded new_range must shift right by 4 once
        // "bar" grows.
        let edits = vec![
            (Range::new(8, 11), "q".to_string()),
            (Range::new(4, 7), "lengthy".to_string()),
        ];
        let applied = buf.apply_edits(&edits).unwrap();
        assert_eq!(buf.text(), "foo lengthy q");
        assert_eq!(applied[1].new_range, Range::new(4, 11)); // "lengthy"
        assert_eq!(applied[0].new_range, Range::new(12, 13)); // "q", shifted by +4
        assert_eq!(
            buf.text_range(applied[0].new_range).unwrap(),
            "q"
        );
        assert_eq!(
            buf.text_range(applied[1].new_range).unwrap(),
            "lengthy"
        );
    }

    #[test]
    fn apply_edits_allows_touching_ranges() {
        let buf = Buffer::new("abcdef", LineEnding::Lf, 4);
        let edits = vec![
            (Range::new(3, 6), "Y".to_string()),
            (Range::new(0, 3), "X".to_string()),
        ];
        assert!(buf.apply_edits(&edits).is_ok());
        assert_eq!(buf.text(), "XY");
    }

    #[test]
    fn text_range_rejects_mid_scalar_bounds() {
        let buf = Buffer::new("a😀b", LineEnding::Lf, 4);
        assert!(matches!(
            buf.text_range(Range::new(1, 3)),
            Err(EngineError::InvalidUtf8 { offset: 3 })
        ));
    }

    #[test]
    fn delete_rejects_selection_landing_inside_a_scalar() {
        let buf = Buffer::new("a😀b", LineEnding::Lf, 4);
        assert!(matches!(
            buf.delete(Range::new(1, 3)),
            Err(EngineError::InvalidUtf8 { offset: 3 })
        ));
        // buffer is untouched
        assert_eq!(buf.text(), "a😀b");
    }
}
