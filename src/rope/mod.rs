//! Immutable, persistent B+-tree rope over UTF-8 text.
//!
//! A [`Rope`] is a cheap-to-clone handle (one `Arc` bump) onto a shared,
//! structurally-persistent tree: every mutating method returns a *new*
//! `Rope` sharing untouched subtrees with the original instead of mutating
//! in place. Leaves hold bounded runs of text ([`chunk::MIN_CHUNK`]..
//! [`chunk::MAX_CHUNK`] bytes); internal nodes fan out to
//! [`node::MIN_CHILDREN`]..[`node::MAX_CHILDREN`] children. Every node
//! caches a [`Summary`] so random access, line lookups, and UTF-16
//! conversions are all `O(log n)`.

mod chunk;
pub mod iter;
mod node;
mod point;
mod summary;

use std::fmt;
use std::sync::Arc;

use crate::error::EngineError;
use crate::range::Range;

pub use iter::{Bytes, Chunks, Lines, ReverseRunes, Runes};
pub use point::{Point, PointUtf16};
pub use summary::Summary;

use node::Node;

/// An immutable, structurally-shared run of UTF-8 text.
///
/// Cloning a `Rope` is `O(1)` (an `Arc` clone); every mutation method takes
/// `&self` and returns a new, independent `Rope`.
#[derive(Clone)]
pub struct Rope {
    root: Arc<Node>,
}

impl Rope {
    pub fn new() -> Self {
        Rope {
            root: node::empty_node(),
        }
    }

    pub fn from_str(text: &str) -> Self {
        Rope {
            root: node::from_str(text),
        }
    }

    pub fn len(&self) -> usize {
        self.root.len()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    pub fn summary(&self) -> Summary {
        self.root.summary()
    }

    pub fn line_count(&self) -> usize {
        self.root.summary().line_count()
    }

    fn check_offset(&self, offset: usize) -> Result<(), EngineError> {
        if offset > self.len() {
            return Err(EngineError::OffsetOutOfRange {
                offset,
                len: self.len(),
            });
        }
        Ok(())
    }

    fn check_range(&self, range: Range) -> Result<(), EngineError> {
        if range.start > range.end || range.end > self.len() {
            return Err(EngineError::RangeInvalid {
                start: range.start,
                end: range.end,
                len: self.len(),
            });
        }
        Ok(())
    }

    fn check_boundary(&self, offset: usize) -> Result<(), EngineError> {
        if !self.is_char_boundary(offset) {
            return Err(EngineError::InvalidUtf8 { offset });
        }
        Ok(())
    }

    pub fn byte_at(&self, offset: usize) -> Result<u8, EngineError> {
        if offset >= self.len() {
            return Err(EngineError::OffsetOutOfRange {
                offset,
                len: self.len(),
            });
        }
        Ok(node::byte_at(&self.root, offset))
    }

    pub fn rune_at(&self, offset: usize) -> Result<char, EngineError> {
        if offset >= self.len() {
            return Err(EngineError::OffsetOutOfRange {
                offset,
                len: self.len(),
            });
        }
        self.check_boundary(offset)?;
        Ok(node::rune_at(&self.root, offset))
    }

    pub fn slice(&self, range: Range) -> Result<String, EngineError> {
        self.check_range(range)?;
        self.check_boundary(range.start)?;
        self.check_boundary(range.end)?;
        let mut out = String::new();
        node::collect_range(&self.root, range.as_std(), &mut out);
        Ok(out)
    }

    pub fn to_text(&self) -> String {
        let mut out = String::with_capacity(self.len());
        node::collect_range(&self.root, 0..self.len(), &mut out);
        out
    }

    /// Splits the rope at `offset`, rounding down to the previous `char`
    /// boundary if `offset` doesn't already land on one (§4.1).
    pub fn split(&self, offset: usize) -> Result<(Rope, Rope), EngineError> {
        self.check_offset(offset)?;
        let boundary = self.round_down_to_char_boundary(offset);
        let (l, r) = node::split(&self.root, boundary);
        Ok((Rope { root: l }, Rope { root: r }))
    }

    pub fn concat(&self, other: &Rope) -> Rope {
        Rope {
            root: node::concat(self.root.clone(), other.root.clone()),
        }
    }

    pub fn insert(&self, offset: usize, text: &str) -> Result<Rope, EngineError> {
        self.check_offset(offset)?;
        if offset < self.len() && !self.is_char_boundary(offset) {
            return Err(EngineError::InvalidUtf8 { offset });
        }
        let (l, r) = node::split(&self.root, offset);
        let mid = node::from_str(text);
        let combined = node::concat(node::concat(l, mid), r);
        Ok(Rope { root: combined })
    }

    pub fn delete(&self, range: Range) -> Result<Rope, EngineError> {
        self.check_range(range)?;
        self.check_boundary(range.start)?;
        self.check_boundary(range.end)?;
        let (l, rest) = node::split(&self.root, range.start);
        let (_, r) = node::split(&rest, range.len());
        Ok(Rope {
            root: node::concat(l, r),
        })
    }

    pub fn replace(&self, range: Range, text: &str) -> Result<Rope, EngineError> {
        let deleted = self.delete(range)?;
        deleted.insert(range.start, text)
    }

    fn is_char_boundary(&self, offset: usize) -> bool {
        offset == 0 || offset == self.len() || {
            // A boundary iff the byte at `offset` is not a UTF-8 continuation
            // byte (`0b10xxxxxx`).
            match self.byte_at(offset) {
                Ok(b) => (b & 0b1100_0000) != 0b1000_0000,
                Err(_) => true,
            }
        }
    }

    fn round_down_to_char_boundary(&self, mut offset: usize) -> usize {
        while offset > 0 && offset < self.len() && !self.is_char_boundary(offset) {
            offset -= 1;
        }
        offset
    }

    /// Byte offset of the start of `line` (0-based).
    pub fn line_start_offset(&self, line: usize) -> Result<usize, EngineError> {
        if line >= self.line_count() {
            return Err(EngineError::OffsetOutOfRange {
                offset: line,
                len: self.line_count(),
            });
        }
        if line == 0 {
            return Ok(0);
        }
        Ok(node::nth_newline_offset(&self.root, line - 1).unwrap() + 1)
    }

    /// Byte offset of the end of `line` (the offset of its terminating
    /// newline, or the rope's length for the last line).
    pub fn line_end_offset(&self, line: usize) -> Result<usize, EngineError> {
        if line >= self.line_count() {
            return Err(EngineError::OffsetOutOfRange {
                offset: line,
                len: self.line_count(),
            });
        }
        match node::nth_newline_offset(&self.root, line) {
            Some(p) => Ok(p),
            None => Ok(self.len()),
        }
    }

    pub fn line_text(&self, line: usize) -> Result<String, EngineError> {
        let start = self.line_start_offset(line)?;
        let end = self.line_end_offset(line)?;
        self.slice(Range::new(start, end))
    }

    pub fn line_len(&self, line: usize) -> Result<usize, EngineError> {
        Ok(self.line_end_offset(line)? - self.line_start_offset(line)?)
    }

    pub fn offset_to_point(&self, offset: usize) -> Result<Point, EngineError> {
        self.check_offset(offset)?;
        let line = node::newlines_before(&self.root, offset);
        let line_start = self.line_start_offset(line)?;
        Ok(Point::new(line, offset - line_start))
    }

    pub fn point_to_offset(&self, point: Point) -> Result<usize, EngineError> {
        if point.line >= self.line_count() {
            return Err(EngineError::OffsetOutOfRange {
                offset: point.line,
                len: self.line_count(),
            });
        }
        let start = self.line_start_offset(point.line)?;
        let line_len = self.line_len(point.line)?;
        Ok(start + point.column.min(line_len))
    }

    pub fn offset_to_point_utf16(&self, offset: usize) -> Result<PointUtf16, EngineError> {
        let p = self.offset_to_point(offset)?;
        let line_text = self.line_text(p.line)?;
        Ok(PointUtf16::new(
            p.line,
            point::byte_column_to_utf16(&line_text, p.column),
        ))
    }

    pub fn point_utf16_to_offset(&self, point: PointUtf16) -> Result<usize, EngineError> {
        if point.line >= self.line_count() {
            return Err(EngineError::OffsetOutOfRange {
                offset: point.line,
                len: self.line_count(),
            });
        }
        let line_text = self.line_text(point.line)?;
        let byte_column = point::utf16_column_to_byte(&line_text, point.column);
        self.point_to_offset(Point::new(point.line, byte_column))
    }

    pub fn chunks(&self) -> Chunks {
        Chunks::new(self.root.clone())
    }

    pub fn bytes(&self) -> Bytes {
        Bytes::new(self.root.clone())
    }

    pub fn runes(&self) -> Runes {
        Runes::new(self.root.clone())
    }

    pub fn reverse_runes(&self) -> ReverseRunes {
        ReverseRunes::new(self.root.clone())
    }

    pub fn lines(&self) -> Lines {
        Lines::new(self.root.clone())
    }
}

impl Default for Rope {
    fn default() -> Self {
        Rope::new()
    }
}

impl fmt::Display for Rope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for chunk in self.chunks() {
            f.write_str(&chunk)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Rope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rope")
            .field("len", &self.len())
            .field("line_count", &self.line_count())
            .finish()
    }
}

impl PartialEq for Rope {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.to_text() == other.to_text()
    }
}

impl Eq for Rope {}
