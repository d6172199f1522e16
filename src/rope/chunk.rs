//! Leaf-level text chunks: bounded, immutable strings with a precomputed
//! newline index.

use smallvec::SmallVec;
use std::sync::Arc;

use super::summary::Summary;

/// Chunks prefer to stay at or below this many bytes.
pub const MAX_CHUNK: usize = 256;
/// Chunks prefer to stay at or above this many bytes (the final chunk of the
/// rope is exempt).
pub const MIN_CHUNK: usize = 128;
/// A leaf aggregates up to this many chunks.
pub const MAX_CHUNKS_PER_LEAF: usize = 8;

/// An immutable, bounded run of UTF-8 text stored in a leaf, plus a compact
/// index of newline byte-offsets within it. Up to 4 newlines are stored
/// inline (no heap allocation); chunks with more spill `SmallVec` onto the
/// heap transparently.
#[derive(Clone, Debug)]
pub struct Chunk {
    text: Arc<str>,
    summary: Summary,
    newlines: SmallVec<[u32; 4]>,
}

impl Chunk {
    pub fn new(text: Arc<str>) -> Self {
        let summary = Summary::for_chunk(&text);
        let newlines = text
            .bytes()
            .enumerate()
            .filter(|(_, b)| *b == b'\n')
            .map(|(i, _)| i as u32)
            .collect();
        Chunk {
            text,
            summary,
            newlines,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Clones the chunk's underlying `Arc<str>` (cheap refcount bump), for
    /// iterators that hand out owned chunk text instead of borrowing it.
    pub fn into_arc_str(self) -> Arc<str> {
        self.text
    }

    pub fn summary(&self) -> Summary {
        self.summary
    }

    pub fn len(&self) -> usize {
        self.summary.bytes
    }

    pub fn is_empty(&self) -> bool {
        self.summary.bytes == 0
    }

    pub fn newline_count(&self) -> usize {
        self.newlines.len()
    }

    /// Byte offset (within this chunk) of the `ordinal`-th newline (0-based).
    pub fn nth_newline(&self, ordinal: usize) -> Option<usize> {
        self.newlines.get(ordinal).map(|&o| o as usize)
    }

    /// First newline offset `>= from` within this chunk, if any.
    pub fn first_newline_at_or_after(&self, from: usize) -> Option<usize> {
        let idx = self.newlines.partition_point(|&o| (o as usize) < from);
        self.newlines.get(idx).map(|&o| o as usize)
    }

    /// Last newline offset `< from` within this chunk, if any.
    pub fn last_newline_before(&self, from: usize) -> Option<usize> {
        let idx = self.newlines.partition_point(|&o| (o as usize) < from);
        if idx == 0 {
            None
        } else {
            Some(self.newlines[idx - 1] as usize)
        }
    }

    /// Number of newlines at byte offsets `< at`.
    pub fn newlines_before(&self, at: usize) -> usize {
        self.newlines.partition_point(|&o| (o as usize) < at)
    }
}

/// Split `text` into chunks of at most [`MAX_CHUNK`] bytes, preferring to
/// cut immediately after a newline within a `±MIN_CHUNK/4` window of the
/// target boundary, and never inside a UTF-8 scalar.
pub fn chunk_str(text: &str) -> SmallVec<[Chunk; 4]> {
    let mut out = SmallVec::new();
    let mut rest = text;
    while !rest.is_empty() {
        if rest.len() <= MAX_CHUNK {
            out.push(Chunk::new(Arc::from(rest)));
            break;
        }
        let split = pick_split_point(rest, MAX_CHUNK);
        let (head, tail) = rest.split_at(split);
        out.push(Chunk::new(Arc::from(head)));
        rest = tail;
    }
    out
}

/// Choose a byte offset at most `target` within `text` to split at,
/// preferring a position right after a newline inside a small window, and
/// always landing on a `char` boundary.
fn pick_split_point(text: &str, target: usize) -> usize {
    let window = (MIN_CHUNK / 4).max(1);
    let lo = target.saturating_sub(window);
    let hi = (target + window).min(text.len());

    if let Some(rel) = text.as_bytes()[lo..hi].iter().rposition(|&b| b == b'\n') {
        return lo + rel + 1;
    }

    let mut split = target.min(text.len());
    while split > 0 && !text.is_char_boundary(split) {
        split -= 1;
    }
    if split == 0 {
        // target fell inside the first scalar; advance to the next boundary
        // instead of producing an empty chunk.
        split = target.min(text.len());
        while split < text.len() && !text.is_char_boundary(split) {
            split += 1;
        }
    }
    split
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunking_roundtrips() {
        let text = "a".repeat(1000);
        let chunks = chunk_str(&text);
        let joined: String = chunks.iter().map(|c| c.as_str()).collect();
        assert_eq!(joined, text);
        assert!(chunks.iter().all(|c| c.len() <= MAX_CHUNK));
    }

    #[test]
    fn chunking_respects_utf8_boundaries() {
        let text = "é".repeat(200); // 2 bytes each, 400 bytes total
        let chunks = chunk_str(&text);
        let joined: String = chunks.iter().map(|c| c.as_str()).collect();
        assert_eq!(joined, text);
    }

    #[test]
    fn newline_index_queries() {
        let c = Chunk::new(Arc::from("ab\ncd\nef\n"));
        assert_eq!(c.newline_count(), 3);
        assert_eq!(c.nth_newline(0), Some(2));
        assert_eq!(c.nth_newline(1), Some(5));
        assert_eq!(c.first_newline_at_or_after(3), Some(5));
        assert_eq!(c.last_newline_before(5), Some(2));
        assert_eq!(c.newlines_before(6), 2);
    }
}
