//! Lazy, finite, non-restartable traversals over a rope's text:
//! chunk/byte/rune iteration forward, plus a chunk-cached reverse rune
//! iterator for backward cursor movement.

use std::sync::Arc;

use super::node::Node;

/// Depth-first, left-to-right traversal yielding each leaf chunk's text as a
/// cheaply-cloned `Arc<str>`. Stack depth is `O(tree height)`; each node is
/// visited exactly once, so a full traversal is `O(n)` over the rope's
/// chunks.
pub struct Chunks {
    stack: Vec<(Arc<Node>, usize)>,
}

impl Chunks {
    pub(crate) fn new(root: Arc<Node>) -> Self {
        let mut stack = Vec::new();
        if !root.is_empty() || matches!(&*root, Node::Leaf(_)) {
            stack.push((root, 0));
        }
        Chunks { stack }
    }
}

impl Iterator for Chunks {
    type Item = Arc<str>;

    fn next(&mut self) -> Option<Arc<str>> {
        loop {
            let (node, idx) = self.stack.last_mut()?;
            match &**node {
                Node::Leaf(leaf) => {
                    if *idx < leaf.chunks.len() {
                        let chunk = leaf.chunks[*idx].clone();
                        *idx += 1;
                        return Some(chunk.into_arc_str());
                    }
                    self.stack.pop();
                }
                Node::Internal(internal) => {
                    if *idx < internal.children.len() {
                        let child = internal.children[*idx].clone();
                        *idx += 1;
                        self.stack.push((child, 0));
                    } else {
                        self.stack.pop();
                    }
                }
            }
        }
    }
}

/// Right-to-left mirror of [`Chunks`].
pub(crate) struct ReverseChunks {
    stack: Vec<(Arc<Node>, isize)>,
}

fn last_index(node: &Node) -> isize {
    match node {
        Node::Leaf(leaf) => leaf.chunks.len() as isize - 1,
        Node::Internal(internal) => internal.children.len() as isize - 1,
    }
}

impl ReverseChunks {
    pub(crate) fn new(root: Arc<Node>) -> Self {
        let mut stack = Vec::new();
        if !root.is_empty() || matches!(&*root, Node::Leaf(_)) {
            let idx = last_index(&root);
            stack.push((root, idx));
        }
        ReverseChunks { stack }
    }
}

impl Iterator for ReverseChunks {
    type Item = Arc<str>;

    fn next(&mut self) -> Option<Arc<str>> {
        loop {
            let (node, idx) = self.stack.last_mut()?;
            match &**node {
                Node::Leaf(leaf) => {
                    if *idx >= 0 {
                        let chunk = leaf.chunks[*idx as usize].clone();
                        *idx -= 1;
                        return Some(chunk.into_arc_str());
                    }
                    self.stack.pop();
                }
                Node::Internal(internal) => {
                    if *idx >= 0 {
                        let child = internal.children[*idx as usize].clone();
                        *idx -= 1;
                        let child_idx = last_index(&child);
                        self.stack.push((child, child_idx));
                    } else {
                        self.stack.pop();
                    }
                }
            }
        }
    }
}

/// Forward byte iterator built on [`Chunks`].
pub struct Bytes {
    chunks: Chunks,
    current: Arc<str>,
    pos: usize,
}

impl Bytes {
    pub(crate) fn new(root: Arc<Node>) -> Self {
        Bytes {
            chunks: Chunks::new(root),
            current: Arc::from(""),
            pos: 0,
        }
    }
}

impl Iterator for Bytes {
    type Item = u8;

    fn next(&mut self) -> Option<u8> {
        loop {
            if self.pos < self.current.len() {
                let b = self.current.as_bytes()[self.pos];
                self.pos += 1;
                return Some(b);
            }
            self.current = self.chunks.next()?;
            self.pos = 0;
        }
    }
}

/// Forward rune (`char`) iterator built on [`Chunks`].
pub struct Runes {
    chunks: Chunks,
    current: Arc<str>,
    pos: usize,
}

impl Runes {
    pub(crate) fn new(root: Arc<Node>) -> Self {
        Runes {
            chunks: Chunks::new(root),
            current: Arc::from(""),
            pos: 0,
        }
    }
}

impl Iterator for Runes {
    type Item = char;

    fn next(&mut self) -> Option<char> {
        loop {
            if self.pos < self.current.len() {
                let ch = self.current[self.pos..].chars().next().unwrap();
                self.pos += ch.len_utf8();
                return Some(ch);
            }
            self.current = self.chunks.next()?;
            self.pos = 0;
        }
    }
}

/// Backward rune iterator. Maintains a cached current chunk and a cursor
/// into it so each rune after the first in a chunk costs `O(1)` (UTF-8 is
/// self-synchronizing, so finding the previous char's start from a known
/// boundary never rescans more than 4 bytes); only crossing a chunk boundary
/// costs the amortized `O(1)` of pulling the next chunk off the stack.
pub struct ReverseRunes {
    chunks: ReverseChunks,
    current: Arc<str>,
    pos: usize,
}

impl ReverseRunes {
    pub(crate) fn new(root: Arc<Node>) -> Self {
        ReverseRunes {
            chunks: ReverseChunks::new(root),
            current: Arc::from(""),
            pos: 0,
        }
    }
}

impl Iterator for ReverseRunes {
    type Item = char;

    fn next(&mut self) -> Option<char> {
        loop {
            if self.pos > 0 {
                let ch = self.current[..self.pos].chars().next_back().unwrap();
                self.pos -= ch.len_utf8();
                return Some(ch);
            }
            self.current = self.chunks.next()?;
            self.pos = self.current.len();
        }
    }
}

/// Forward line iterator: yields each line's text without its terminator,
/// including a trailing empty line if the rope ends with a newline (so the
/// number of items always equals the rope's `line_count()`). Built directly
/// on [`Chunks`] rather than on repeated `line_text` lookups, so a full
/// traversal amortizes to `O(n)` instead of `O(line_count * log n)`.
pub struct Lines {
    chunks: Chunks,
    pending: String,
    exhausted: bool,
    finished: bool,
}

impl Lines {
    pub(crate) fn new(root: Arc<Node>) -> Self {
        Lines {
            chunks: Chunks::new(root),
            pending: String::new(),
            exhausted: false,
            finished: false,
        }
    }
}

impl Iterator for Lines {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.finished {
            return None;
        }
        loop {
            if let Some(pos) = self.pending.find('\n') {
                let line = self.pending[..pos].to_string();
                self.pending.drain(..=pos);
                return Some(line);
            }
            if self.exhausted {
                self.finished = true;
                return Some(std::mem::take(&mut self.pending));
            }
            match self.chunks.next() {
                Some(chunk) => self.pending.push_str(&chunk),
                None => self.exhausted = true,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rope::node::from_str;

    #[test]
    fn chunks_concat_to_original() {
        let text = "hello world\nfoo bar baz\n".repeat(30);
        let node = from_str(&text);
        let joined: String = Chunks::new(node).collect::<Vec<_>>().join("");
        assert_eq!(joined, text);
    }

    #[test]
    fn bytes_and_runes_match_std() {
        let text = "ab😀cd\nef";
        let node = from_str(text);
        let bytes: Vec<u8> = Bytes::new(node.clone()).collect();
        assert_eq!(bytes, text.as_bytes().to_vec());
        let runes: Vec<char> = Runes::new(node).collect();
        assert_eq!(runes, text.chars().collect::<Vec<_>>());
    }

    #[test]
    fn reverse_runes_is_forward_reversed() {
        let text = "the quick brown 狐 jumps\nover the lazy 犬\n";
        let node = from_str(text);
        let forward: Vec<char> = Runes::new(node.clone()).collect();
        let mut backward: Vec<char> = ReverseRunes::new(node).collect();
        backward.reverse();
        assert_eq!(forward, backward);
    }

    #[test]
    fn lines_yields_trailing_empty_line() {
        let node = from_str("a\nb\n");
        let lines: Vec<String> = Lines::new(node).collect();
        assert_eq!(lines, vec!["a".to_string(), "b".to_string(), String::new()]);
    }

    #[test]
    fn lines_without_trailing_newline() {
        let node = from_str("a\nb");
        let lines: Vec<String> = Lines::new(node).collect();
        assert_eq!(lines, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn lines_of_empty_rope_is_one_empty_line() {
        let node = from_str("");
        let lines: Vec<String> = Lines::new(node).collect();
        assert_eq!(lines, vec![String::new()]);
    }
}
