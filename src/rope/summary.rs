//! Monoidal per-subtree summary carried by every rope node.
//!
//! A [`Summary`] aggregates everything the rest of the rope needs to answer
//! random-access and line/column queries in `O(log n)` without re-scanning
//! text: byte count, UTF-16 unit count, newline count, and the lengths of
//! the first/last/longest line in the subtree. Concatenating two summaries
//! is a monoid operation — the boundary between the two subtrees may join
//! the left subtree's last (newline-less) line to the right subtree's first
//! line, which is why `first_line_len`/`last_line_len`/`longest_line_len`
//! need their own merge rules instead of simple addition.

/// Aggregate metrics for a rope subtree. The identity element is
/// [`Summary::default`] (the empty subtree); concatenation via
/// [`Summary::concat`] is associative, so parent summaries equal the
/// monoid sum of their children's summaries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub bytes: usize,
    pub utf16_len: usize,
    pub newlines: usize,
    /// Length in bytes of the subtree's first line, up to (not including) its
    /// terminating newline, or the whole subtree length if it has none.
    pub first_line_len: usize,
    /// Length in bytes of the subtree's last line, counted from the last
    /// newline (exclusive) to the end, or the whole subtree length if it has
    /// none.
    pub last_line_len: usize,
    pub longest_line_len: usize,
    pub is_ascii: bool,
    pub has_tab: bool,
}

impl Summary {
    pub fn for_chunk(text: &str) -> Self {
        let bytes = text.len();
        let mut utf16_len = 0usize;
        let mut newlines = 0usize;
        let mut is_ascii = true;
        let mut has_tab = false;
        let mut longest_line_len = 0usize;
        let mut first_line_len = None;
        let mut line_start = 0usize;

        for (i, ch) in text.char_indices() {
            utf16_len += ch.len_utf16();
            if !ch.is_ascii() {
                is_ascii = false;
            }
            if ch == '\t' {
                has_tab = true;
            }
            if ch == '\n' {
                newlines += 1;
                let line_len = i - line_start;
                if first_line_len.is_none() {
                    first_line_len = Some(line_len);
                }
                longest_line_len = longest_line_len.max(line_len);
                line_start = i + 1;
            }
        }
        let last_line_len = bytes - line_start;
        longest_line_len = longest_line_len.max(last_line_len);
        let first_line_len = first_line_len.unwrap_or(last_line_len);

        Summary {
            bytes,
            utf16_len,
            newlines,
            first_line_len,
            last_line_len,
            longest_line_len,
            is_ascii,
            has_tab,
        }
    }

    /// Merge `self` followed by `other` into the summary of their
    /// concatenation. `self` represents the left subtree, `other` the right.
    pub fn concat(&self, other: &Summary) -> Summary {
        if self.bytes == 0 {
            return *other;
        }
        if other.bytes == 0 {
            return *self;
        }

        let first_line_len = if self.newlines == 0 {
            self.first_line_len + other.first_line_len
        } else {
            self.first_line_len
        };
        let last_line_len = if other.newlines == 0 {
            self.last_line_len + other.last_line_len
        } else {
            other.last_line_len
        };
        let boundary_line_len = self.last_line_len + other.first_line_len;
        let longest_line_len = self
            .longest_line_len
            .max(other.longest_line_len)
            .max(boundary_line_len);

        Summary {
            bytes: self.bytes + other.bytes,
            utf16_len: self.utf16_len + other.utf16_len,
            newlines: self.newlines + other.newlines,
            first_line_len,
            last_line_len,
            longest_line_len,
            is_ascii: self.is_ascii && other.is_ascii,
            has_tab: self.has_tab || other.has_tab,
        }
    }

    pub fn line_count(&self) -> usize {
        self.newlines + 1
    }
}
