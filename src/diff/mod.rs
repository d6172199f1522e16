//! Line-based diff: a textbook Myers shortest-edit-script over two line
//! sequences, with a position-preserving hash-matching fallback for inputs
//! too large to run Myers on within the configured memory/line budget
//! (§4.6). This is the one subsystem with no single teacher counterpart —
//! built directly from the spec's algorithm description.

mod myers;

use tracing::debug;

use crate::rope::Rope;

/// Per-line comparison rules applied before testing two lines for equality.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CompareFlags {
    pub ignore_case: bool,
    pub ignore_whitespace: bool,
    pub ignore_blank_lines: bool,
}

impl CompareFlags {
    fn lines_equal(&self, a: &str, b: &str) -> bool {
        if self.ignore_blank_lines && a.trim().is_empty() && b.trim().is_empty() {
            return true;
        }
        let (a, b) = if self.ignore_whitespace {
            (a.trim(), b.trim())
        } else {
            (a, b)
        };
        if self.ignore_case {
            a.eq_ignore_ascii_case(b)
        } else {
            a == b
        }
    }
}

/// Controls diff cost/quality tradeoffs: comparison flags, hunk context
/// width, and the thresholds that trigger the heuristic fallback.
#[derive(Clone, Copy, Debug)]
pub struct DiffOptions {
    pub flags: CompareFlags,
    pub context_lines: usize,
    pub max_lines: usize,
    pub max_memory_mb: usize,
}

impl Default for DiffOptions {
    fn default() -> Self {
        DiffOptions {
            flags: CompareFlags::default(),
            context_lines: 3,
            max_lines: 10_000,
            max_memory_mb: 100,
        }
    }
}

/// One line's role within a hunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineStatus {
    Context,
    Deleted,
    Inserted,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiffLine {
    pub status: LineStatus,
    pub text: String,
}

/// A contiguous block of the diff: old/new line ranges (0-based, exclusive
/// end) plus the lines themselves in emission order, including up to
/// `context_lines` of unchanged context on either side.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Hunk {
    pub old_start: usize,
    pub old_len: usize,
    pub new_start: usize,
    pub new_len: usize,
    pub lines: Vec<DiffLine>,
}

/// The full result of diffing two line sequences: an ordered hunk list plus
/// whether the heuristic fallback (rather than exact Myers) produced it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LineDiff {
    pub hunks: Vec<Hunk>,
    pub used_fallback: bool,
}

impl LineDiff {
    pub fn is_empty(&self) -> bool {
        self.hunks.is_empty()
    }
}

/// One raw edit op over line indices, before hunk assembly folds runs of
/// these (plus surrounding context) into [`Hunk`]s.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum EditOp {
    Equal { old: usize, new: usize },
    Delete { old: usize },
    Insert { new: usize },
}

/// Splits a rope's text into lines without trailing terminators, the same
/// shape `old_lines`/`new_lines` take in §4.6.
fn rope_lines(rope: &Rope) -> Vec<String> {
    rope.lines().collect()
}

/// Diffs two ropes line-by-line under `opts`.
pub fn diff_ropes(old: &Rope, new: &Rope, opts: DiffOptions) -> LineDiff {
    diff_lines(&rope_lines(old), &rope_lines(new), opts)
}

/// Diffs two line sequences, choosing Myers or the size-triggered fallback
/// heuristic per §4.6's thresholds.
pub fn diff_lines(old_lines: &[String], new_lines: &[String], opts: DiffOptions) -> LineDiff {
    let n = old_lines.len();
    let m = new_lines.len();

    if n == 0 {
        return assemble_hunks(
            old_lines,
            new_lines,
            (0..m).map(|j| EditOp::Insert { new: j }).collect(),
            opts,
            false,
        );
    }
    if m == 0 {
        return assemble_hunks(
            old_lines,
            new_lines,
            (0..n).map(|i| EditOp::Delete { old: i }).collect(),
            opts,
            false,
        );
    }

    let estimated_bytes = (n + m).saturating_mul(2 * (n + m) + 1).saturating_mul(8);
    let memory_budget = opts.max_memory_mb.saturating_mul(1024 * 1024);
    if n.max(m) > opts.max_lines || estimated_bytes > memory_budget {
        debug!(
            n,
            m, opts.max_lines, opts.max_memory_mb, "diff falling back to hash-matching heuristic"
        );
        let ops = myers::hash_match_fallback(old_lines, new_lines, opts.flags);
        return assemble_hunks(old_lines, new_lines, ops, opts, true);
    }

    let ops = myers::shortest_edit_script(old_lines, new_lines, opts.flags);
    assemble_hunks(old_lines, new_lines, ops, opts, false)
}

/// Folds a flat [`EditOp`] list into [`Hunk`]s, attaching up to
/// `context_lines` unchanged lines around each run of changes and coalescing
/// runs that are within `2 * context_lines` of each other (§4.6).
fn assemble_hunks(
    old_lines: &[String],
    new_lines: &[String],
    ops: Vec<EditOp>,
    opts: DiffOptions,
    used_fallback: bool,
) -> LineDiff {
    let change_indices: Vec<usize> = ops
        .iter()
        .enumerate()
        .filter(|(_, op)| !matches!(op, EditOp::Equal { .. }))
        .map(|(i, _)| i)
        .collect();
    if change_indices.is_empty() {
        return LineDiff {
            hunks: Vec::new(),
            used_fallback,
        };
    }

    let context = opts.context_lines;

    // Group change indices whose surrounding context windows overlap or
    // touch (gap between consecutive changes <= 2*context), per §4.6.
    let mut groups: Vec<(usize, usize)> = Vec::new();
    let (mut group_first, mut group_last) = (change_indices[0], change_indices[0]);
    for &idx in &change_indices[1..] {
        if idx - group_last <= 2 * context {
            group_last = idx;
        } else {
            groups.push((group_first, group_last));
            group_first = idx;
            group_last = idx;
        }
    }
    groups.push((group_first, group_last));

    let hunks = groups
        .into_iter()
        .map(|(first, last)| {
            let window_start = first.saturating_sub(context);
            let window_end = (last + context + 1).min(ops.len());
            build_hunk(old_lines, new_lines, &ops[window_start..window_end])
        })
        .collect();

    LineDiff {
        hunks,
        used_fallback,
    }
}

/// Builds a single [`Hunk`] from a contiguous window of ops already known to
/// contain at least one change, plus its leading/trailing context.
fn build_hunk(old_lines: &[String], new_lines: &[String], window: &[EditOp]) -> Hunk {
    let mut lines = Vec::with_capacity(window.len());
    let (mut old_start, mut new_start) = (None, None);
    let (mut old_len, mut new_len) = (0usize, 0usize);
    for op in window {
        match *op {
            EditOp::Equal { old, new } => {
                old_start.get_or_insert(old);
                new_start.get_or_insert(new);
                lines.push(DiffLine {
                    status: LineStatus::Context,
                    text: old_lines[old].clone(),
                });
                old_len += 1;
                new_len += 1;
            }
            EditOp::Delete { old } => {
                old_start.get_or_insert(old);
                lines.push(DiffLine {
                    status: LineStatus::Deleted,
                    text: old_lines[old].clone(),
                });
                old_len += 1;
            }
            EditOp::Insert { new } => {
                new_start.get_or_insert(new);
                lines.push(DiffLine {
                    status: LineStatus::Inserted,
                    text: new_lines[new].clone(),
                });
                new_len += 1;
            }
        }
    }
    Hunk {
        old_start: old_start.unwrap_or(0),
        old_len,
        new_start: new_start.unwrap_or(0),
        new_len,
        lines,
    }
}

/// Renders `diff` as POSIX unified-diff text:
/// `--- old_name` / `+++ new_name` headers, then `@@ -a,b +c,d @@` per hunk
/// followed by ` `/`-`/`+`-prefixed lines (§4.6, §6.3).
pub fn unified_diff(diff: &LineDiff, old_name: &str, new_name: &str) -> String {
    if diff.is_empty() {
        return String::new();
    }
    let mut out = String::new();
    out.push_str(&format!("--- {old_name}\n"));
    out.push_str(&format!("+++ {new_name}\n"));
    for hunk in &diff.hunks {
        out.push_str(&format!(
            "@@ -{},{} +{},{} @@\n",
            hunk.old_start + 1,
            hunk.old_len,
            hunk.new_start + 1,
            hunk.new_len
        ));
        for line in &hunk.lines {
            let prefix = match line.status {
                LineStatus::Context => ' ',
                LineStatus::Deleted => '-',
                LineStatus::Inserted => '+',
            };
            out.push(prefix);
            out.push_str(&line.text);
            out.push('\n');
        }
    }
    out
}
