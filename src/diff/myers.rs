//! The Myers shortest-edit-script algorithm over line sequences, plus the
//! position-preserving hash-matching fallback used when the exact algorithm
//! would be too expensive (§4.6).

use std::collections::HashMap;

use super::{CompareFlags, EditOp};

/// Runs the classic O(ND) Myers diff: a `V`-vector of size `2*(n+m)+1`
/// indexed by diagonal `k`, snapshotting `V` at each edit distance `d` so the
/// edit script can be recovered by backtracking.
pub(super) fn shortest_edit_script(
    old_lines: &[String],
    new_lines: &[String],
    flags: CompareFlags,
) -> Vec<EditOp> {
    let n = old_lines.len();
    let m = new_lines.len();
    let max = n + m;
    let offset = max as isize;
    let size = 2 * max + 1;

    let eq = |i: usize, j: usize| flags.lines_equal(&old_lines[i], &new_lines[j]);

    let mut v = vec![0isize; size];
    let mut trace: Vec<Vec<isize>> = Vec::new();

    'outer: for d in 0..=max as isize {
        trace.push(v.clone());
        for k in (-d..=d).step_by(2) {
            let idx = (k + offset) as usize;
            let mut x = if k == -d || (k != d && v[idx - 1] < v[idx + 1]) {
                v[idx + 1]
            } else {
                v[idx - 1] + 1
            };
            let mut y = x - k;
            while (x as usize) < n && (y as usize) < m && eq(x as usize, y as usize) {
                x += 1;
                y += 1;
            }
            v[idx] = x;
            if x as usize >= n && y as usize >= m {
                trace.pop();
                trace.push(v.clone());
                break 'outer;
            }
        }
    }

    backtrack(&trace, n, m, offset)
}

/// Walks `trace` (one `V`-vector snapshot per edit distance) backward from
/// `(n, m)` to `(0, 0)`, emitting [`EditOp`]s in forward order.
fn backtrack(trace: &[Vec<isize>], n: usize, m: usize, offset: isize) -> Vec<EditOp> {
    let mut ops = Vec::new();
    let (mut x, mut y) = (n as isize, m as isize);

    for d in (0..trace.len() as isize).rev() {
        let v = &trace[d as usize];
        let k = x - y;
        let idx = (k + offset) as usize;
        let prev_k = if k == -d || (k != d && v[idx - 1] < v[idx + 1]) {
            k + 1
        } else {
            k - 1
        };
        let prev_idx = (prev_k + offset) as usize;
        let prev_x = v[prev_idx];
        let prev_y = prev_x - prev_k;

        while x > prev_x && y > prev_y {
            ops.push(EditOp::Equal {
                old: (x - 1) as usize,
                new: (y - 1) as usize,
            });
            x -= 1;
            y -= 1;
        }

        if d > 0 {
            if x == prev_x {
                ops.push(EditOp::Insert { new: (y - 1) as usize });
            } else {
                ops.push(EditOp::Delete { old: (x - 1) as usize });
            }
        }
        x = prev_x;
        y = prev_y;
    }

    ops.reverse();
    ops
}

/// Normalizes a line the same way [`CompareFlags::lines_equal`] would for
/// exact matching, so the fallback's hash-based lookup agrees with Myers on
/// what counts as "the same line".
fn normalize_key(line: &str, flags: CompareFlags) -> String {
    let line = if flags.ignore_blank_lines && line.trim().is_empty() {
        ""
    } else if flags.ignore_whitespace {
        line.trim()
    } else {
        line
    };
    if flags.ignore_case {
        line.to_ascii_lowercase()
    } else {
        line.to_string()
    }
}

/// Position-preserving hash-matching fallback for inputs too large for exact
/// Myers (§4.6): for each new line, match it to the first unmatched old
/// occurrence sharing its normalized key, in document order; unmatched old
/// lines become deletions and unmatched new lines become insertions.
pub(super) fn hash_match_fallback(
    old_lines: &[String],
    new_lines: &[String],
    flags: CompareFlags,
) -> Vec<EditOp> {
    let mut old_by_key: HashMap<String, Vec<usize>> = HashMap::new();
    for (i, line) in old_lines.iter().enumerate() {
        old_by_key
            .entry(normalize_key(line, flags))
            .or_default()
            .push(i);
    }

    let mut matched_old = vec![false; old_lines.len()];
    // For each new line, the old index it matches (in document order, first
    // unmatched occurrence), or None.
    let mut match_for_new: Vec<Option<usize>> = Vec::with_capacity(new_lines.len());
    for line in new_lines {
        let key = normalize_key(line, flags);
        let candidate = old_by_key
            .get(&key)
            .and_then(|positions| positions.iter().find(|&&p| !matched_old[p]).copied());
        if let Some(p) = candidate {
            matched_old[p] = true;
        }
        match_for_new.push(candidate);
    }

    // Walk both sequences in order, emitting ops that respect relative
    // position: an old line is a deletion once its index is passed without
    // being the match consumed at the current new cursor; matched pairs
    // become Equal only when they also preserve ordering (old index strictly
    // increasing as we consume new lines), otherwise they're treated as an
    // insert+delete pair to keep emission monotonic.
    let mut ops = Vec::new();
    let mut old_cursor = 0usize;
    let mut consumed_old = vec![false; old_lines.len()];

    for (j, m) in match_for_new.iter().enumerate() {
        match *m {
            Some(old_idx) if old_idx >= old_cursor => {
                while old_cursor < old_idx {
                    if !consumed_old[old_cursor] {
                        ops.push(EditOp::Delete { old: old_cursor });
                        consumed_old[old_cursor] = true;
                    }
                    old_cursor += 1;
                }
                ops.push(EditOp::Equal { old: old_idx, new: j });
                consumed_old[old_idx] = true;
                old_cursor = old_idx + 1;
            }
            _ => {
                ops.push(EditOp::Insert { new: j });
            }
        }
    }
    for (i, consumed) in consumed_old.iter().enumerate() {
        if !consumed {
            ops.push(EditOp::Delete { old: i });
        }
    }

    ops
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(s: &str) -> Vec<String> {
        s.lines().map(str::to_string).collect()
    }

    fn apply(old: &[String], ops: &[EditOp], new: &[String]) -> Vec<String> {
        ops.iter()
            .filter_map(|op| match op {
                EditOp::Equal { old: i, .. } => Some(old[*i].clone()),
                EditOp::Insert { new: j } => Some(new[*j].clone()),
                EditOp::Delete { .. } => None,
            })
            .collect()
    }

    #[test]
    fn myers_reconstructs_target_sequence() {
        let old = lines("a\nb\nc\nd");
        let new = lines("a\nx\nc\nd\ne");
        let ops = shortest_edit_script(&old, &new, CompareFlags::default());
        assert_eq!(apply(&old, &ops, &new), new);
    }

    #[test]
    fn myers_on_fully_disjoint_sequences() {
        let old = lines("a\nb");
        let new = lines("c\nd");
        let ops = shortest_edit_script(&old, &new, CompareFlags::default());
        assert_eq!(apply(&old, &ops, &new), new);
    }

    #[test]
    fn myers_on_identical_sequences_is_all_equal() {
        let old = lines("a\nb\nc");
        let ops = shortest_edit_script(&old, &old.clone(), CompareFlags::default());
        assert!(ops.iter().all(|op| matches!(op, EditOp::Equal { .. })));
    }

    #[test]
    fn fallback_reconstructs_target_sequence() {
        let old = lines("a\nb\nc\nd\ne");
        let new = lines("a\nc\nd\nX\ne");
        let ops = hash_match_fallback(&old, &new, CompareFlags::default());
        assert_eq!(apply(&old, &ops, &new), new);
    }

    #[test]
    fn fallback_handles_duplicate_lines_by_position() {
        let old = lines("x\nx\nx");
        let new = lines("x\nx");
        let ops = hash_match_fallback(&old, &new, CompareFlags::default());
        assert_eq!(apply(&old, &ops, &new), new);
        let deletes = ops.iter().filter(|op| matches!(op, EditOp::Delete { .. })).count();
        assert_eq!(deletes, 1);
    }
}
