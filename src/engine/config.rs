//! Construction-time configuration for [`super::Engine`] (§6.1).

use crate::buffer::LineEnding;

/// Options recognized when constructing an [`super::Engine`]. Plain public
/// fields plus `Default`, matching the teacher's `InputBoxConfig` /
/// `UndoTree::with_config` pattern over a builder type with setter methods.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Text to seed the buffer with.
    pub initial_content: String,
    /// Column width a tab character is assumed to occupy, for callers that
    /// render columns. Does not affect storage.
    pub tab_width: u32,
    /// Line terminator every write is normalized to.
    pub line_ending: LineEnding,
    /// Oldest undo entries are evicted once the stack exceeds this size.
    pub max_undo_entries: usize,
    /// Ring-buffer capacity for [`crate::tracker::Tracker::record_change`].
    pub max_changes: usize,
    /// Capacity of the tracker's revision → pre-edit-rope map.
    pub max_revisions: usize,
    /// When true, every mutating engine call fails with [`crate::error::EngineError::ReadOnly`].
    pub read_only: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            initial_content: String::new(),
            tab_width: 4,
            line_ending: LineEnding::Lf,
            max_undo_entries: 1000,
            max_changes: 10_000,
            max_revisions: 100,
            read_only: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let config = EngineConfig::default();
        assert_eq!(config.tab_width, 4);
        assert_eq!(config.line_ending, LineEnding::Lf);
        assert_eq!(config.max_undo_entries, 1000);
        assert_eq!(config.max_changes, 10_000);
        assert_eq!(config.max_revisions, 100);
        assert!(!config.read_only);
    }
}
