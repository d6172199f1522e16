//! quill-core: the embeddable, thread-safe transactional core of a text
//! editor — rope storage, multi-cursor selections, undo/redo history, a
//! bounded change tracker with named snapshots, and a Myers line-diff
//! engine, composed behind a single atomic [`engine::Engine`] façade.
//!
//! This crate has no UI, no input dispatch, no syntax highlighting, and no
//! file I/O beyond accepting a byte stream at construction; those are the
//! responsibility of an embedding application. See [`engine::Engine`] for
//! the entry point.

pub mod change;
pub mod cursor;
pub mod diff;
pub mod engine;
pub mod error;
pub mod history;
pub mod ids;
pub mod range;
pub mod rope;
pub mod tracker;

mod buffer;

pub use buffer::{AppliedEdit, Buffer, LineEnding, Snapshot};
pub use change::{Change, ChangeKind};
pub use cursor::{CursorSet, Selection};
pub use engine::{Engine, EngineConfig};
pub use error::EngineError;
pub use history::Checkpoint;
pub use ids::{RevisionId, SnapshotId};
pub use range::Range;
pub use rope::Rope;
