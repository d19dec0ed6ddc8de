//! Snapshot comparison: per-path change detection and value-level diffs

mod diff;

pub use diff::{detect_change, diff_trees, Change, Diff, DiffEntry, SubtreeChange};
