// ABOUTME: Workspace composition - merges git worktree scans with persisted UI metadata and reconciles drift

pub mod composer;
pub mod diff;
pub mod merge;
pub mod reconcile;

pub use composer::WorkspaceComposer;
pub use diff::{diff_worktrees, WorktreeDiff};
pub use merge::{merge_worktrees, resolve_selection, MergeOptions};
pub use reconcile::{plan_reconciliation, ReconcilePlan};
