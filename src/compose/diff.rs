// ABOUTME: Path-keyed drift detection between a composed workspace and a fresh worktree scan

use crate::models::{ComposedWorktree, ScannedWorktree, WorktreeChange};
use std::collections::HashMap;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WorktreeDiff {
    pub added: Vec<ScannedWorktree>,
    pub removed: Vec<ScannedWorktree>,
    pub changed: Vec<WorktreeChange>,
}

/// Compares by path. A path present in both counts as changed only when its
/// live branch or merged flag moved. Removed entries keep their last-known fields.
pub fn diff_worktrees(previous: &[ComposedWorktree], current: &[ScannedWorktree]) -> WorktreeDiff {
    let before: HashMap<&str, &ScannedWorktree> = previous
        .iter()
        .map(|w| (w.path(), &w.worktree))
        .collect();
    let after: HashMap<&str, &ScannedWorktree> =
        current.iter().map(|w| (w.path.as_str(), w)).collect();

    let mut diff = WorktreeDiff::default();

    for worktree in current {
        match before.get(worktree.path.as_str()) {
            None => diff.added.push(worktree.clone()),
            Some(old) => {
                if old.current_branch != worktree.current_branch || old.merged != worktree.merged {
                    diff.changed.push(WorktreeChange {
                        old: (*old).clone(),
                        new: worktree.clone(),
                    });
                }
            }
        }
    }

    diff.removed = previous
        .iter()
        .filter(|w| !after.contains_key(w.path()))
        .map(|w| w.worktree.clone())
        .collect();

    diff
}
