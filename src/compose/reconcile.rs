// ABOUTME: Orphaned metadata retention - plans path migrations, orphan stamps and expiry pruning after a rescan

use crate::models::{ComposedWorktree, MetadataSource, ReconcileReport, WorkspaceUiPatch, WorkspaceUiState};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ReconcilePlan {
    /// Migrations and prunes, applied in one store update.
    pub patch: WorkspaceUiPatch,
    /// Entries that need `orphaned_at` stamped with the plan's time.
    pub mark_orphaned: Vec<String>,
    /// Entries claimed again whose `orphaned_at` must be cleared.
    pub restore: Vec<String>,
    pub report: ReconcileReport,
}

/// Works out which store changes bring `stored` in line with `composed`.
///
/// Metadata matched by branch is re-keyed under the worktree's new path.
/// Unclaimed entries are stamped as orphaned on first sight and pruned once
/// they have stayed orphaned for `retention`.
pub fn plan_reconciliation(
    stored: &WorkspaceUiState,
    composed: &[ComposedWorktree],
    now: DateTime<Utc>,
    retention: Duration,
) -> ReconcilePlan {
    let mut plan = ReconcilePlan::default();
    let mut claimed: HashSet<&str> = HashSet::new();

    for worktree in composed {
        match &worktree.metadata_source {
            MetadataSource::Stored => {
                claimed.insert(worktree.path());
                let was_orphaned = stored
                    .worktrees
                    .get(worktree.path())
                    .is_some_and(|entry| entry.orphaned_at.is_some());
                if was_orphaned {
                    plan.restore.push(worktree.path().to_string());
                }
            }
            MetadataSource::BranchFallback { previous_path } => {
                claimed.insert(previous_path.as_str());
                plan.patch.remove_worktrees.push(previous_path.clone());
                plan.patch
                    .upsert_worktrees
                    .insert(worktree.path().to_string(), worktree.ui.clone());
                plan.report
                    .migrated
                    .push((previous_path.clone(), worktree.path().to_string()));

                if stored.active_worktree_path.as_deref() == Some(previous_path.as_str()) {
                    plan.patch.active_worktree_path = Some(Some(worktree.path().to_string()));
                }
            }
            MetadataSource::Default => {}
        }
    }

    for (path, entry) in &stored.worktrees {
        if claimed.contains(path.as_str()) {
            continue;
        }
        match entry.orphaned_at {
            None => plan.mark_orphaned.push(path.clone()),
            Some(since) if now - since >= retention => {
                plan.patch.remove_worktrees.push(path.clone());
                plan.report.pruned.push(path.clone());
            }
            Some(_) => {}
        }
    }

    plan.report.marked_orphaned.clone_from(&plan.mark_orphaned);
    plan.report.restored.clone_from(&plan.restore);
    plan
}
