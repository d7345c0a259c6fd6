// ABOUTME: Merges git-scanned worktrees with stored UI metadata - git owns identity fields, the UI owns tabs

use crate::models::{
    ComposedSelection, ComposedWorktree, MetadataSource, ScannedWorktree, WorkspaceUiState,
    WorktreeUiMetadata,
};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeOptions {
    pub now: DateTime<Utc>,
    /// Refuse a branch match when more than one unclaimed entry carries the branch.
    pub require_unique_branch_fallback: bool,
}

/// Resolves UI metadata for every scanned worktree, in scan order.
///
/// Exact path matches are claimed first so a moved worktree can never take
/// metadata that still belongs to a worktree at its original path.
pub fn merge_worktrees(
    scanned: Vec<ScannedWorktree>,
    stored: &WorkspaceUiState,
    options: MergeOptions,
) -> Vec<ComposedWorktree> {
    let mut claimed: HashSet<&str> = scanned
        .iter()
        .filter_map(|w| stored.worktrees.get_key_value(&w.path))
        .map(|(path, _)| path.as_str())
        .collect();

    let mut composed = Vec::with_capacity(scanned.len());

    for worktree in scanned {
        let (mut ui, source) = if let Some(existing) = stored.worktrees.get(&worktree.path) {
            (existing.clone(), MetadataSource::Stored)
        } else if let Some((previous_path, existing)) =
            branch_fallback(stored, &claimed, &worktree.current_branch, options)
        {
            debug!(
                "Matched metadata for {} by branch {} (was {})",
                worktree.path, worktree.current_branch, previous_path
            );
            claimed.insert(previous_path);
            (
                existing.clone(),
                MetadataSource::BranchFallback {
                    previous_path: previous_path.to_string(),
                },
            )
        } else {
            (
                WorktreeUiMetadata::empty(&worktree.path, &worktree.current_branch, options.now),
                MetadataSource::Default,
            )
        };

        ui.path.clone_from(&worktree.path);
        ui.branch.clone_from(&worktree.current_branch);
        ui.merged = worktree.merged;
        ui.orphaned_at = None;

        composed.push(ComposedWorktree {
            worktree,
            ui,
            metadata_source: source,
        });
    }

    composed
}

fn branch_fallback<'a>(
    stored: &'a WorkspaceUiState,
    claimed: &HashSet<&str>,
    branch: &str,
    options: MergeOptions,
) -> Option<(&'a str, &'a WorktreeUiMetadata)> {
    if branch.is_empty() || branch == "HEAD" {
        return None;
    }

    let mut candidates = stored
        .worktrees
        .iter()
        .filter(|(path, meta)| meta.branch == branch && !claimed.contains(path.as_str()))
        .map(|(path, meta)| (path.as_str(), meta));

    let first = candidates.next()?;
    if options.require_unique_branch_fallback && candidates.next().is_some() {
        debug!("Branch {} is ambiguous across stored metadata, not matching", branch);
        return None;
    }
    Some(first)
}

/// Workspace-level selection. A stored active path that moved with its branch
/// follows the move.
pub fn resolve_selection(
    stored: &WorkspaceUiState,
    worktrees: &[ComposedWorktree],
) -> ComposedSelection {
    let Some(active) = stored.active_worktree_path.as_deref() else {
        return ComposedSelection::default();
    };

    let active_worktree = worktrees.iter().find(|w| w.path() == active).or_else(|| {
        worktrees.iter().find(|w| {
            matches!(&w.metadata_source, MetadataSource::BranchFallback { previous_path } if previous_path == active)
        })
    });

    match active_worktree {
        Some(worktree) => ComposedSelection {
            active_worktree_path: Some(worktree.path().to_string()),
            active_tab_id: worktree.ui.active_tab_id.clone(),
        },
        None => ComposedSelection {
            active_worktree_path: Some(active.to_string()),
            active_tab_id: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Tab;
    use pretty_assertions::assert_eq;

    fn scanned(path: &str, current_branch: &str) -> ScannedWorktree {
        ScannedWorktree {
            path: path.to_string(),
            branch: current_branch.to_string(),
            bare: false,
            current_branch: current_branch.to_string(),
            merged: false,
        }
    }

    fn stored_entry(path: &str, branch: &str) -> WorktreeUiMetadata {
        let mut meta = WorktreeUiMetadata::empty(path, branch, Utc::now());
        let tab = Tab::terminal("shell", path);
        meta.active_tab_id = Some(tab.id.clone());
        meta.tabs = vec![tab];
        meta
    }

    fn options() -> MergeOptions {
        MergeOptions {
            now: Utc::now(),
            require_unique_branch_fallback: true,
        }
    }

    #[test]
    fn test_git_identity_overrides_stored_fields() {
        let mut stored = WorkspaceUiState::default();
        let mut entry = stored_entry("/wt/a", "stale-branch");
        entry.merged = true;
        stored.worktrees.insert("/wt/a".into(), entry.clone());

        let mut scan = scanned("/wt/a", "feature");
        scan.branch = "recorded".into();
        let composed = merge_worktrees(vec![scan], &stored, options());

        let ui = &composed[0].ui;
        assert_eq!(ui.path, "/wt/a");
        assert_eq!(ui.branch, "feature");
        assert!(!ui.merged);
        assert_eq!(ui.tabs, entry.tabs);
        assert_eq!(composed[0].metadata_source, MetadataSource::Stored);
    }

    #[test]
    fn test_branch_fallback_moves_metadata() {
        let mut stored = WorkspaceUiState::default();
        stored.worktrees.insert("/old".into(), stored_entry("/old", "feature"));

        let composed = merge_worktrees(vec![scanned("/new", "feature")], &stored, options());
        assert_eq!(composed[0].ui.path, "/new");
        assert_eq!(composed[0].ui.tabs.len(), 1);
        assert_eq!(
            composed[0].metadata_source,
            MetadataSource::BranchFallback {
                previous_path: "/old".into()
            }
        );
    }

    #[test]
    fn test_exact_match_wins_over_fallback() {
        let mut stored = WorkspaceUiState::default();
        stored.worktrees.insert("/a".into(), stored_entry("/a", "feature"));

        // "/b" scans first but must not steal "/a"'s metadata
        let composed = merge_worktrees(
            vec![scanned("/b", "feature"), scanned("/a", "feature")],
            &stored,
            options(),
        );
        assert_eq!(composed[0].metadata_source, MetadataSource::Default);
        assert_eq!(composed[1].metadata_source, MetadataSource::Stored);
    }

    #[test]
    fn test_ambiguous_branch_fallback_refused() {
        let mut stored = WorkspaceUiState::default();
        stored.worktrees.insert("/x".into(), stored_entry("/x", "feature"));
        stored.worktrees.insert("/y".into(), stored_entry("/y", "feature"));

        let composed = merge_worktrees(vec![scanned("/new", "feature")], &stored, options());
        assert_eq!(composed[0].metadata_source, MetadataSource::Default);
        assert!(composed[0].ui.tabs.is_empty());

        let lenient = MergeOptions {
            require_unique_branch_fallback: false,
            ..options()
        };
        let composed = merge_worktrees(vec![scanned("/new", "feature")], &stored, lenient);
        assert_eq!(
            composed[0].metadata_source,
            MetadataSource::BranchFallback {
                previous_path: "/x".into()
            }
        );
    }

    #[test]
    fn test_detached_head_never_matches_by_branch() {
        let mut stored = WorkspaceUiState::default();
        stored.worktrees.insert("/old".into(), stored_entry("/old", "HEAD"));

        let composed = merge_worktrees(vec![scanned("/new", "HEAD")], &stored, options());
        assert_eq!(composed[0].metadata_source, MetadataSource::Default);
    }

    #[test]
    fn test_default_metadata_shape() {
        let opts = options();
        let composed = merge_worktrees(vec![scanned("/wt", "main")], &WorkspaceUiState::default(), opts);
        assert_eq!(
            composed[0].ui,
            WorktreeUiMetadata::empty("/wt", "main", opts.now)
        );
    }

    #[test]
    fn test_selection_follows_branch_move() {
        let mut stored = WorkspaceUiState::default();
        let entry = stored_entry("/old", "feature");
        let tab_id = entry.active_tab_id.clone();
        stored.worktrees.insert("/old".into(), entry);
        stored.active_worktree_path = Some("/old".into());

        let composed = merge_worktrees(vec![scanned("/new", "feature")], &stored, options());
        let selection = resolve_selection(&stored, &composed);
        assert_eq!(selection.active_worktree_path.as_deref(), Some("/new"));
        assert_eq!(selection.active_tab_id, tab_id);
    }

    #[test]
    fn test_selection_of_missing_worktree_has_no_tab() {
        let stored = WorkspaceUiState {
            active_worktree_path: Some("/gone".into()),
            ..Default::default()
        };
        let selection = resolve_selection(&stored, &[]);
        assert_eq!(selection.active_worktree_path.as_deref(), Some("/gone"));
        assert!(selection.active_tab_id.is_none());

        assert_eq!(
            resolve_selection(&WorkspaceUiState::default(), &[]),
            ComposedSelection::default()
        );
    }
}
