// ABOUTME: Workspace and worktree models - git scan results, composed worktree state and rescan diffs

use crate::models::WorktreeUiMetadata;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A repository binding and the logical home of its worktrees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    pub id: String,
    pub name: String,
    pub repo_path: String,
    pub default_branch: String,
}

impl Workspace {
    pub fn new(id: impl Into<String>, repo_path: impl Into<String>) -> Self {
        let repo_path = repo_path.into();
        let name = Path::new(&repo_path)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();

        Self {
            id: id.into(),
            name,
            repo_path,
            default_branch: crate::DEFAULT_MAIN_BRANCH.to_string(),
        }
    }

    /// Derives a filesystem-safe workspace id from the repository directory name.
    pub fn id_for_repo(repo_path: &str) -> String {
        let name = Path::new(repo_path)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown-repo");

        let sanitized = name
            .chars()
            .map(|c| match c {
                'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' => c,
                _ => '-',
            })
            .collect::<String>()
            .trim_matches('-')
            .to_string();

        if sanitized.is_empty() {
            "unknown-repo".to_string()
        } else {
            sanitized
        }
    }
}

/// One entry of `git worktree list`, before any live lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListedWorktree {
    pub path: String,
    /// Branch recorded in worktree metadata. `"HEAD"` when detached, empty for bare entries.
    pub branch: String,
    pub bare: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScannedWorktree {
    pub path: String,
    pub branch: String,
    pub bare: bool,
    pub current_branch: String,
    pub merged: bool,
}

/// Where a composed worktree's UI metadata came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum MetadataSource {
    Stored,
    #[serde(rename_all = "camelCase")]
    BranchFallback { previous_path: String },
    Default,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComposedWorktree {
    #[serde(flatten)]
    pub worktree: ScannedWorktree,
    pub ui: WorktreeUiMetadata,
    pub metadata_source: MetadataSource,
}

impl ComposedWorktree {
    pub fn path(&self) -> &str {
        &self.worktree.path
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComposedSelection {
    pub active_worktree_path: Option<String>,
    pub active_tab_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComposedWorkspaceState {
    pub workspace: Workspace,
    pub worktrees: Vec<ComposedWorktree>,
    pub ui: ComposedSelection,
}

impl ComposedWorkspaceState {
    pub fn worktree(&self, path: &str) -> Option<&ComposedWorktree> {
        self.worktrees.iter().find(|w| w.path() == path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorktreeChange {
    pub old: ScannedWorktree,
    pub new: ScannedWorktree,
}

/// Store changes applied by a reconciling rescan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileReport {
    /// `(old_path, new_path)` pairs re-keyed after a branch fallback match.
    pub migrated: Vec<(String, String)>,
    pub marked_orphaned: Vec<String>,
    pub restored: Vec<String>,
    pub pruned: Vec<String>,
}

impl ReconcileReport {
    pub fn is_empty(&self) -> bool {
        self.migrated.is_empty()
            && self.marked_orphaned.is_empty()
            && self.restored.is_empty()
            && self.pruned.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RescanResult {
    pub added: Vec<ScannedWorktree>,
    pub removed: Vec<ScannedWorktree>,
    pub changed: Vec<WorktreeChange>,
    pub state: ComposedWorkspaceState,
    pub reconciliation: ReconcileReport,
}

impl RescanResult {
    pub fn has_drift(&self) -> bool {
        !(self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty())
    }
}
