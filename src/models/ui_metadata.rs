// ABOUTME: Persisted UI metadata shapes - per-worktree tab state, workspace selection, patches and global settings

use crate::models::Tab;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorktreeUiMetadata {
    pub path: String,
    /// Last branch seen for this worktree.
    pub branch: String,
    #[serde(default)]
    pub merged: bool,
    #[serde(default)]
    pub tabs: Vec<Tab>,
    #[serde(default)]
    pub active_tab_id: Option<String>,
    pub updated_at: DateTime<Utc>,
    /// Set the first time a reconciling rescan found no worktree for this entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orphaned_at: Option<DateTime<Utc>>,
}

impl WorktreeUiMetadata {
    pub fn empty(path: impl Into<String>, branch: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            path: path.into(),
            branch: branch.into(),
            merged: false,
            tabs: Vec::new(),
            active_tab_id: None,
            updated_at: now,
            orphaned_at: None,
        }
    }

    pub fn apply(&mut self, patch: &WorktreeMetadataPatch, now: DateTime<Utc>) {
        if let Some(branch) = &patch.branch {
            self.branch.clone_from(branch);
        }
        if let Some(tabs) = &patch.tabs {
            self.tabs.clone_from(tabs);
        }
        if let Some(active_tab_id) = &patch.active_tab_id {
            self.active_tab_id.clone_from(active_tab_id);
        }
        if let Some(orphaned_at) = patch.orphaned_at {
            self.orphaned_at = orphaned_at;
        }
        self.updated_at = now;
    }
}

/// Everything the store keeps for one workspace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceUiState {
    #[serde(default)]
    pub active_worktree_path: Option<String>,
    /// Keyed by worktree path.
    #[serde(default)]
    pub worktrees: BTreeMap<String, WorktreeUiMetadata>,
}

impl WorkspaceUiState {
    pub fn apply(&mut self, patch: &WorkspaceUiPatch) -> bool {
        let mut changed = false;

        if let Some(active) = &patch.active_worktree_path {
            if &self.active_worktree_path != active {
                self.active_worktree_path.clone_from(active);
                changed = true;
            }
        }

        for path in &patch.remove_worktrees {
            changed |= self.worktrees.remove(path).is_some();
        }

        for (path, metadata) in &patch.upsert_worktrees {
            if self.worktrees.get(path) != Some(metadata) {
                self.worktrees.insert(path.clone(), metadata.clone());
                changed = true;
            }
        }

        changed
    }
}

/// Partial update of a workspace's UI state. Removals apply before upserts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceUiPatch {
    /// `Some(None)` clears the selection.
    #[serde(default)]
    pub active_worktree_path: Option<Option<String>>,
    #[serde(default)]
    pub upsert_worktrees: BTreeMap<String, WorktreeUiMetadata>,
    #[serde(default)]
    pub remove_worktrees: Vec<String>,
}

impl WorkspaceUiPatch {
    pub fn set_active_worktree(path: Option<String>) -> Self {
        Self {
            active_worktree_path: Some(path),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.active_worktree_path.is_none()
            && self.upsert_worktrees.is_empty()
            && self.remove_worktrees.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorktreeMetadataPatch {
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub tabs: Option<Vec<Tab>>,
    #[serde(default)]
    pub active_tab_id: Option<Option<String>>,
    #[serde(default)]
    pub orphaned_at: Option<Option<DateTime<Utc>>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub last_active_workspace_id: Option<String>,
    /// Command for the terminal tab opened in a freshly initialized worktree.
    #[serde(default)]
    pub default_terminal_command: Option<String>,
}
