// ABOUTME: UI metadata store interface plus file-backed and in-memory implementations

pub mod memory;
pub mod persistence;

pub use memory::MemoryStore;
pub use persistence::JsonFileStore;

use crate::error::StoreError;
use crate::models::{
    Settings, WorkspaceUiPatch, WorkspaceUiState, WorktreeMetadataPatch, WorktreeUiMetadata,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Persisted, UI-owned state keyed by workspace id.
#[async_trait]
pub trait UiMetadataStore: Send + Sync {
    /// `Ok(None)` when nothing has been stored for the workspace yet.
    async fn read_workspace_ui_state(
        &self,
        workspace_id: &str,
    ) -> Result<Option<WorkspaceUiState>, StoreError>;

    /// Returns whether anything changed.
    async fn update_workspace_ui_state(
        &self,
        workspace_id: &str,
        patch: WorkspaceUiPatch,
    ) -> Result<bool, StoreError>;

    /// Creates the entry if it does not exist yet.
    async fn update_worktree_metadata(
        &self,
        workspace_id: &str,
        worktree_path: &str,
        patch: WorktreeMetadataPatch,
    ) -> Result<(), StoreError>;

    async fn read_settings(&self) -> Result<Settings, StoreError>;

    async fn write_settings(&self, settings: Settings) -> Result<Settings, StoreError>;
}

pub(crate) fn apply_worktree_patch(
    state: &mut WorkspaceUiState,
    worktree_path: &str,
    patch: &WorktreeMetadataPatch,
    now: DateTime<Utc>,
) {
    state
        .worktrees
        .entry(worktree_path.to_string())
        .or_insert_with(|| {
            WorktreeUiMetadata::empty(
                worktree_path,
                patch.branch.clone().unwrap_or_default(),
                now,
            )
        })
        .apply(patch, now);
}
