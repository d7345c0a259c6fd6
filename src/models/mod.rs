// ABOUTME: Core data models for workspaces, scanned and composed worktrees, tabs and persisted UI metadata

pub mod tab;
pub mod ui_metadata;
pub mod workspace;

pub use tab::{MosaicNode, SplitDirection, Tab, TabType};
pub use ui_metadata::{
    Settings, WorkspaceUiPatch, WorkspaceUiState, WorktreeMetadataPatch, WorktreeUiMetadata,
};
pub use workspace::{
    ComposedSelection, ComposedWorkspaceState, ComposedWorktree, ListedWorktree, MetadataSource,
    ReconcileReport, RescanResult, ScannedWorktree, Workspace, WorktreeChange,
};
