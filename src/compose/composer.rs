// ABOUTME: Workspace composer - scans git worktrees, merges stored UI metadata and reports drift between scans

use crate::clock::{Clock, SystemClock};
use crate::compose::diff::diff_worktrees;
use crate::compose::merge::{merge_worktrees, resolve_selection, MergeOptions};
use crate::compose::reconcile::plan_reconciliation;
use crate::config::ReconcileConfig;
use crate::error::ComposeError;
use crate::git::GitWorktreeSource;
use crate::models::{
    ComposedWorkspaceState, ReconcileReport, RescanResult, ScannedWorktree, Tab, Workspace,
    WorkspaceUiState, WorktreeMetadataPatch, WorktreeUiMetadata,
};
use crate::store::UiMetadataStore;
use crate::DEFAULT_MAIN_BRANCH;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct WorkspaceComposer {
    git: Arc<dyn GitWorktreeSource>,
    store: Arc<dyn UiMetadataStore>,
    clock: Arc<dyn Clock>,
    config: ReconcileConfig,
}

impl WorkspaceComposer {
    pub fn new(git: Arc<dyn GitWorktreeSource>, store: Arc<dyn UiMetadataStore>) -> Self {
        Self {
            git,
            store,
            clock: Arc::new(SystemClock),
            config: ReconcileConfig::default(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_config(mut self, config: ReconcileConfig) -> Self {
        self.config = config;
        self
    }

    /// Lists worktrees with their live branch and merged state.
    ///
    /// Listing failure is fatal. A failed branch lookup falls back to the
    /// branch git recorded for the worktree; a failed merge check counts as
    /// not merged.
    pub async fn scan_worktrees(
        &self,
        repo_path: &str,
        main_branch: &str,
    ) -> Result<Vec<ScannedWorktree>, ComposeError> {
        let listed = self
            .git
            .list_worktrees(repo_path)
            .await
            .map_err(|source| ComposeError::WorktreeListing {
                repo_path: repo_path.to_string(),
                source,
            })?;

        let mut scanned = Vec::with_capacity(listed.len());
        for worktree in listed {
            let current_branch = match self.git.get_current_branch(&worktree.path).await {
                Ok(Some(branch)) => branch,
                Ok(None) => worktree.branch.clone(),
                Err(e) => {
                    warn!(
                        "Falling back to recorded branch for {}: {}",
                        worktree.path, e
                    );
                    worktree.branch.clone()
                }
            };

            // The main branch, detached HEADs and bare entries are never merged
            let merged = if current_branch == main_branch
                || current_branch == "HEAD"
                || current_branch.is_empty()
            {
                false
            } else {
                match self
                    .git
                    .is_branch_merged(repo_path, &current_branch, main_branch)
                    .await
                {
                    Ok(merged) => merged,
                    Err(e) => {
                        debug!("Merge check failed for {}: {}", current_branch, e);
                        false
                    }
                }
            };

            scanned.push(ScannedWorktree {
                path: worktree.path,
                branch: worktree.branch,
                bare: worktree.bare,
                current_branch,
                merged,
            });
        }

        Ok(scanned)
    }

    pub async fn compose_workspace_state(
        &self,
        workspace: &Workspace,
        main_branch: Option<&str>,
    ) -> Result<ComposedWorkspaceState, ComposeError> {
        let main_branch = main_branch.unwrap_or(DEFAULT_MAIN_BRANCH);
        let scanned = self.scan_worktrees(&workspace.repo_path, main_branch).await?;
        let stored = self.load_ui_state(&workspace.id).await?;

        let state = self.compose_from_scan(workspace, scanned, &stored);
        debug!(
            "Composed {} worktrees for workspace {}",
            state.worktrees.len(),
            workspace.id
        );
        Ok(state)
    }

    /// Composes, scans again and reports what moved between the two. The two
    /// scans are not atomic, so the diff is advisory.
    pub async fn rescan_workspace(
        &self,
        workspace: &Workspace,
        main_branch: Option<&str>,
    ) -> Result<RescanResult, ComposeError> {
        let main_branch = main_branch.unwrap_or(DEFAULT_MAIN_BRANCH);
        let previous = self
            .compose_workspace_state(workspace, Some(main_branch))
            .await?;
        let rescanned = self.scan_worktrees(&workspace.repo_path, main_branch).await?;

        let diff = diff_worktrees(&previous.worktrees, &rescanned);

        let stored = self.load_ui_state(&workspace.id).await?;
        let state = self.compose_from_scan(workspace, rescanned, &stored);
        let reconciliation = self.reconcile(&workspace.id, &stored, &state).await?;

        info!(
            "Rescanned workspace {}: {} added, {} removed, {} changed",
            workspace.id,
            diff.added.len(),
            diff.removed.len(),
            diff.changed.len()
        );

        Ok(RescanResult {
            added: diff.added,
            removed: diff.removed,
            changed: diff.changed,
            state,
            reconciliation,
        })
    }

    /// Default UI state for a brand-new worktree: one terminal opened in it.
    pub async fn initialize_worktree_defaults(
        &self,
        workspace_id: &str,
        worktree_path: &str,
        branch: &str,
    ) -> Result<WorktreeUiMetadata, ComposeError> {
        let settings = self.store.read_settings().await?;

        let mut terminal = Tab::terminal("Terminal", worktree_path);
        terminal.command = settings.default_terminal_command;

        let now = self.clock.now();
        terminal.created_at = now;

        let metadata = WorktreeUiMetadata {
            path: worktree_path.to_string(),
            branch: branch.to_string(),
            merged: false,
            active_tab_id: Some(terminal.id.clone()),
            tabs: vec![terminal],
            updated_at: now,
            orphaned_at: None,
        };

        self.store
            .update_worktree_metadata(
                workspace_id,
                worktree_path,
                WorktreeMetadataPatch {
                    branch: Some(metadata.branch.clone()),
                    tabs: Some(metadata.tabs.clone()),
                    active_tab_id: Some(metadata.active_tab_id.clone()),
                    orphaned_at: Some(None),
                },
            )
            .await?;

        info!("Initialized default tabs for {}", worktree_path);
        Ok(metadata)
    }

    async fn load_ui_state(&self, workspace_id: &str) -> Result<WorkspaceUiState, ComposeError> {
        Ok(self
            .store
            .read_workspace_ui_state(workspace_id)
            .await?
            .unwrap_or_default())
    }

    fn compose_from_scan(
        &self,
        workspace: &Workspace,
        scanned: Vec<ScannedWorktree>,
        stored: &WorkspaceUiState,
    ) -> ComposedWorkspaceState {
        let options = MergeOptions {
            now: self.clock.now(),
            require_unique_branch_fallback: self.config.require_unique_branch_fallback,
        };
        let worktrees = merge_worktrees(scanned, stored, options);
        let ui = resolve_selection(stored, &worktrees);

        ComposedWorkspaceState {
            workspace: workspace.clone(),
            worktrees,
            ui,
        }
    }

    async fn reconcile(
        &self,
        workspace_id: &str,
        stored: &WorkspaceUiState,
        state: &ComposedWorkspaceState,
    ) -> Result<ReconcileReport, ComposeError> {
        let now = self.clock.now();
        let plan = plan_reconciliation(stored, &state.worktrees, now, self.config.orphan_retention());

        if !plan.patch.is_empty() {
            self.store
                .update_workspace_ui_state(workspace_id, plan.patch)
                .await?;
        }

        for path in &plan.mark_orphaned {
            self.store
                .update_worktree_metadata(
                    workspace_id,
                    path,
                    WorktreeMetadataPatch {
                        orphaned_at: Some(Some(now)),
                        ..Default::default()
                    },
                )
                .await?;
        }

        for path in &plan.restore {
            self.store
                .update_worktree_metadata(
                    workspace_id,
                    path,
                    WorktreeMetadataPatch {
                        orphaned_at: Some(None),
                        ..Default::default()
                    },
                )
                .await?;
        }

        if !plan.report.is_empty() {
            info!(
                "Reconciled workspace {}: {} migrated, {} orphaned, {} restored, {} pruned",
                workspace_id,
                plan.report.migrated.len(),
                plan.report.marked_orphaned.len(),
                plan.report.restored.len(),
                plan.report.pruned.len()
            );
        }
        Ok(plan.report)
    }
}
