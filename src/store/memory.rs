// ABOUTME: In-memory UI metadata store for embedding and tests

use crate::clock::{Clock, SystemClock};
use crate::error::StoreError;
use crate::models::{Settings, WorkspaceUiPatch, WorkspaceUiState, WorktreeMetadataPatch};
use crate::store::{apply_worktree_patch, UiMetadataStore};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub struct MemoryStore {
    workspaces: Mutex<HashMap<String, WorkspaceUiState>>,
    settings: Mutex<Settings>,
    clock: Arc<dyn Clock>,
    reads: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            workspaces: Mutex::new(HashMap::new()),
            settings: Mutex::new(Settings::default()),
            clock,
            reads: AtomicUsize::new(0),
        }
    }

    /// Replaces everything stored for `workspace_id`.
    pub fn seed(&self, workspace_id: &str, state: WorkspaceUiState) {
        self.lock().insert(workspace_id.to_string(), state);
    }

    /// Current state without counting as a read.
    pub fn snapshot(&self, workspace_id: &str) -> Option<WorkspaceUiState> {
        self.lock().get(workspace_id).cloned()
    }

    /// Number of `read_workspace_ui_state` calls so far.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, WorkspaceUiState>> {
        self.workspaces.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UiMetadataStore for MemoryStore {
    async fn read_workspace_ui_state(
        &self,
        workspace_id: &str,
    ) -> Result<Option<WorkspaceUiState>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.lock().get(workspace_id).cloned())
    }

    async fn update_workspace_ui_state(
        &self,
        workspace_id: &str,
        patch: WorkspaceUiPatch,
    ) -> Result<bool, StoreError> {
        if patch.is_empty() {
            return Ok(false);
        }
        Ok(self
            .lock()
            .entry(workspace_id.to_string())
            .or_default()
            .apply(&patch))
    }

    async fn update_worktree_metadata(
        &self,
        workspace_id: &str,
        worktree_path: &str,
        patch: WorktreeMetadataPatch,
    ) -> Result<(), StoreError> {
        let now = self.clock.now();
        let mut workspaces = self.lock();
        let state = workspaces.entry(workspace_id.to_string()).or_default();
        apply_worktree_patch(state, worktree_path, &patch, now);
        Ok(())
    }

    async fn read_settings(&self) -> Result<Settings, StoreError> {
        Ok(self
            .settings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    async fn write_settings(&self, settings: Settings) -> Result<Settings, StoreError> {
        let mut current = self.settings.lock().unwrap_or_else(PoisonError::into_inner);
        *current = settings;
        Ok(current.clone())
    }
}
