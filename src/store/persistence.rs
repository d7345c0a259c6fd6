// ABOUTME: JSON file persistence for workspace UI metadata and settings across application restarts
// One file per workspace plus a settings file, written atomically via rename

use crate::clock::{Clock, SystemClock};
use crate::error::StoreError;
use crate::models::{Settings, WorkspaceUiPatch, WorkspaceUiState, WorktreeMetadataPatch};
use crate::store::{apply_worktree_patch, UiMetadataStore};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, warn};

pub struct JsonFileStore {
    storage_path: PathBuf,
    clock: Arc<dyn Clock>,
    // Serializes read-modify-write cycles within this process
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub async fn new(storage_path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        Self::with_clock(storage_path, Arc::new(SystemClock)).await
    }

    pub async fn with_clock(
        storage_path: impl Into<PathBuf>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, StoreError> {
        let storage_path = storage_path.into();

        // Ensure directory exists
        fs::create_dir_all(storage_path.join("workspaces")).await?;

        Ok(Self {
            storage_path,
            clock,
            write_lock: Mutex::new(()),
        })
    }

    pub fn storage_path(&self) -> &Path {
        &self.storage_path
    }

    fn workspace_file(&self, workspace_id: &str) -> PathBuf {
        let safe_id: String = workspace_id
            .chars()
            .map(|c| match c {
                'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' => c,
                _ => '_',
            })
            .collect();
        self.storage_path
            .join("workspaces")
            .join(format!("{safe_id}.json"))
    }

    fn settings_file(&self) -> PathBuf {
        self.storage_path.join("settings.json")
    }

    async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|source| {
                warn!("Failed to parse store file {:?}: {}", path, source);
                StoreError::Corrupt {
                    path: path.display().to_string(),
                    source,
                }
            })
    }

    async fn write_json<T: Serialize + Sync>(path: &Path, value: &T) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(value)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).await?;
        fs::rename(&tmp, path).await?;
        debug!("Wrote store file {}", path.display());
        Ok(())
    }
}

#[async_trait]
impl UiMetadataStore for JsonFileStore {
    async fn read_workspace_ui_state(
        &self,
        workspace_id: &str,
    ) -> Result<Option<WorkspaceUiState>, StoreError> {
        Self::read_json(&self.workspace_file(workspace_id)).await
    }

    async fn update_workspace_ui_state(
        &self,
        workspace_id: &str,
        patch: WorkspaceUiPatch,
    ) -> Result<bool, StoreError> {
        if patch.is_empty() {
            return Ok(false);
        }

        let _guard = self.write_lock.lock().await;
        let path = self.workspace_file(workspace_id);
        let mut state: WorkspaceUiState = Self::read_json(&path).await?.unwrap_or_default();

        let changed = state.apply(&patch);
        if changed {
            Self::write_json(&path, &state).await?;
        }
        Ok(changed)
    }

    async fn update_worktree_metadata(
        &self,
        workspace_id: &str,
        worktree_path: &str,
        patch: WorktreeMetadataPatch,
    ) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let path = self.workspace_file(workspace_id);
        let mut state: WorkspaceUiState = Self::read_json(&path).await?.unwrap_or_default();

        apply_worktree_patch(&mut state, worktree_path, &patch, self.clock.now());
        Self::write_json(&path, &state).await
    }

    async fn read_settings(&self) -> Result<Settings, StoreError> {
        Ok(Self::read_json(&self.settings_file())
            .await?
            .unwrap_or_default())
    }

    async fn write_settings(&self, settings: Settings) -> Result<Settings, StoreError> {
        let _guard = self.write_lock.lock().await;
        Self::write_json(&self.settings_file(), &settings).await?;
        Ok(settings)
    }
}
