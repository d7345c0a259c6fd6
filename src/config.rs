// ABOUTME: Application configuration loaded from TOML - scan limits, cache TTL, orphan retention and store location

use anyhow::{Context, Result};
use chrono::Duration;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const MAX_SCAN_DEPTH: usize = 5;
pub const NESTED_REPO_CACHE_TTL_SECS: u64 = 30;
pub const ORPHAN_RETENTION_DAYS: u32 = 7;

pub const EXCLUDED_DIRS: &[&str] = &[
    "node_modules",
    "vendor",
    "dist",
    "build",
    ".git",
    "__pycache__",
    ".venv",
    "venv",
    ".next",
    ".turbo",
    "target",
    "coverage",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NestedScanConfig {
    pub max_depth: usize,
    pub cache_ttl_secs: u64,
    pub excluded_dirs: Vec<String>,
}

impl Default for NestedScanConfig {
    fn default() -> Self {
        Self {
            max_depth: MAX_SCAN_DEPTH,
            cache_ttl_secs: NESTED_REPO_CACHE_TTL_SECS,
            excluded_dirs: EXCLUDED_DIRS.iter().map(|d| (*d).to_string()).collect(),
        }
    }
}

impl NestedScanConfig {
    pub fn cache_ttl(&self) -> Duration {
        let secs = i64::try_from(self.cache_ttl_secs).unwrap_or(i64::MAX);
        Duration::seconds(secs.min(i64::MAX / 1000))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// How long UI metadata for a vanished worktree is kept before a rescan prunes it.
    pub orphan_retention_days: u32,
    /// Only match metadata by branch when exactly one unclaimed entry carries that branch.
    pub require_unique_branch_fallback: bool,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            orphan_retention_days: ORPHAN_RETENTION_DAYS,
            require_unique_branch_fallback: true,
        }
    }
}

impl ReconcileConfig {
    pub fn orphan_retention(&self) -> Duration {
        Duration::days(i64::from(self.orphan_retention_days))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Overrides the platform data directory for UI metadata files.
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub default_main_branch: String,
    pub nested_scan: NestedScanConfig,
    pub reconcile: ReconcileConfig,
    pub store: StoreConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_main_branch: crate::DEFAULT_MAIN_BRANCH.to_string(),
            nested_scan: NestedScanConfig::default(),
            reconcile: ReconcileConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

impl AppConfig {
    fn project_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from("dev", "worktree-compose", "worktree-compose")
    }

    pub fn default_path() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Loads the config from the platform config directory, falling back to defaults.
    pub fn load() -> Result<Self> {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;

        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Directory holding persisted UI metadata.
    pub fn data_dir(&self) -> PathBuf {
        if let Some(dir) = &self.store.data_dir {
            return dir.clone();
        }
        Self::project_dirs()
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from(".worktree-compose"))
    }

    pub fn log_dir(&self) -> PathBuf {
        self.data_dir().join("logs")
    }
}
