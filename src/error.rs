// ABOUTME: Error types for git scanning, UI metadata persistence, nested repo discovery and composition

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GitSourceError {
    #[error("Git repository error: {0}")]
    Git(#[from] git2::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Command execution failed: {0}")]
    CommandFailed(String),
    #[error("Unparseable worktree listing: {0}")]
    Parse(String),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Corrupt store file {path}: {source}")]
    Corrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug)]
pub enum NestedRepoError {
    #[error("Nested repository scan of {0} was cancelled")]
    Cancelled(String),
}

#[derive(Error, Debug)]
pub enum ComposeError {
    #[error("Failed to list worktrees for {repo_path}: {source}")]
    WorktreeListing {
        repo_path: String,
        #[source]
        source: GitSourceError,
    },
    #[error("UI metadata store error: {0}")]
    Store(#[from] StoreError),
}
