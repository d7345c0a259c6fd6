// ABOUTME: Library crate for worktree-compose exposing workspace composition, tab trees and nested repo discovery

pub mod clock;
pub mod compose;
pub mod config;
pub mod error;
pub mod git;
pub mod models;
pub mod store;
pub mod tabs;

/// Branch treated as the merge target when a workspace does not name one.
pub const DEFAULT_MAIN_BRANCH: &str = "main";

pub use compose::WorkspaceComposer;
pub use config::AppConfig;
pub use error::{ComposeError, GitSourceError, NestedRepoError, StoreError};
pub use git::{GitCliWorktreeSource, GitWorktreeSource, NestedRepoDetector};
pub use store::{JsonFileStore, MemoryStore, UiMetadataStore};
