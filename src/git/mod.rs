// ABOUTME: Git integration module for worktree listing, branch state lookups and nested repository discovery

pub mod nested_repos;
pub mod worktree_source;

pub use nested_repos::{
    get_repo_display_name, EntryKind, NestedRepoDetector, RepoFilesystem, ScanCancel, ScanIssue,
    ScanObserver, TokioFilesystem, TracingObserver,
};
pub use worktree_source::{parse_worktree_porcelain, GitCliWorktreeSource, GitWorktreeSource};
