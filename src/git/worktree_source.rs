// ABOUTME: Git worktree source - lists worktrees, resolves live HEAD branches and answers merged-into-main queries

use crate::error::GitSourceError;
use crate::models::ListedWorktree;
use async_trait::async_trait;
use git2::{BranchType, Oid, Repository};
use std::path::Path;
use tokio::process::Command;
use tracing::debug;

/// Read-only view of a repository's worktrees.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GitWorktreeSource: Send + Sync {
    async fn list_worktrees(&self, repo_path: &str) -> Result<Vec<ListedWorktree>, GitSourceError>;

    /// Live HEAD branch of a worktree, `None` when it cannot be determined.
    async fn get_current_branch(&self, worktree_path: &str)
        -> Result<Option<String>, GitSourceError>;

    async fn is_branch_merged(
        &self,
        repo_path: &str,
        branch: &str,
        main_branch: &str,
    ) -> Result<bool, GitSourceError>;
}

/// `git worktree list` for listings, libgit2 for branch and ancestry lookups.
#[derive(Debug, Default, Clone)]
pub struct GitCliWorktreeSource;

impl GitCliWorktreeSource {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl GitWorktreeSource for GitCliWorktreeSource {
    async fn list_worktrees(&self, repo_path: &str) -> Result<Vec<ListedWorktree>, GitSourceError> {
        let output = Command::new("git")
            .arg("-C")
            .arg(repo_path)
            .args(["worktree", "list", "--porcelain"])
            .output()
            .await?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            return Err(GitSourceError::CommandFailed(format!(
                "Failed to list worktrees: {}",
                error.trim()
            )));
        }

        let listing = parse_worktree_porcelain(&String::from_utf8_lossy(&output.stdout))?;
        debug!("Listed {} worktrees for {}", listing.len(), repo_path);
        Ok(listing)
    }

    async fn get_current_branch(
        &self,
        worktree_path: &str,
    ) -> Result<Option<String>, GitSourceError> {
        let path = worktree_path.to_string();
        blocking(move || {
            let repo = Repository::open(&path)?;
            let branch = match repo.head() {
                Ok(head) => head.shorthand().map(str::to_string),
                // Unborn branch or broken HEAD
                Err(_) => None,
            };
            Ok(branch)
        })
        .await
    }

    async fn is_branch_merged(
        &self,
        repo_path: &str,
        branch: &str,
        main_branch: &str,
    ) -> Result<bool, GitSourceError> {
        // Detached and bare worktrees have no branch that could be merged
        if branch.is_empty() || branch == "HEAD" {
            return Ok(false);
        }

        let (path, branch, main_branch) =
            (repo_path.to_string(), branch.to_string(), main_branch.to_string());

        blocking(move || {
            let repo = Repository::open(Path::new(&path))?;
            let branch_oid = local_branch_tip(&repo, &branch)?;
            let main_oid = local_branch_tip(&repo, &main_branch)?;

            if branch_oid == main_oid {
                return Ok(true);
            }
            Ok(repo.graph_descendant_of(main_oid, branch_oid)?)
        })
        .await
    }
}

/// Only `refs/heads/<name>` counts, so tags and `HEAD` never resolve here.
fn local_branch_tip(repo: &Repository, name: &str) -> Result<Oid, GitSourceError> {
    Ok(repo
        .find_branch(name, BranchType::Local)?
        .get()
        .peel_to_commit()?
        .id())
}

async fn blocking<T, F>(work: F) -> Result<T, GitSourceError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, GitSourceError> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| GitSourceError::CommandFailed(format!("git task failed: {e}")))?
}

/// Parses `git worktree list --porcelain` output.
pub fn parse_worktree_porcelain(output: &str) -> Result<Vec<ListedWorktree>, GitSourceError> {
    let mut worktrees = Vec::new();
    let mut current: Option<ListedWorktree> = None;

    for line in output.lines() {
        if line.trim().is_empty() {
            worktrees.extend(current.take());
            continue;
        }

        let (key, value) = line.split_once(' ').unwrap_or((line, ""));
        if key == "worktree" {
            worktrees.extend(current.take());
            current = Some(ListedWorktree {
                path: value.to_string(),
                branch: "HEAD".to_string(),
                bare: false,
            });
            continue;
        }

        let Some(entry) = current.as_mut() else {
            return Err(GitSourceError::Parse(format!(
                "attribute before worktree line: {line}"
            )));
        };

        match key {
            "branch" => {
                entry.branch = value
                    .strip_prefix("refs/heads/")
                    .unwrap_or(value)
                    .to_string();
            }
            "bare" => {
                entry.bare = true;
                entry.branch = String::new();
            }
            "detached" => entry.branch = "HEAD".to_string(),
            // HEAD, locked, prunable
            _ => {}
        }
    }

    worktrees.extend(current);
    Ok(worktrees)
}
