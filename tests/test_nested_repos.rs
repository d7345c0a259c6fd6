// ABOUTME: Integration tests for nested repository discovery against a real directory tree on disk

use std::path::Path;
use tempfile::TempDir;
use worktree_compose::config::NestedScanConfig;
use worktree_compose::git::{get_repo_display_name, NestedRepoDetector, ScanCancel};
use worktree_compose::NestedRepoError;

fn make_repo(path: &Path) {
    std::fs::create_dir_all(path.join(".git")).expect("Failed to create .git dir");
}

/// Worktree-style repo: `.git` is a file pointing at the main repository.
fn make_linked_repo(path: &Path) {
    std::fs::create_dir_all(path).expect("Failed to create repo dir");
    std::fs::write(path.join(".git"), "gitdir: /elsewhere/.git/worktrees/x\n")
        .expect("Failed to write .git file");
}

#[tokio::test]
async fn test_discovers_nested_repos_in_order() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let root = temp_dir.path();
    make_repo(root);
    make_repo(&root.join("services/api"));
    make_linked_repo(&root.join("libs/shared"));
    make_repo(&root.join("services/api/vendor-copy"));
    make_repo(&root.join("node_modules/some-pkg"));
    std::fs::create_dir_all(root.join("docs")).unwrap();

    let detector = NestedRepoDetector::default();
    let repos = detector.detect_nested_repos(root).await;

    assert_eq!(
        repos.to_vec(),
        vec![
            root.to_path_buf(),
            root.join("libs/shared"),
            root.join("services/api"),
        ]
    );

    let names: Vec<String> = repos
        .iter()
        .map(|repo| get_repo_display_name(root, repo))
        .collect();
    assert_eq!(names, vec!["(root)", "libs/shared", "services/api"]);
}

#[tokio::test]
async fn test_plain_directory_root_is_not_listed() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    make_repo(&temp_dir.path().join("inner"));

    let detector = NestedRepoDetector::default();
    let repos = detector.detect_nested_repos(temp_dir.path()).await;
    assert_eq!(repos.to_vec(), vec![temp_dir.path().join("inner")]);
}

#[cfg(unix)]
#[tokio::test]
async fn test_symlinked_directories_are_not_followed() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let outside = TempDir::new().expect("Failed to create temp dir");
    make_repo(&outside.path().join("elsewhere"));
    std::os::unix::fs::symlink(outside.path(), temp_dir.path().join("link")).unwrap();

    let detector = NestedRepoDetector::default();
    assert!(detector.detect_nested_repos(temp_dir.path()).await.is_empty());
}

#[tokio::test]
async fn test_custom_exclusions_and_depth() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let root = temp_dir.path();
    make_repo(&root.join("a/b/c/deep"));
    make_repo(&root.join("skipme/repo"));

    let detector = NestedRepoDetector::new(NestedScanConfig {
        max_depth: 2,
        excluded_dirs: vec!["skipme".to_string()],
        ..Default::default()
    });
    // "deep" sits below depth 2
    assert!(detector.detect_nested_repos(root).await.is_empty());

    let detector = NestedRepoDetector::new(NestedScanConfig {
        max_depth: 3,
        ..Default::default()
    });
    assert_eq!(
        detector.detect_nested_repos(root).await.to_vec(),
        vec![root.join("a/b/c/deep"), root.join("skipme/repo")]
    );
}

#[tokio::test]
async fn test_cache_is_shared_until_cleared() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let root = temp_dir.path();
    make_repo(&root.join("one"));

    let detector = NestedRepoDetector::default();
    let first = detector.detect_nested_repos(root).await;

    make_repo(&root.join("two"));
    let cached = detector.detect_nested_repos(root).await;
    assert!(std::sync::Arc::ptr_eq(&first, &cached));
    assert_eq!(cached.len(), 1);

    detector.clear_nested_repos_cache(Some(root));
    assert_eq!(detector.detect_nested_repos(root).await.len(), 2);
}

#[tokio::test]
async fn test_cancelled_scan_reports_and_caches_nothing() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    make_repo(&temp_dir.path().join("one"));

    let detector = NestedRepoDetector::default();
    let cancel = ScanCancel::new();
    cancel.cancel();

    let result = detector
        .detect_nested_repos_with_cancel(temp_dir.path(), &cancel)
        .await;
    assert!(matches!(result, Err(NestedRepoError::Cancelled(_))));

    let repos = detector.detect_nested_repos(temp_dir.path()).await;
    assert_eq!(repos.to_vec(), vec![temp_dir.path().join("one")]);
}
