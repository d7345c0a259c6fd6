// ABOUTME: Nested git repository discovery - bounded, symlink-safe directory walk with a per-root TTL cache

use crate::clock::{Clock, SystemClock};
use crate::config::NestedScanConfig;
use crate::error::NestedRepoError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

pub const ROOT_DISPLAY_NAME: &str = "(root)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    File,
    Symlink,
}

/// Filesystem operations the walk needs. `entry_kind` must not follow symlinks.
#[async_trait]
pub trait RepoFilesystem: Send + Sync {
    async fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>>;
    async fn entry_kind(&self, path: &Path) -> io::Result<EntryKind>;
    /// Whether a `.git` file or directory exists inside `dir`.
    async fn has_git_marker(&self, dir: &Path) -> bool;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TokioFilesystem;

#[async_trait]
impl RepoFilesystem for TokioFilesystem {
    async fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let mut entries = tokio::fs::read_dir(path).await?;
        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            paths.push(entry.path());
        }
        Ok(paths)
    }

    async fn entry_kind(&self, path: &Path) -> io::Result<EntryKind> {
        let file_type = tokio::fs::symlink_metadata(path).await?.file_type();
        Ok(if file_type.is_symlink() {
            EntryKind::Symlink
        } else if file_type.is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::File
        })
    }

    async fn has_git_marker(&self, dir: &Path) -> bool {
        tokio::fs::symlink_metadata(dir.join(".git")).await.is_ok()
    }
}

/// A problem the walk skipped over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanIssue {
    ReadDir { path: PathBuf, error: String },
    Lstat { path: PathBuf, error: String },
}

pub trait ScanObserver: Send + Sync {
    fn on_issue(&self, issue: &ScanIssue);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl ScanObserver for TracingObserver {
    fn on_issue(&self, issue: &ScanIssue) {
        match issue {
            ScanIssue::ReadDir { path, error } => {
                warn!("Skipping unreadable directory {}: {}", path.display(), error);
            }
            ScanIssue::Lstat { path, error } => {
                warn!("Skipping entry {}: {}", path.display(), error);
            }
        }
    }
}

/// Cooperative cancellation flag for long walks.
#[derive(Debug, Default, Clone)]
pub struct ScanCancel(Arc<AtomicBool>);

impl ScanCancel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

struct CacheEntry {
    repos: Arc<[PathBuf]>,
    timestamp: DateTime<Utc>,
}

pub struct NestedRepoDetector {
    fs: Arc<dyn RepoFilesystem>,
    clock: Arc<dyn Clock>,
    observer: Arc<dyn ScanObserver>,
    config: NestedScanConfig,
    excluded: HashSet<String>,
    cache: Mutex<HashMap<PathBuf, CacheEntry>>,
    inflight: Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>,
}

impl NestedRepoDetector {
    pub fn new(config: NestedScanConfig) -> Self {
        Self::with_parts(
            config,
            Arc::new(TokioFilesystem),
            Arc::new(SystemClock),
            Arc::new(TracingObserver),
        )
    }

    pub fn with_parts(
        config: NestedScanConfig,
        fs: Arc<dyn RepoFilesystem>,
        clock: Arc<dyn Clock>,
        observer: Arc<dyn ScanObserver>,
    ) -> Self {
        let excluded = config.excluded_dirs.iter().cloned().collect();
        Self {
            fs,
            clock,
            observer,
            config,
            excluded,
            cache: Mutex::new(HashMap::new()),
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// Root first (if it is a repository), then nested repositories in path order.
    ///
    /// Results are cached per root; a cache hit returns the same shared slice.
    pub async fn detect_nested_repos(&self, root: &Path) -> Arc<[PathBuf]> {
        match self.detect(root, None).await {
            Ok(repos) => repos,
            Err(_) => Arc::from(Vec::new()),
        }
    }

    pub async fn detect_nested_repos_with_cancel(
        &self,
        root: &Path,
        cancel: &ScanCancel,
    ) -> Result<Arc<[PathBuf]>, NestedRepoError> {
        self.detect(root, Some(cancel)).await
    }

    /// Evicts one root, or the whole cache.
    pub fn clear_nested_repos_cache(&self, root: Option<&Path>) {
        let mut cache = self.lock_cache();
        match root {
            Some(root) => {
                cache.remove(root);
            }
            None => cache.clear(),
        }
    }

    async fn detect(
        &self,
        root: &Path,
        cancel: Option<&ScanCancel>,
    ) -> Result<Arc<[PathBuf]>, NestedRepoError> {
        if let Some(hit) = self.cached(root) {
            return Ok(hit);
        }

        // Concurrent scans of the same root wait for the first one.
        let key_lock = {
            let mut inflight = self
                .inflight
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            inflight.entry(root.to_path_buf()).or_default().clone()
        };
        let guard = key_lock.lock().await;
        let result = self.detect_locked(root, cancel).await;
        drop(guard);

        self.release_inflight(root, &key_lock);
        result
    }

    async fn detect_locked(
        &self,
        root: &Path,
        cancel: Option<&ScanCancel>,
    ) -> Result<Arc<[PathBuf]>, NestedRepoError> {
        if let Some(hit) = self.cached(root) {
            return Ok(hit);
        }

        let repos: Arc<[PathBuf]> = self.walk(root, cancel).await?.into();
        debug!("Found {} repositories under {}", repos.len(), root.display());

        self.lock_cache().insert(
            root.to_path_buf(),
            CacheEntry {
                repos: Arc::clone(&repos),
                timestamp: self.clock.now(),
            },
        );
        Ok(repos)
    }

    /// Drops the root's single-flight lock once no other caller is waiting on it.
    fn release_inflight(&self, root: &Path, key_lock: &Arc<tokio::sync::Mutex<()>>) {
        let mut inflight = self
            .inflight
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let ours = inflight
            .get(root)
            .is_some_and(|entry| Arc::ptr_eq(entry, key_lock));
        // One reference in the map, one held by this caller
        if ours && Arc::strong_count(key_lock) == 2 {
            inflight.remove(root);
        }
    }

    #[cfg(test)]
    fn inflight_len(&self) -> usize {
        self.inflight
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    fn cached(&self, root: &Path) -> Option<Arc<[PathBuf]>> {
        let mut cache = self.lock_cache();
        let entry = cache.get(root)?;
        if self.clock.now() - entry.timestamp < self.config.cache_ttl() {
            return Some(Arc::clone(&entry.repos));
        }
        cache.remove(root);
        None
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, HashMap<PathBuf, CacheEntry>> {
        self.cache
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    async fn walk(
        &self,
        root: &Path,
        cancel: Option<&ScanCancel>,
    ) -> Result<Vec<PathBuf>, NestedRepoError> {
        let cancelled = || cancel.is_some_and(ScanCancel::is_cancelled);
        let mut nested = Vec::new();
        let mut pending = vec![(root.to_path_buf(), 0_usize)];

        while let Some((dir, depth)) = pending.pop() {
            if cancelled() {
                return Err(NestedRepoError::Cancelled(root.display().to_string()));
            }

            let entries = match self.fs.read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) => {
                    self.observer.on_issue(&ScanIssue::ReadDir {
                        path: dir,
                        error: e.to_string(),
                    });
                    continue;
                }
            };

            for entry in entries {
                let Some(name) = entry.file_name().and_then(|n| n.to_str()) else {
                    continue;
                };
                if self.excluded.contains(name) {
                    continue;
                }

                match self.fs.entry_kind(&entry).await {
                    Ok(EntryKind::Directory) => {}
                    Ok(EntryKind::File | EntryKind::Symlink) => continue,
                    Err(e) => {
                        self.observer.on_issue(&ScanIssue::Lstat {
                            path: entry,
                            error: e.to_string(),
                        });
                        continue;
                    }
                }

                if self.fs.has_git_marker(&entry).await {
                    nested.push(entry);
                } else if depth < self.config.max_depth {
                    pending.push((entry, depth + 1));
                }
            }
        }

        nested.sort();

        let mut repos = Vec::with_capacity(nested.len() + 1);
        if self.fs.has_git_marker(root).await {
            repos.push(root.to_path_buf());
        }
        repos.extend(nested);
        Ok(repos)
    }
}

impl Default for NestedRepoDetector {
    fn default() -> Self {
        Self::new(NestedScanConfig::default())
    }
}

/// `"(root)"` for the worktree itself, otherwise the repo path relative to the worktree.
pub fn get_repo_display_name(worktree_path: &Path, repo_path: &Path) -> String {
    if repo_path == worktree_path {
        return ROOT_DISPLAY_NAME.to_string();
    }
    relative_path(worktree_path, repo_path)
        .to_string_lossy()
        .to_string()
}

fn relative_path(from: &Path, to: &Path) -> PathBuf {
    if let Ok(inside) = to.strip_prefix(from) {
        return inside.to_path_buf();
    }

    let from: Vec<Component> = from.components().collect();
    let to: Vec<Component> = to.components().collect();
    let common = from.iter().zip(&to).take_while(|(a, b)| a == b).count();

    let mut relative = PathBuf::new();
    for _ in common..from.len() {
        relative.push("..");
    }
    for component in &to[common..] {
        relative.push(component.as_os_str());
    }
    relative
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::Duration;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::AtomicUsize;

    /// In-memory tree: directories map to their entries, anything else is a file.
    #[derive(Default)]
    struct MemoryFs {
        dirs: HashMap<PathBuf, Vec<PathBuf>>,
        symlinks: HashSet<PathBuf>,
        unreadable: HashSet<PathBuf>,
        read_dir_calls: AtomicUsize,
    }

    impl MemoryFs {
        fn dir(mut self, path: &str) -> Self {
            let path = PathBuf::from(path);
            if let Some(parent) = path.parent() {
                if path != Path::new("/") {
                    self.dirs
                        .entry(parent.to_path_buf())
                        .or_default()
                        .push(path.clone());
                }
            }
            self.dirs.entry(path).or_default();
            self
        }

        fn symlink(mut self, path: &str) -> Self {
            let path = PathBuf::from(path);
            self.dirs
                .entry(path.parent().unwrap().to_path_buf())
                .or_default()
                .push(path.clone());
            self.symlinks.insert(path);
            self
        }

        fn unreadable(mut self, path: &str) -> Self {
            self.unreadable.insert(PathBuf::from(path));
            self
        }

        fn calls(&self) -> usize {
            self.read_dir_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RepoFilesystem for MemoryFs {
        async fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
            self.read_dir_calls.fetch_add(1, Ordering::SeqCst);
            if self.unreadable.contains(path) {
                return Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
            }
            self.dirs
                .get(path)
                .cloned()
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "missing"))
        }

        async fn entry_kind(&self, path: &Path) -> io::Result<EntryKind> {
            if self.symlinks.contains(path) {
                Ok(EntryKind::Symlink)
            } else if self.dirs.contains_key(path) {
                Ok(EntryKind::Directory)
            } else {
                Ok(EntryKind::File)
            }
        }

        async fn has_git_marker(&self, dir: &Path) -> bool {
            self.dirs.contains_key(&dir.join(".git"))
        }
    }

    #[derive(Default)]
    struct RecordingObserver(Mutex<Vec<ScanIssue>>);

    impl ScanObserver for RecordingObserver {
        fn on_issue(&self, issue: &ScanIssue) {
            self.0.lock().unwrap().push(issue.clone());
        }
    }

    fn detector(fs: Arc<MemoryFs>, clock: Arc<ManualClock>) -> NestedRepoDetector {
        NestedRepoDetector::with_parts(
            NestedScanConfig::default(),
            fs,
            clock,
            Arc::new(TracingObserver),
        )
    }

    fn paths(values: &[&str]) -> Vec<PathBuf> {
        values.iter().map(PathBuf::from).collect()
    }

    #[tokio::test]
    async fn test_stops_descending_at_nested_repo() {
        let fs = Arc::new(
            MemoryFs::default()
                .dir("/root")
                .dir("/root/.git")
                .dir("/root/pkg")
                .dir("/root/pkg/.git")
                .dir("/root/pkg/sub")
                .dir("/root/pkg/sub/.git"),
        );
        let detector = detector(fs, Arc::new(ManualClock::default()));

        let repos = detector.detect_nested_repos(Path::new("/root")).await;
        assert_eq!(repos.to_vec(), paths(&["/root", "/root/pkg"]));
    }

    #[tokio::test]
    async fn test_excluded_and_symlinked_dirs_are_skipped() {
        let fs = Arc::new(
            MemoryFs::default()
                .dir("/root")
                .dir("/root/node_modules")
                .dir("/root/node_modules/foo")
                .dir("/root/node_modules/foo/.git")
                .dir("/root/apps")
                .dir("/root/apps/web")
                .dir("/root/apps/web/.git")
                .symlink("/root/linked"),
        );
        let detector = detector(fs, Arc::new(ManualClock::default()));

        let repos = detector.detect_nested_repos(Path::new("/root")).await;
        assert_eq!(repos.to_vec(), paths(&["/root/apps/web"]));
    }

    #[tokio::test]
    async fn test_depth_limit() {
        let fs = Arc::new(
            MemoryFs::default()
                .dir("/r")
                .dir("/r/x")
                .dir("/r/x/.git")
                .dir("/r/1")
                .dir("/r/1/2")
                .dir("/r/1/2/3")
                .dir("/r/1/2/3/4")
                .dir("/r/1/2/3/4/5b")
                .dir("/r/1/2/3/4/5b/.git")
                .dir("/r/1/2/3/4/5")
                .dir("/r/1/2/3/4/5/6")
                .dir("/r/1/2/3/4/5/6/.git"),
        );
        let config = NestedScanConfig {
            max_depth: 4,
            ..NestedScanConfig::default()
        };
        let detector = NestedRepoDetector::with_parts(
            config,
            fs,
            Arc::new(ManualClock::default()),
            Arc::new(TracingObserver),
        );

        let repos = detector.detect_nested_repos(Path::new("/r")).await;
        assert_eq!(repos.to_vec(), paths(&["/r/1/2/3/4/5b", "/r/x"]));
    }

    #[tokio::test]
    async fn test_unreadable_dirs_reported_and_skipped() {
        let fs = Arc::new(
            MemoryFs::default()
                .dir("/root")
                .dir("/root/locked")
                .dir("/root/open")
                .dir("/root/open/.git")
                .unreadable("/root/locked"),
        );
        let observer = Arc::new(RecordingObserver::default());
        let detector = NestedRepoDetector::with_parts(
            NestedScanConfig::default(),
            fs,
            Arc::new(ManualClock::default()),
            observer.clone(),
        );

        let repos = detector.detect_nested_repos(Path::new("/root")).await;
        assert_eq!(repos.to_vec(), paths(&["/root/open"]));

        let issues = observer.0.lock().unwrap().clone();
        assert_eq!(issues.len(), 1);
        assert!(matches!(&issues[0], ScanIssue::ReadDir { path, .. } if path == Path::new("/root/locked")));
    }

    #[tokio::test]
    async fn test_cache_hit_within_ttl_and_rescan_after() {
        let fs = Arc::new(
            MemoryFs::default()
                .dir("/root")
                .dir("/root/a")
                .dir("/root/a/.git"),
        );
        let clock = Arc::new(ManualClock::default());
        let detector = detector(fs.clone(), clock.clone());
        let root = Path::new("/root");

        let first = detector.detect_nested_repos(root).await;
        let calls_after_first = fs.calls();

        clock.advance(Duration::seconds(29));
        let second = detector.detect_nested_repos(root).await;
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(fs.calls(), calls_after_first);

        clock.advance(Duration::seconds(2));
        let third = detector.detect_nested_repos(root).await;
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(first, third);
        assert!(fs.calls() > calls_after_first);
    }

    #[tokio::test]
    async fn test_clear_cache_forces_rescan() {
        let fs = Arc::new(MemoryFs::default().dir("/root").dir("/other"));
        let detector = detector(fs.clone(), Arc::new(ManualClock::default()));

        detector.detect_nested_repos(Path::new("/root")).await;
        detector.detect_nested_repos(Path::new("/other")).await;
        let calls = fs.calls();

        detector.clear_nested_repos_cache(Some(Path::new("/root")));
        detector.detect_nested_repos(Path::new("/other")).await;
        assert_eq!(fs.calls(), calls);
        detector.detect_nested_repos(Path::new("/root")).await;
        assert_eq!(fs.calls(), calls + 1);

        detector.clear_nested_repos_cache(None);
        detector.detect_nested_repos(Path::new("/other")).await;
        assert_eq!(fs.calls(), calls + 2);
    }

    #[tokio::test]
    async fn test_cancelled_scan_is_not_cached() {
        let fs = Arc::new(MemoryFs::default().dir("/root").dir("/root/.git"));
        let detector = detector(fs.clone(), Arc::new(ManualClock::default()));
        let cancel = ScanCancel::new();
        cancel.cancel();

        let result = detector
            .detect_nested_repos_with_cancel(Path::new("/root"), &cancel)
            .await;
        assert!(matches!(result, Err(NestedRepoError::Cancelled(_))));

        let repos = detector.detect_nested_repos(Path::new("/root")).await;
        assert_eq!(repos.to_vec(), paths(&["/root"]));
    }

    #[tokio::test]
    async fn test_concurrent_scans_of_same_root_share_one_walk() {
        let fs = Arc::new(MemoryFs::default().dir("/root").dir("/root/a").dir("/root/a/.git"));
        let detector = Arc::new(detector(fs.clone(), Arc::new(ManualClock::default())));

        let (a, b) = tokio::join!(
            detector.detect_nested_repos(Path::new("/root")),
            detector.detect_nested_repos(Path::new("/root"))
        );
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(fs.calls(), 1);
        assert_eq!(detector.inflight_len(), 0);
    }

    #[tokio::test]
    async fn test_single_flight_locks_are_released_per_root() {
        let fs = Arc::new(
            MemoryFs::default()
                .dir("/one")
                .dir("/two")
                .dir("/three")
                .dir("/three/.git"),
        );
        let detector = detector(fs, Arc::new(ManualClock::default()));

        for root in ["/one", "/two", "/three"] {
            detector.detect_nested_repos(Path::new(root)).await;
        }
        assert_eq!(detector.inflight_len(), 0);

        let cancel = ScanCancel::new();
        cancel.cancel();
        detector.clear_nested_repos_cache(None);
        let result = detector
            .detect_nested_repos_with_cancel(Path::new("/one"), &cancel)
            .await;
        assert!(result.is_err());
        assert_eq!(detector.inflight_len(), 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_real_filesystem_walk_ignores_symlinks() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let root = temp_dir.path();
        std::fs::create_dir_all(root.join(".git")).unwrap();
        std::fs::create_dir_all(root.join("libs/core/.git")).unwrap();
        std::fs::create_dir_all(root.join("target/debug/.git")).unwrap();

        let outside = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(outside.path().join("evil/.git")).unwrap();
        std::os::unix::fs::symlink(outside.path(), root.join("escape")).unwrap();

        let detector = NestedRepoDetector::default();
        let repos = detector.detect_nested_repos(root).await;
        assert_eq!(repos.to_vec(), vec![root.to_path_buf(), root.join("libs/core")]);
    }

    #[test]
    fn test_repo_display_name() {
        let wt = Path::new("/work/wt");
        assert_eq!(get_repo_display_name(wt, wt), "(root)");
        assert_eq!(get_repo_display_name(wt, Path::new("/work/wt/packages/ui")), "packages/ui");
        assert_eq!(get_repo_display_name(wt, Path::new("/work/other")), "../other");
    }
}
