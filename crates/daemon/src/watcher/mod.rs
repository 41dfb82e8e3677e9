// File watcher: inotify/fsevents → ChangeEvent channel → aggregator.
// This module handles the first stage: raw FS event detection and translation.

pub mod aggregator;
pub mod debounce;

pub use aggregator::ChangeAggregator;
pub use debounce::{DebounceSchedule, ReadyBatch};

use anyhow::{Context, Result};
use notify::event::{CreateKind, ModifyKind, RemoveKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::{debug, error, trace, warn};
use watcher_common::types::ChangeEvent;

/// Capacity for the internal event channel.
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Watches a directory tree using the OS-native file watcher (fsevents on
/// macOS, inotify on Linux).
///
/// File events are sent to the returned receiver; directory events are
/// dropped here. The watcher runs until dropped.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    root: PathBuf,
}

impl FileWatcher {
    /// Start watching `root` recursively.
    pub fn start(root: &Path) -> Result<(Self, mpsc::Receiver<ChangeEvent>)> {
        let root = root
            .canonicalize()
            .with_context(|| format!("failed to canonicalize watch root: {}", root.display()))?;

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let root_for_filter = root.clone();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                for change in translate_event(&event, &root_for_filter) {
                    if tx.blocking_send(change).is_err() {
                        debug!("event channel closed, stopping event dispatch");
                        return;
                    }
                }
            }
            Err(e) => {
                error!(error = %e, "file watcher error");
            }
        })
        .context("failed to create file watcher")?;

        watcher
            .watch(&root, RecursiveMode::Recursive)
            .with_context(|| format!("failed to watch directory: {}", root.display()))?;

        debug!(path = %root.display(), "file watcher started");

        Ok((Self { _watcher: watcher, root }, rx))
    }

    /// The canonicalized root directory being watched.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Returns true if the path is inside the watched root (guards against symlink escapes).
fn is_inside_root(path: &Path, root: &Path) -> bool {
    path.starts_with(root)
}

fn accept_path(path: &Path, root: &Path) -> bool {
    if is_inside_root(path, root) {
        true
    } else {
        warn!(path = %path.display(), "ignoring event outside watch root (possible symlink escape)");
        false
    }
}

fn accept_file(path: &Path, root: &Path) -> bool {
    accept_path(path, root) && !path.is_dir()
}

/// Translate a `notify::Event` into zero or more `ChangeEvent`s.
fn translate_event(event: &Event, root: &Path) -> Vec<ChangeEvent> {
    match &event.kind {
        EventKind::Create(CreateKind::Folder) | EventKind::Remove(RemoveKind::Folder) => {
            trace!(kind = ?event.kind, "skipping directory event");
            Vec::new()
        }
        EventKind::Create(_) => event
            .paths
            .iter()
            .filter(|p| accept_file(p, root))
            .map(|p| ChangeEvent::created(p.clone()))
            .collect(),
        EventKind::Modify(ModifyKind::Metadata(_)) => {
            trace!("skipping metadata-only modify event");
            Vec::new()
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => match event.paths.as_slice() {
            [from, to] if accept_file(to, root) => {
                vec![ChangeEvent::moved(from.clone(), to.clone())]
            }
            _ => Vec::new(),
        },
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => event
            .paths
            .iter()
            .filter(|p| accept_path(p, root))
            .map(|p| ChangeEvent::deleted(p.clone()))
            .collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => event
            .paths
            .iter()
            .filter(|p| accept_file(p, root))
            .map(|p| ChangeEvent::created(p.clone()))
            .collect(),
        EventKind::Modify(_) => event
            .paths
            .iter()
            .filter(|p| accept_file(p, root))
            .map(|p| ChangeEvent::modified(p.clone()))
            .collect(),
        EventKind::Remove(_) => event
            .paths
            .iter()
            .filter(|p| accept_path(p, root))
            .map(|p| ChangeEvent::deleted(p.clone()))
            .collect(),
        // Access, Other, Any: not actionable.
        _ => {
            trace!(kind = ?event.kind, "skipping non-content event");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{DataChange, MetadataKind};
    use std::fs;
    use tempfile::TempDir;
    use tokio::time::{timeout, Duration};
    use watcher_common::types::ChangeKind;

    // ── translate_event unit tests ──────────────────────────────────

    fn make_event(kind: EventKind, paths: Vec<PathBuf>) -> Event {
        Event { kind, paths, attrs: Default::default() }
    }

    #[test]
    fn test_create_file() {
        let root = PathBuf::from("/workspace");
        let event = make_event(
            EventKind::Create(CreateKind::File),
            vec![PathBuf::from("/workspace/notes/doc.txt")],
        );
        let result = translate_event(&event, &root);
        assert_eq!(result, vec![ChangeEvent::created("/workspace/notes/doc.txt")]);
    }

    #[test]
    fn test_modify_data() {
        let root = PathBuf::from("/workspace");
        let event = make_event(
            EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            vec![PathBuf::from("/workspace/a.conf"), PathBuf::from("/workspace/b.conf")],
        );
        let result = translate_event(&event, &root);
        assert_eq!(result.len(), 2);
        assert!(result.iter().all(|e| e.kind == ChangeKind::Modified));
    }

    #[test]
    fn test_remove_file() {
        let root = PathBuf::from("/workspace");
        let event = make_event(
            EventKind::Remove(RemoveKind::File),
            vec![PathBuf::from("/workspace/gone.txt")],
        );
        assert_eq!(translate_event(&event, &root), vec![ChangeEvent::deleted("/workspace/gone.txt")]);
    }

    #[test]
    fn test_rename_both_is_move() {
        let root = PathBuf::from("/workspace");
        let event = make_event(
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            vec![PathBuf::from("/workspace/old.txt"), PathBuf::from("/workspace/new.txt")],
        );
        let result = translate_event(&event, &root);
        assert_eq!(result, vec![ChangeEvent::moved("/workspace/old.txt", "/workspace/new.txt")]);
        assert_eq!(result[0].effective_path(), Path::new("/workspace/new.txt"));
    }

    #[test]
    fn test_rename_halves() {
        let root = PathBuf::from("/workspace");
        let from = make_event(
            EventKind::Modify(ModifyKind::Name(RenameMode::From)),
            vec![PathBuf::from("/workspace/old.txt")],
        );
        let to = make_event(
            EventKind::Modify(ModifyKind::Name(RenameMode::To)),
            vec![PathBuf::from("/workspace/new.txt")],
        );
        assert_eq!(translate_event(&from, &root)[0].kind, ChangeKind::Deleted);
        assert_eq!(translate_event(&to, &root)[0].kind, ChangeKind::Created);
    }

    #[test]
    fn test_directory_events_dropped() {
        let root = PathBuf::from("/workspace");
        let event =
            make_event(EventKind::Create(CreateKind::Folder), vec![PathBuf::from("/workspace/dir")]);
        assert!(translate_event(&event, &root).is_empty());

        let event =
            make_event(EventKind::Remove(RemoveKind::Folder), vec![PathBuf::from("/workspace/dir")]);
        assert!(translate_event(&event, &root).is_empty());
    }

    #[test]
    fn test_rejects_outside_root() {
        let root = PathBuf::from("/workspace");
        let event =
            make_event(EventKind::Create(CreateKind::File), vec![PathBuf::from("/etc/passwd")]);
        assert!(translate_event(&event, &root).is_empty());
    }

    #[test]
    fn test_skips_metadata_events() {
        let root = PathBuf::from("/workspace");
        let event = make_event(
            EventKind::Modify(ModifyKind::Metadata(MetadataKind::Permissions)),
            vec![PathBuf::from("/workspace/doc.txt")],
        );
        assert!(translate_event(&event, &root).is_empty());
    }

    #[test]
    fn test_inside_root() {
        let root = Path::new("/workspace");
        assert!(is_inside_root(Path::new("/workspace/doc.txt"), root));
        assert!(is_inside_root(Path::new("/workspace/sub/doc.txt"), root));
        assert!(!is_inside_root(Path::new("/other/doc.txt"), root));
        assert!(!is_inside_root(Path::new("/workspaceX/doc.txt"), root));
    }

    // ── Integration test: actual filesystem ────────────────────────

    #[tokio::test]
    async fn test_watcher_detects_create() {
        let tmp = TempDir::new().unwrap();
        let (watcher, mut rx) = FileWatcher::start(tmp.path()).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        fs::write(tmp.path().join("test.txt"), "hello").unwrap();

        let event = timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for create event")
            .expect("channel closed");

        assert!(matches!(event.kind, ChangeKind::Created | ChangeKind::Modified));
        assert!(event.path.ends_with("test.txt"));

        drop(watcher);
    }

    #[tokio::test]
    async fn test_watcher_skips_new_directories() {
        let tmp = TempDir::new().unwrap();
        let (watcher, mut rx) = FileWatcher::start(tmp.path()).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        fs::create_dir(tmp.path().join("nested")).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        fs::write(tmp.path().join("after.txt"), "x").unwrap();

        let event = timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for event")
            .expect("channel closed");
        assert!(event.path.ends_with("after.txt"));

        drop(watcher);
    }

    #[tokio::test]
    async fn test_watcher_detects_delete() {
        let tmp = TempDir::new().unwrap();
        let file_path = tmp.path().join("to_delete.txt");
        fs::write(&file_path, "bye").unwrap();

        let (watcher, mut rx) = FileWatcher::start(tmp.path()).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        fs::remove_file(&file_path).unwrap();

        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        let mut found_delete = false;
        while tokio::time::Instant::now() < deadline {
            match timeout(Duration::from_secs(2), rx.recv()).await {
                Ok(Some(event)) if event.kind == ChangeKind::Deleted => {
                    assert!(event.path.ends_with("to_delete.txt"));
                    found_delete = true;
                    break;
                }
                Ok(Some(_)) => continue,
                _ => break,
            }
        }
        assert!(found_delete, "expected a Deleted event for to_delete.txt");

        drop(watcher);
    }

    #[test]
    fn test_watcher_rejects_nonexistent_root() {
        let result = FileWatcher::start(Path::new("/nonexistent/path/abc123"));
        assert!(result.is_err());
    }

    #[test]
    fn test_watcher_exposes_root() {
        let tmp = TempDir::new().unwrap();
        let (watcher, _rx) = FileWatcher::start(tmp.path()).unwrap();
        assert_eq!(watcher.root(), tmp.path().canonicalize().unwrap());
    }
}
