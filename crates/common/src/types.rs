// Core domain types shared across the watcher crates.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Whether a watch target is the root repository or one of its submodules.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TargetKind {
    Root,
    Submodule {
        /// Root repository that records this submodule's pointer.
        parent: PathBuf,
        /// Submodule path relative to `parent`.
        relative: PathBuf,
    },
}

/// One git working directory whose changes are committed independently.
///
/// Built once at engine startup from submodule discovery and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WatchTarget {
    /// Absolute path of the working directory.
    pub path: PathBuf,
    #[serde(flatten)]
    pub kind: TargetKind,
}

impl WatchTarget {
    pub fn root(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), kind: TargetKind::Root }
    }

    pub fn submodule(parent: impl Into<PathBuf>, relative: impl Into<PathBuf>) -> Self {
        let parent = parent.into();
        let relative = relative.into();
        Self { path: parent.join(&relative), kind: TargetKind::Submodule { parent, relative } }
    }

    pub fn is_root(&self) -> bool {
        matches!(self.kind, TargetKind::Root)
    }

    /// Root repository for a submodule target.
    pub fn parent(&self) -> Option<&Path> {
        match &self.kind {
            TargetKind::Root => None,
            TargetKind::Submodule { parent, .. } => Some(parent),
        }
    }

    /// Path of a submodule relative to its root repository.
    pub fn relative_path(&self) -> Option<&Path> {
        match &self.kind {
            TargetKind::Root => None,
            TargetKind::Submodule { relative, .. } => Some(relative),
        }
    }

    /// Final path component, used in notifications and reference-update messages.
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// Human label: `main repo` or `submodule <name>`.
    pub fn label(&self) -> String {
        match self.kind {
            TargetKind::Root => "main repo".to_string(),
            TargetKind::Submodule { .. } => format!("submodule {}", self.name()),
        }
    }

    pub fn contains(&self, path: &Path) -> bool {
        path.starts_with(&self.path)
    }
}

impl fmt::Display for WatchTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Kind of filesystem change reported by the event source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Created,
    Modified,
    Deleted,
    Moved,
}

/// A file change delivered by the event source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub path: PathBuf,
    pub kind: ChangeKind,
    /// Destination of a move; `None` for every other kind.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest_path: Option<PathBuf>,
}

impl ChangeEvent {
    pub fn created(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), kind: ChangeKind::Created, dest_path: None }
    }

    pub fn modified(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), kind: ChangeKind::Modified, dest_path: None }
    }

    pub fn deleted(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), kind: ChangeKind::Deleted, dest_path: None }
    }

    pub fn moved(from: impl Into<PathBuf>, to: impl Into<PathBuf>) -> Self {
        Self { path: from.into(), kind: ChangeKind::Moved, dest_path: Some(to.into()) }
    }

    /// The path that should be bucketed: the destination for moves.
    pub fn effective_path(&self) -> &Path {
        match (&self.kind, &self.dest_path) {
            (ChangeKind::Moved, Some(dest)) => dest,
            _ => &self.path,
        }
    }
}
