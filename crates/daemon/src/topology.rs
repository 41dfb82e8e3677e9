// Root repository plus submodule working directories, and path classification.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use watcher_common::path::resolve_lossy;
use watcher_common::types::WatchTarget;

use crate::git::GitOrchestrator;

/// The fixed set of watch targets for one engine run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoTopology {
    root: WatchTarget,
    /// Sorted deepest-first so the first containing entry is the most specific.
    submodules: Vec<WatchTarget>,
}

impl RepoTopology {
    /// Enumerate submodules of `root_dir` via git. A git failure degrades to a
    /// topology with no submodules.
    pub fn discover(git: &GitOrchestrator, root_dir: &Path) -> Self {
        let root_dir = resolve_lossy(root_dir);
        let outcome = git.list_submodules(&root_dir);
        if !outcome.success {
            warn!(root = %root_dir.display(), "submodule discovery failed; watching root only");
            return Self::new(root_dir, Vec::<PathBuf>::new());
        }

        let relatives: Vec<PathBuf> = outcome
            .stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(PathBuf::from)
            .collect();
        debug!(root = %root_dir.display(), count = relatives.len(), "discovered submodules");
        Self::new(root_dir, relatives)
    }

    /// Build a topology from already-known submodule paths relative to `root_dir`.
    pub fn new<I, P>(root_dir: impl Into<PathBuf>, submodules: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let root_dir = root_dir.into();
        let mut submodules: Vec<WatchTarget> = submodules
            .into_iter()
            .map(|relative| WatchTarget::submodule(root_dir.clone(), relative))
            .collect();
        submodules.sort_by(|a, b| {
            b.path.components().count().cmp(&a.path.components().count()).then(a.path.cmp(&b.path))
        });
        submodules.dedup_by(|a, b| a.path == b.path);
        Self { root: WatchTarget::root(root_dir), submodules }
    }

    pub fn root(&self) -> &WatchTarget {
        &self.root
    }

    pub fn submodules(&self) -> &[WatchTarget] {
        &self.submodules
    }

    /// Root first, then every submodule.
    pub fn targets(&self) -> impl Iterator<Item = &WatchTarget> {
        std::iter::once(&self.root).chain(self.submodules.iter())
    }

    /// Most specific target containing `path`, or `None` outside the root.
    pub fn classify(&self, path: &Path) -> Option<&WatchTarget> {
        if !self.root.contains(path) {
            return None;
        }
        Some(self.submodules.iter().find(|sub| sub.contains(path)).unwrap_or(&self.root))
    }

    /// Target whose working directory is exactly `path`.
    pub fn get(&self, path: &Path) -> Option<&WatchTarget> {
        self.targets().find(|target| target.path == path)
    }
}
