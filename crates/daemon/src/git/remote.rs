// Periodic remote polling.
//
// Every `interval`, fetch each target and compare the local head captured
// before the fetch with `origin/<branch>`. Runs independently of the commit
// path; a failure on one target only drops that target's report.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use watcher_common::types::WatchTarget;

use super::message::new_commits_summary;
use super::GitOrchestrator;
use crate::notification::Notifier;

const REMOTE_NOTIFICATION_TIMEOUT: Duration = Duration::from_secs(10);

/// Upstream commits found for one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteChange {
    pub target: WatchTarget,
    pub old_head: String,
    pub remote_head: String,
    /// `git rev-list --count old..remote`.
    pub count: u64,
}

impl RemoteChange {
    /// `N new commit(s)`.
    pub fn summary(&self) -> String {
        new_commits_summary(self.count)
    }

    /// Notification body: `Main repo: …` or `<submodule>: …`.
    pub fn notification_body(&self) -> String {
        let owner = if self.target.is_root() { "Main repo".to_string() } else { self.target.name() };
        format!("{owner}: {}", self.summary())
    }
}

pub struct RemoteSyncPoller {
    git: GitOrchestrator,
    notifier: Arc<dyn Notifier>,
    targets: Vec<WatchTarget>,
    /// Config name, used in the notification title.
    name: String,
    notify: bool,
}

impl RemoteSyncPoller {
    pub fn new(
        git: GitOrchestrator,
        notifier: Arc<dyn Notifier>,
        targets: Vec<WatchTarget>,
        name: impl Into<String>,
        notify: bool,
    ) -> Self {
        Self { git, notifier, targets, name: name.into(), notify }
    }

    /// Fetch one target and report upstream commits. `None` when up to date,
    /// detached, or any git step failed.
    pub fn check_target(&self, target: &WatchTarget) -> Option<RemoteChange> {
        let cwd = &target.path;
        let old_head = self.git.rev_parse(cwd, "HEAD")?;
        if !self.git.fetch(cwd).success {
            return None;
        }
        let Some(branch) = self.git.current_branch(cwd) else {
            debug!(repo = %target, "no current branch; skipping remote check");
            return None;
        };
        let remote_head = self.git.rev_parse(cwd, &format!("origin/{branch}"))?;
        if remote_head == old_head {
            return None;
        }
        let count = self.git.rev_list_count(cwd, &format!("{old_head}..{remote_head}"))?;
        Some(RemoteChange { target: target.clone(), old_head, remote_head, count })
    }

    /// One sequential pass over every target, root first. Sends one
    /// notification per changed target when enabled.
    pub fn poll_once(&self) -> Vec<RemoteChange> {
        info!(targets = self.targets.len(), "checking remotes");
        let changes: Vec<RemoteChange> =
            self.targets.iter().filter_map(|target| self.check_target(target)).collect();

        for change in &changes {
            info!(repo = %change.target, summary = %change.summary(), "remote has new commits");
        }
        if self.notify {
            let title = format!("{} Remote Changes", self.name);
            for change in &changes {
                let body = change.notification_body();
                if let Err(error) = self.notifier.notify(&title, &body, REMOTE_NOTIFICATION_TIMEOUT) {
                    warn!(error = %error, "failed to send remote change notification");
                }
            }
        }
        changes
    }

    /// Poll every `interval` until shutdown. The first pass runs one interval
    /// after start. Returns `None` when `interval` is zero.
    pub fn spawn(
        self: Arc<Self>,
        interval: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> Option<JoinHandle<()>> {
        if interval.is_zero() {
            info!("remote polling disabled");
            return None;
        }
        info!(interval_secs = interval.as_secs(), "remote polling started");

        Some(tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {},
                    _ = shutdown.changed() => {
                        debug!("remote poller shutting down");
                        break;
                    }
                }
                if *shutdown.borrow() {
                    break;
                }

                let poller = Arc::clone(&self);
                let cycle = tokio::task::spawn_blocking(move || poller.poll_once());
                if let Err(join_error) = cycle.await {
                    error!(error = %join_error, "remote poll cycle panicked");
                }
            }
        }))
    }
}
