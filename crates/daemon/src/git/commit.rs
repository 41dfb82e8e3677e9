// Commit state machine for one target: stage → status → commit → notify → push,
// plus the root follow-up that records a submodule's new pointer.
//
// `CommitPipeline` is synchronous and runs on the blocking pool.
// `CommitRunner` wraps it with per-target locks and the record observer.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};
use watcher_common::config::WatcherConfig;
use watcher_common::types::WatchTarget;

use super::message::{submodule_update_message, ChangeSummary, FALLBACK_MESSAGE};
use super::GitOrchestrator;
use crate::notification::Notifier;

const COMMIT_NOTIFICATION_TIMEOUT: Duration = Duration::from_secs(5);

// ── Commit records ──────────────────────────────────────────────────

/// What a commit attempt was for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitKind {
    /// Pending changes in the target's own working tree.
    Changes,
    /// Root commit of a submodule's updated pointer.
    SubmoduleReference,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitStatus {
    Committed,
    /// Nothing to commit after staging.
    Clean,
    /// A git step failed; the attempt was abandoned.
    Failed { step: &'static str },
}

/// Ephemeral descriptor of one commit attempt. Drives logging and
/// notifications; never persisted.
#[derive(Debug, Clone)]
pub struct CommitRecord {
    pub target: WatchTarget,
    pub kind: CommitKind,
    pub summary: ChangeSummary,
    pub message: String,
    pub status: CommitStatus,
    /// `None` when no push was attempted.
    pub pushed: Option<bool>,
    pub at: DateTime<Utc>,
}

impl CommitRecord {
    fn new(target: WatchTarget, kind: CommitKind) -> Self {
        Self {
            target,
            kind,
            summary: ChangeSummary::default(),
            message: String::new(),
            status: CommitStatus::Clean,
            pushed: None,
            at: Utc::now(),
        }
    }

    fn failed(mut self, step: &'static str) -> Self {
        self.status = CommitStatus::Failed { step };
        self
    }

    pub fn committed(&self) -> bool {
        self.status == CommitStatus::Committed
    }

    pub fn success(&self) -> bool {
        !matches!(self.status, CommitStatus::Failed { .. })
    }
}

// ── Pipeline ────────────────────────────────────────────────────────

/// Commit behaviour taken from the watcher config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitPolicy {
    /// Config name, used in notification titles.
    pub name: String,
    pub auto_push: bool,
    pub notify_on_commit: bool,
}

impl CommitPolicy {
    pub fn from_config(config: &WatcherConfig) -> Self {
        Self {
            name: config.name.clone(),
            auto_push: config.auto_push,
            notify_on_commit: config.commit_notifications(),
        }
    }
}

pub struct CommitPipeline {
    git: GitOrchestrator,
    notifier: Arc<dyn Notifier>,
    policy: CommitPolicy,
}

impl CommitPipeline {
    pub fn new(git: GitOrchestrator, notifier: Arc<dyn Notifier>, policy: CommitPolicy) -> Self {
        Self { git, notifier, policy }
    }

    /// True if `git status --porcelain` reports anything. A failed status
    /// counts as nothing to do.
    pub fn has_uncommitted_changes(&self, target: &WatchTarget) -> bool {
        let status = self.git.status(&target.path);
        status.success && !status.stdout.trim().is_empty()
    }

    /// Stage everything in the target, describe it from live status, commit,
    /// then notify (root only) and push per policy.
    pub fn commit_target(&self, target: &WatchTarget) -> CommitRecord {
        let mut record = CommitRecord::new(target.clone(), CommitKind::Changes);

        if !self.git.stage_all(&target.path).success {
            warn!(repo = %target, "failed to stage changes");
            return record.failed("stage");
        }

        let status = self.git.status(&target.path);
        if status.success && status.stdout.trim().is_empty() {
            debug!(repo = %target, "nothing to commit");
            return record;
        }
        record.summary = ChangeSummary::from_porcelain(&status.stdout);
        record.message = if status.success {
            record.summary.message()
        } else {
            FALLBACK_MESSAGE.to_string()
        };

        if !self.git.commit(&target.path, &record.message).success {
            warn!(repo = %target, "failed to commit changes");
            return record.failed("commit");
        }
        record.status = CommitStatus::Committed;
        info!(repo = %target, message = %record.message, "committed");

        if target.is_root() {
            self.notify_commit(&record.message);
        }
        record.pushed = self.push(target);
        record
    }

    /// Stage the submodule's path in its root and commit if the pointer moved.
    /// Returns `None` for a root target.
    pub fn update_submodule_reference(&self, submodule: &WatchTarget) -> Option<CommitRecord> {
        let (parent, relative) = (submodule.parent()?, submodule.relative_path()?);
        let root = WatchTarget::root(parent);
        let mut record = CommitRecord::new(root.clone(), CommitKind::SubmoduleReference);
        record.message = submodule_update_message(&submodule.name());

        if !self.git.stage_path(parent, relative).success {
            return Some(record.failed("stage"));
        }

        match self.git.has_staged_changes(parent) {
            Some(true) => {}
            Some(false) => {
                debug!(submodule = %submodule, "submodule pointer unchanged");
                return Some(record);
            }
            None => return Some(record.failed("diff")),
        }

        if !self.git.commit(parent, &record.message).success {
            return Some(record.failed("commit"));
        }
        record.status = CommitStatus::Committed;
        info!(repo = %root, message = %record.message, "committed submodule update");

        self.notify_commit(&record.message);
        record.pushed = self.push(&root);
        Some(record)
    }

    fn push(&self, target: &WatchTarget) -> Option<bool> {
        if !self.policy.auto_push {
            return None;
        }
        let pushed = self.git.push(&target.path).success;
        if pushed {
            info!(repo = %target, "pushed");
        } else {
            warn!(repo = %target, "push failed");
        }
        Some(pushed)
    }

    fn notify_commit(&self, message: &str) {
        if !self.policy.notify_on_commit {
            return;
        }
        let title = format!("{} Commit", self.policy.name);
        if let Err(error) = self.notifier.notify(&title, message, COMMIT_NOTIFICATION_TIMEOUT) {
            warn!(error = %error, "failed to send commit notification");
        }
    }
}

// ── Runner ──────────────────────────────────────────────────────────

/// Serializes commits per target and forwards finished records.
#[derive(Clone)]
pub struct CommitRunner {
    pipeline: Arc<CommitPipeline>,
    locks: Arc<StdMutex<HashMap<PathBuf, Arc<Mutex<()>>>>>,
    observer: Option<mpsc::UnboundedSender<CommitRecord>>,
}

impl CommitRunner {
    pub fn new(pipeline: CommitPipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            locks: Arc::new(StdMutex::new(HashMap::new())),
            observer: None,
        }
    }

    /// Receive every finished `CommitRecord`.
    pub fn with_observer(mut self, observer: mpsc::UnboundedSender<CommitRecord>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Commit a target and, for a committed submodule, follow up in the root.
    ///
    /// The target's lock is released before the root lock is taken.
    pub async fn run(&self, target: WatchTarget) -> Vec<CommitRecord> {
        let mut records = Vec::with_capacity(2);

        let job = target.clone();
        let record = self.locked(&target, move |pipeline| Some(pipeline.commit_target(&job))).await;
        let Some(record) = record else {
            return records;
        };
        let committed = record.committed();
        self.emit(&record);
        records.push(record);

        if !committed {
            return records;
        }
        if let Some(parent) = target.parent().map(WatchTarget::root) {
            let submodule = target.clone();
            let follow_up = self
                .locked(&parent, move |pipeline| pipeline.update_submodule_reference(&submodule))
                .await;
            if let Some(follow_up) = follow_up {
                if !follow_up.success() {
                    warn!(
                        submodule = %target,
                        "submodule committed but root pointer update failed; root is behind"
                    );
                }
                self.emit(&follow_up);
                records.push(follow_up);
            }
        }
        records
    }

    /// Commit pre-existing changes in a target, if it has any.
    pub async fn commit_existing(&self, target: WatchTarget) -> Vec<CommitRecord> {
        let job = target.clone();
        let dirty = self
            .locked(&target, move |pipeline| Some(pipeline.has_uncommitted_changes(&job)))
            .await
            .unwrap_or(false);
        if !dirty {
            return Vec::new();
        }
        info!(repo = %target, "committing existing changes");
        self.run(target).await
    }

    async fn locked<T, F>(&self, target: &WatchTarget, work: F) -> Option<T>
    where
        T: Send + 'static,
        F: FnOnce(&CommitPipeline) -> Option<T> + Send + 'static,
    {
        let lock = self.lock_for(target);
        let _guard = lock.lock().await;
        let pipeline = Arc::clone(&self.pipeline);
        match tokio::task::spawn_blocking(move || work(&pipeline)).await {
            Ok(result) => result,
            Err(join_error) => {
                error!(repo = %target, error = %join_error, "commit task failed");
                None
            }
        }
    }

    fn lock_for(&self, target: &WatchTarget) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(target.path.clone()).or_default())
    }

    fn emit(&self, record: &CommitRecord) {
        if let Some(observer) = &self.observer {
            let _ = observer.send(record.clone());
        }
    }
}
