// Change aggregation: filter → classify → bucket → debounce → commit.
//
// A single task owns every pending set and deadline. Events arrive on an
// mpsc channel; the earliest deadline is one `select!` arm. Commits run on
// detached tasks so slow git never blocks ingestion.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, trace, warn};
use watcher_common::path::resolve_lossy;
use watcher_common::types::{ChangeEvent, WatchTarget};

use super::debounce::{DebounceSchedule, ReadyBatch};
use crate::git::CommitRunner;
use crate::ignore::IgnoreMatcher;
use crate::topology::RepoTopology;

pub struct ChangeAggregator {
    matcher: Arc<IgnoreMatcher>,
    topology: Arc<RepoTopology>,
    runner: CommitRunner,
    schedule: DebounceSchedule,
}

impl ChangeAggregator {
    pub fn new(
        matcher: Arc<IgnoreMatcher>,
        topology: Arc<RepoTopology>,
        runner: CommitRunner,
        schedule: DebounceSchedule,
    ) -> Self {
        Self { matcher, topology, runner, schedule }
    }

    /// Filter and bucket one event. Returns the target it was added to, or
    /// `None` when the event was dropped.
    pub fn accept(&mut self, event: &ChangeEvent) -> Option<WatchTarget> {
        let (target, path) = filter(&self.matcher, &self.topology, event)?;
        Some(self.enqueue(target, path, Instant::now()))
    }

    /// `accept` with the filesystem work moved onto the blocking pool.
    async fn ingest(&mut self, event: ChangeEvent) {
        let matcher = Arc::clone(&self.matcher);
        let topology = Arc::clone(&self.topology);
        match tokio::task::spawn_blocking(move || filter(&matcher, &topology, &event)).await {
            Ok(Some((target, path))) => {
                self.enqueue(target, path, Instant::now());
            }
            Ok(None) => {}
            Err(join_error) => warn!(error = %join_error, "event filter task failed"),
        }
    }

    fn enqueue(&mut self, target: WatchTarget, path: PathBuf, now: Instant) -> WatchTarget {
        let pending = self.schedule.push_at(&target, path, now);
        debug!(
            repo = %target,
            pending,
            delay_secs = self.schedule.delay().as_secs(),
            "scheduled commit"
        );
        target
    }

    /// Number of targets with an armed deadline.
    pub fn pending_targets(&self) -> usize {
        self.schedule.pending_count()
    }

    /// Files pending for a target.
    pub fn pending_files(&self, target: &WatchTarget) -> Vec<PathBuf> {
        self.schedule
            .pending_files(target)
            .map(|files| files.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Run the loop on its own task until shutdown.
    pub fn spawn(
        self,
        events: mpsc::Receiver<ChangeEvent>,
        shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        tokio::spawn(self.run(events, shutdown))
    }

    /// Ingest events and fire due commits until shutdown. When the event
    /// source closes, already-armed deadlines still fire.
    pub async fn run(
        mut self,
        mut events: mpsc::Receiver<ChangeEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut events_open = true;
        loop {
            let deadline = self.schedule.next_deadline();
            if !events_open && deadline.is_none() {
                debug!("event source closed and nothing pending");
                break;
            }

            // Due deadlines are polled ahead of events; a busy event stream
            // must not starve other targets.
            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.fire_ready(Instant::now());
                }
                event = events.recv(), if events_open => match event {
                    Some(event) => self.ingest(event).await,
                    None => {
                        debug!("event source closed");
                        events_open = false;
                    }
                },
            }
        }

        let cancelled = self.schedule.cancel_all();
        info!(cancelled, "change aggregator stopped");
    }

    fn fire_ready(&mut self, now: Instant) {
        for ReadyBatch { target, files } in self.schedule.drain_ready(now) {
            info!(repo = %target, files = files.len(), "commit delay elapsed");
            let runner = self.runner.clone();
            tokio::spawn(async move {
                runner.run(target).await;
            });
        }
    }
}

/// Resolve an event's path and decide which target, if any, it belongs to.
/// Touches the filesystem: symlink resolution, the directory check and
/// `.gitignore` lookups.
fn filter(
    matcher: &IgnoreMatcher,
    topology: &RepoTopology,
    event: &ChangeEvent,
) -> Option<(WatchTarget, PathBuf)> {
    let path = resolve_lossy(event.effective_path());
    if path.is_dir() {
        trace!(path = %path.display(), "dropping directory event");
        return None;
    }
    if matcher.should_ignore(&path) {
        trace!(path = %path.display(), "dropping ignored event");
        return None;
    }
    let Some(target) = topology.classify(&path).cloned() else {
        trace!(path = %path.display(), "dropping event outside repository");
        return None;
    };
    Some((target, path))
}
