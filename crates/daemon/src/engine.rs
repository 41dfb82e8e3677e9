// Watcher engine: validates the config, discovers targets, commits changes
// left over from before startup, then runs the aggregator and the remote
// poller until stopped.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use watcher_common::config::WatcherConfig;
use watcher_common::types::ChangeEvent;

use crate::git::{
    CommitPipeline, CommitPolicy, CommitRecord, CommitRunner, GitOrchestrator, RemoteSyncPoller,
};
use crate::ignore::IgnoreMatcher;
use crate::notification::{DesktopNotifier, Notifier};
use crate::process::{CommandExecutor, ProcessCommandExecutor};
use crate::topology::RepoTopology;
use crate::watcher::{ChangeAggregator, DebounceSchedule, FileWatcher};

/// Builder for one running watcher.
pub struct WatcherEngine {
    config: WatcherConfig,
    executor: Arc<dyn CommandExecutor>,
    notifier: Arc<dyn Notifier>,
    global_ignore: Option<PathBuf>,
    observer: Option<mpsc::UnboundedSender<CommitRecord>>,
}

impl WatcherEngine {
    /// Engine that shells out to git and `notify-send`.
    pub fn new(config: WatcherConfig) -> Self {
        Self {
            config,
            executor: Arc::new(ProcessCommandExecutor),
            notifier: Arc::new(DesktopNotifier::new()),
            global_ignore: None,
            observer: None,
        }
    }

    pub fn with_executor(mut self, executor: Arc<dyn CommandExecutor>) -> Self {
        self.executor = executor;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Shared ignore rule file applied before the config's own patterns.
    pub fn with_global_ignore(mut self, path: impl Into<PathBuf>) -> Self {
        self.global_ignore = Some(path.into());
        self
    }

    /// Receive a `CommitRecord` for every finished commit attempt.
    pub fn with_commit_observer(mut self, observer: mpsc::UnboundedSender<CommitRecord>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Start with the OS file watcher on `watch_directory` as the event source.
    pub async fn start(self) -> Result<EngineHandle> {
        let prepared = self.prepare().await?;
        let (watcher, events) = FileWatcher::start(&prepared.config.watch_directory)
            .context("failed to start file watcher")?;
        Ok(prepared.launch(events, Some(watcher)))
    }

    /// Start with a caller-supplied event source.
    pub async fn start_with_events(
        self,
        events: mpsc::Receiver<ChangeEvent>,
    ) -> Result<EngineHandle> {
        Ok(self.prepare().await?.launch(events, None))
    }

    async fn prepare(self) -> Result<Prepared> {
        let config = self.config.expand_paths();
        let report = config.validate();
        for warning in &report.warnings {
            warn!(config = %config.name, "{warning}");
        }
        if !report.is_valid() {
            bail!("invalid configuration '{}': {}", config.name, report.errors.join("; "));
        }

        let git = GitOrchestrator::with_executor(Arc::clone(&self.executor));
        let (topology, matcher) = {
            let git = git.clone();
            let config = config.clone();
            let global_ignore = self.global_ignore.clone();
            tokio::task::spawn_blocking(move || {
                let topology = RepoTopology::discover(&git, &config.repo_directory);
                let matcher = IgnoreMatcher::from_config(&config, global_ignore.as_deref());
                (topology, matcher)
            })
            .await
            .context("target discovery task failed")?
        };
        info!(
            config = %config.name,
            repo = %topology.root().path.display(),
            submodules = topology.submodules().len(),
            "discovered watch targets"
        );

        let policy = CommitPolicy::from_config(&config);
        let pipeline = CommitPipeline::new(git.clone(), Arc::clone(&self.notifier), policy);
        let mut runner = CommitRunner::new(pipeline);
        if let Some(observer) = self.observer {
            runner = runner.with_observer(observer);
        }

        for target in topology.targets() {
            runner.commit_existing(target.clone()).await;
        }

        let poller = RemoteSyncPoller::new(
            git,
            self.notifier,
            topology.targets().cloned().collect(),
            config.name.clone(),
            config.remote_notifications(),
        );

        Ok(Prepared {
            config,
            topology: Arc::new(topology),
            matcher: Arc::new(matcher),
            runner,
            poller: Arc::new(poller),
        })
    }
}

struct Prepared {
    config: WatcherConfig,
    topology: Arc<RepoTopology>,
    matcher: Arc<IgnoreMatcher>,
    runner: CommitRunner,
    poller: Arc<RemoteSyncPoller>,
}

impl Prepared {
    fn launch(
        self,
        events: mpsc::Receiver<ChangeEvent>,
        watcher: Option<FileWatcher>,
    ) -> EngineHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let poller = self.poller.spawn(self.config.fetch_interval(), shutdown_rx.clone());
        let aggregator = ChangeAggregator::new(
            Arc::clone(&self.matcher),
            Arc::clone(&self.topology),
            self.runner,
            DebounceSchedule::new(self.config.commit_delay()),
        )
        .spawn(events, shutdown_rx);

        info!(
            config = %self.config.name,
            watch = %self.config.watch_directory.display(),
            commit_delay_secs = self.config.commit_delay().as_secs(),
            "watcher started"
        );

        EngineHandle {
            shutdown_tx,
            aggregator,
            poller,
            topology: self.topology,
            matcher: self.matcher,
            _watcher: watcher,
        }
    }
}

/// Handle for a running engine.
pub struct EngineHandle {
    shutdown_tx: watch::Sender<bool>,
    aggregator: JoinHandle<()>,
    poller: Option<JoinHandle<()>>,
    topology: Arc<RepoTopology>,
    matcher: Arc<IgnoreMatcher>,
    _watcher: Option<FileWatcher>,
}

impl EngineHandle {
    pub fn topology(&self) -> &RepoTopology {
        &self.topology
    }

    pub fn matcher(&self) -> &IgnoreMatcher {
        &self.matcher
    }

    /// Cancel every armed commit deadline and the poller timer.
    ///
    /// Returns once the aggregator has exited, so no new commit starts
    /// afterwards. Commits and poll cycles already running are left to finish.
    pub async fn stop(self) {
        info!("stopping watcher");
        let _ = self.shutdown_tx.send(true);
        if let Err(join_error) = self.aggregator.await {
            warn!(error = %join_error, "change aggregator task failed");
        }
        drop(self.poller);
        drop(self._watcher);
    }
}
