// Per-target commit debouncing.
//
// Each target with pending changes has one deadline: the time of its most
// recent accepted event plus the commit delay. A new event for the target
// pushes the deadline out ("last event wins"); targets never share a timer.

use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::time::Duration;

use tokio::time::Instant;
use watcher_common::types::WatchTarget;

/// Upper bound on the commit delay. Deadlines past this would overflow
/// `Instant`, so longer delays are clamped to it (about 30 years).
pub const MAX_DELAY: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Pending changes for one target.
struct PendingTarget {
    target: WatchTarget,
    files: BTreeSet<PathBuf>,
    last_seen: Instant,
}

/// A target whose quiet period has elapsed, with the files that triggered it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadyBatch {
    pub target: WatchTarget,
    pub files: BTreeSet<PathBuf>,
}

/// Pending change sets plus their deadlines, keyed by target path.
///
/// Call `push()` for each accepted event and `drain_ready()` when the
/// earliest deadline passes.
pub struct DebounceSchedule {
    delay: Duration,
    pending: HashMap<PathBuf, PendingTarget>,
}

impl DebounceSchedule {
    pub fn new(delay: Duration) -> Self {
        Self { delay: delay.min(MAX_DELAY), pending: HashMap::new() }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Record a changed file for `target` and re-arm its deadline.
    /// Returns the number of files now pending for the target.
    pub fn push(&mut self, target: &WatchTarget, file: PathBuf) -> usize {
        self.push_at(target, file, Instant::now())
    }

    /// Like `push` but with a specific timestamp.
    pub fn push_at(&mut self, target: &WatchTarget, file: PathBuf, now: Instant) -> usize {
        let entry = self.pending.entry(target.path.clone()).or_insert_with(|| PendingTarget {
            target: target.clone(),
            files: BTreeSet::new(),
            last_seen: now,
        });
        entry.files.insert(file);
        entry.last_seen = now;
        entry.files.len()
    }

    /// Remove and return every target whose deadline is at or before `now`.
    /// Each pending set is swapped out whole, so later pushes start fresh.
    pub fn drain_ready(&mut self, now: Instant) -> Vec<ReadyBatch> {
        let due: Vec<PathBuf> = self
            .pending
            .iter()
            .filter(|(_, pending)| self.deadline_of(pending) <= now)
            .map(|(path, _)| path.clone())
            .collect();

        let mut ready: Vec<ReadyBatch> = due
            .into_iter()
            .filter_map(|path| self.pending.remove(&path))
            .map(|pending| ReadyBatch { target: pending.target, files: pending.files })
            .collect();
        ready.sort_by(|a, b| a.target.path.cmp(&b.target.path));
        ready
    }

    /// Earliest deadline across all targets, or `None` when idle.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|pending| self.deadline_of(pending)).min()
    }

    fn deadline_of(&self, pending: &PendingTarget) -> Instant {
        pending.last_seen + self.delay
    }

    /// Number of targets with an armed deadline.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Files pending for a target.
    pub fn pending_files(&self, target: &WatchTarget) -> Option<&BTreeSet<PathBuf>> {
        self.pending.get(&target.path).map(|pending| &pending.files)
    }

    /// Drop every pending set and deadline. Returns how many targets were armed.
    pub fn cancel_all(&mut self) -> usize {
        let cancelled = self.pending.len();
        self.pending.clear();
        cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_secs(60);

    fn root() -> WatchTarget {
        WatchTarget::root("/repo")
    }

    fn submodule() -> WatchTarget {
        WatchTarget::submodule("/repo", "nvim")
    }

    // ── Single target lifecycle ────────────────────────────────────

    #[test]
    fn not_ready_before_delay() {
        let mut schedule = DebounceSchedule::new(DELAY);
        let now = Instant::now();

        schedule.push_at(&root(), "/repo/a.txt".into(), now);

        assert!(schedule.drain_ready(now + Duration::from_secs(59)).is_empty());
        assert_eq!(schedule.pending_count(), 1);
        assert_eq!(schedule.next_deadline(), Some(now + DELAY));
    }

    #[test]
    fn ready_at_delay() {
        let mut schedule = DebounceSchedule::new(DELAY);
        let now = Instant::now();

        schedule.push_at(&root(), "/repo/a.txt".into(), now);
        let ready = schedule.drain_ready(now + DELAY);

        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].target, root());
        assert!(ready[0].files.contains(&PathBuf::from("/repo/a.txt")));
        assert_eq!(schedule.pending_count(), 0);
        assert_eq!(schedule.next_deadline(), None);
    }

    // ── Burst coalescing ───────────────────────────────────────────

    #[test]
    fn burst_is_timed_from_last_event() {
        let mut schedule = DebounceSchedule::new(DELAY);
        let now = Instant::now();

        schedule.push_at(&root(), "/repo/a.txt".into(), now);
        schedule.push_at(&root(), "/repo/b.txt".into(), now + Duration::from_secs(30));
        let count = schedule.push_at(&root(), "/repo/a.txt".into(), now + Duration::from_secs(50));

        assert_eq!(count, 2);
        assert!(schedule.drain_ready(now + Duration::from_secs(100)).is_empty());
        let ready = schedule.drain_ready(now + Duration::from_secs(110));
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].files.len(), 2);
    }

    #[test]
    fn huge_delay_is_clamped_instead_of_overflowing() {
        let config = watcher_common::config::WatcherConfig {
            commit_delay: i64::MAX,
            ..Default::default()
        };
        assert!(!config.validate().errors.iter().any(|e| e.contains("commit_delay")));
        let mut schedule = DebounceSchedule::new(config.commit_delay());
        let now = Instant::now();

        schedule.push_at(&root(), "/repo/a.txt".into(), now);

        assert_eq!(schedule.delay(), MAX_DELAY);
        assert_eq!(schedule.next_deadline(), Some(now + MAX_DELAY));
        assert!(schedule.drain_ready(now + Duration::from_secs(86_400 * 365)).is_empty());
        assert_eq!(schedule.drain_ready(now + MAX_DELAY).len(), 1);
    }

    #[test]
    fn zero_delay_is_ready_immediately() {
        let mut schedule = DebounceSchedule::new(Duration::ZERO);
        let now = Instant::now();

        schedule.push_at(&root(), "/repo/a.txt".into(), now);

        assert_eq!(schedule.drain_ready(now).len(), 1);
    }

    // ── Independent targets ────────────────────────────────────────

    #[test]
    fn targets_have_independent_deadlines() {
        let mut schedule = DebounceSchedule::new(DELAY);
        let now = Instant::now();

        schedule.push_at(&root(), "/repo/a.txt".into(), now);
        schedule.push_at(&submodule(), "/repo/nvim/init.lua".into(), now + Duration::from_secs(20));

        let ready = schedule.drain_ready(now + DELAY);
        assert_eq!(ready.len(), 1);
        assert!(ready[0].target.is_root());
        assert_eq!(schedule.next_deadline(), Some(now + Duration::from_secs(80)));

        let ready = schedule.drain_ready(now + Duration::from_secs(80));
        assert_eq!(ready[0].target, submodule());
    }

    #[test]
    fn push_after_drain_starts_fresh_cycle() {
        let mut schedule = DebounceSchedule::new(DELAY);
        let now = Instant::now();

        schedule.push_at(&root(), "/repo/a.txt".into(), now);
        schedule.drain_ready(now + DELAY);
        schedule.push_at(&root(), "/repo/b.txt".into(), now + DELAY);

        let files = schedule.pending_files(&root()).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files.contains(&PathBuf::from("/repo/b.txt")));
    }

    #[test]
    fn cancel_all_clears_deadlines() {
        let mut schedule = DebounceSchedule::new(DELAY);
        let now = Instant::now();
        schedule.push_at(&root(), "/repo/a.txt".into(), now);
        schedule.push_at(&submodule(), "/repo/nvim/x".into(), now);

        assert_eq!(schedule.cancel_all(), 2);
        assert_eq!(schedule.next_deadline(), None);
        assert!(schedule.drain_ready(now + DELAY * 2).is_empty());
    }
}
