// Git side of the watcher: command orchestration, commit messages, the
// per-target commit pipeline, and remote polling.

pub mod commit;
pub mod message;
pub mod orchestrator;
pub mod remote;

pub use commit::{CommitKind, CommitPipeline, CommitPolicy, CommitRecord, CommitRunner, CommitStatus};
pub use message::ChangeSummary;
pub use orchestrator::{GitOrchestrator, GitOutcome};
pub use remote::{RemoteChange, RemoteSyncPoller};
