// watcher-daemon library: the auto-commit engine behind `watcherd` and `watcher run`.

pub mod engine;
pub mod git;
pub mod ignore;
pub mod notification;
pub mod process;
pub mod runtime;
pub mod topology;
pub mod watcher;

pub use engine::{EngineHandle, WatcherEngine};
