// Desktop notification sink.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};

use crate::process::{CommandExecutor, ProcessCommandExecutor};

const APP_NAME: &str = "Watcher";

/// Delivers a user-visible notification. Failures are reported to the caller,
/// which logs them and carries on.
pub trait Notifier: Send + Sync {
    fn notify(&self, title: &str, body: &str, timeout: Duration) -> anyhow::Result<()>;
}

/// `notify-send <title> <body> -t <ms> -a Watcher`.
#[derive(Clone)]
pub struct DesktopNotifier {
    executor: Arc<dyn CommandExecutor>,
}

impl Default for DesktopNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl DesktopNotifier {
    pub fn new() -> Self {
        Self { executor: Arc::new(ProcessCommandExecutor) }
    }

    pub fn with_executor(executor: Arc<dyn CommandExecutor>) -> Self {
        Self { executor }
    }
}

impl Notifier for DesktopNotifier {
    fn notify(&self, title: &str, body: &str, timeout: Duration) -> anyhow::Result<()> {
        let args = vec![
            title.to_string(),
            body.to_string(),
            "-t".to_string(),
            timeout.as_millis().to_string(),
            "-a".to_string(),
            APP_NAME.to_string(),
        ];
        let result = self
            .executor
            .execute("notify-send", &args, &std::env::temp_dir())
            .context("failed to run notify-send")?;
        if !result.success {
            bail!("notify-send exited with {:?}: {}", result.code, result.stderr.trim());
        }
        Ok(())
    }
}

/// Drops every notification. Used when the engine runs headless.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _title: &str, _body: &str, _timeout: Duration) -> anyhow::Result<()> {
        Ok(())
    }
}

/// A notification captured by `RecordingNotifier`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentNotification {
    pub title: String,
    pub body: String,
    pub timeout: Duration,
}

/// Keeps every notification in memory, for tests and diagnostics.
#[derive(Debug, Default, Clone)]
pub struct RecordingNotifier {
    sent: Arc<std::sync::Mutex<Vec<SentNotification>>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<SentNotification> {
        self.sent.lock().unwrap_or_else(std::sync::PoisonError::into_inner).clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, title: &str, body: &str, timeout: Duration) -> anyhow::Result<()> {
        self.sent.lock().unwrap_or_else(std::sync::PoisonError::into_inner).push(
            SentNotification { title: title.to_string(), body: body.to_string(), timeout },
        );
        Ok(())
    }
}
