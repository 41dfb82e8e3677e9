use std::path::Path;
use std::sync::Arc;

use tracing::{error, trace, warn};

use crate::process::{CommandExecutor, ProcessCommandExecutor};

/// Outcome of one git invocation. A non-zero exit is data, not an error:
/// callers decide whether to abandon the surrounding operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitOutcome {
    pub success: bool,
    /// `None` when git could not be started or was killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl GitOutcome {
    /// Trimmed stdout when the command succeeded and printed something.
    pub fn value(&self) -> Option<&str> {
        let trimmed = self.stdout.trim();
        (self.success && !trimmed.is_empty()).then_some(trimmed)
    }
}

/// Runs git against a supplied working directory through a `CommandExecutor`.
#[derive(Clone)]
pub struct GitOrchestrator {
    executor: Arc<dyn CommandExecutor>,
}

impl Default for GitOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl GitOrchestrator {
    pub fn new() -> Self {
        Self { executor: Arc::new(ProcessCommandExecutor) }
    }

    pub fn with_executor(executor: Arc<dyn CommandExecutor>) -> Self {
        Self { executor }
    }

    pub fn status(&self, cwd: &Path) -> GitOutcome {
        self.run(cwd, &["status", "--porcelain"], "Get git status")
    }

    pub fn stage_all(&self, cwd: &Path) -> GitOutcome {
        self.run(cwd, &["add", "."], "Stage changes")
    }

    pub fn stage_path(&self, cwd: &Path, relative: &Path) -> GitOutcome {
        let relative = relative.to_string_lossy();
        self.run(cwd, &["add", relative.as_ref()], "Stage path")
    }

    /// `Some(true)` if the index differs from HEAD, `None` if git failed.
    pub fn has_staged_changes(&self, cwd: &Path) -> Option<bool> {
        let args = ["diff", "--cached", "--quiet"];
        let outcome = match self.invoke(cwd, &args) {
            Ok(outcome) => outcome,
            Err(spawn_error) => {
                report_spawn_failure(cwd, &args, &spawn_error);
                return None;
            }
        };
        match outcome.code {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => {
                report_failure(cwd, &args, "Check staged changes", &outcome);
                None
            }
        }
    }

    pub fn commit(&self, cwd: &Path, message: &str) -> GitOutcome {
        self.run(cwd, &["commit", "-m", message], "Commit changes")
    }

    pub fn push(&self, cwd: &Path) -> GitOutcome {
        self.run(cwd, &["push"], "Push changes")
    }

    pub fn fetch(&self, cwd: &Path) -> GitOutcome {
        self.run(cwd, &["fetch"], "Fetch")
    }

    /// Branch name, or `None` when detached or git failed.
    pub fn current_branch(&self, cwd: &Path) -> Option<String> {
        self.run(cwd, &["branch", "--show-current"], "Get current branch")
            .value()
            .map(str::to_string)
    }

    pub fn rev_parse(&self, cwd: &Path, rev: &str) -> Option<String> {
        self.run(cwd, &["rev-parse", rev], "Resolve revision").value().map(str::to_string)
    }

    pub fn rev_list_count(&self, cwd: &Path, range: &str) -> Option<u64> {
        self.run(cwd, &["rev-list", "--count", range], "Count commits")
            .value()
            .and_then(|count| count.parse().ok())
    }

    /// Submodule paths relative to `cwd`, as reported by `git submodule foreach`.
    pub fn list_submodules(&self, cwd: &Path) -> GitOutcome {
        self.run(cwd, &["submodule", "foreach", "--quiet", "echo $sm_path"], "Get submodules")
    }

    fn run(&self, cwd: &Path, args: &[&str], description: &str) -> GitOutcome {
        match self.invoke(cwd, args) {
            Ok(outcome) => {
                if !outcome.success {
                    report_failure(cwd, args, description, &outcome);
                }
                outcome
            }
            Err(spawn_error) => {
                report_spawn_failure(cwd, args, &spawn_error);
                GitOutcome {
                    success: false,
                    code: None,
                    stdout: String::new(),
                    stderr: spawn_error.to_string(),
                }
            }
        }
    }

    fn invoke(&self, cwd: &Path, args: &[&str]) -> Result<GitOutcome, std::io::Error> {
        let args: Vec<String> = args.iter().map(|arg| arg.to_string()).collect();
        trace!(cwd = %cwd.display(), ?args, "running git");
        let result = self.executor.execute("git", &args, cwd)?;
        Ok(GitOutcome {
            success: result.success,
            code: result.code,
            stdout: result.stdout,
            stderr: result.stderr,
        })
    }
}

fn report_failure(cwd: &Path, args: &[&str], description: &str, outcome: &GitOutcome) {
    warn!(
        command = %format!("git {}", args.join(" ")),
        cwd = %cwd.display(),
        code = ?outcome.code,
        stdout = %outcome.stdout.trim(),
        stderr = %outcome.stderr.trim(),
        "{description} failed"
    );
}

fn report_spawn_failure(cwd: &Path, args: &[&str], spawn_error: &std::io::Error) {
    error!(
        command = %format!("git {}", args.join(" ")),
        cwd = %cwd.display(),
        error = %spawn_error,
        "failed to run git"
    );
}
