// External command runner shared by git orchestration and desktop notifications.

use std::path::Path;
use std::process::Command;

/// Exit status plus captured output of one external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandResult {
    /// Successful result with the given stdout; handy for scripted executors.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self { success: true, code: Some(0), stdout: stdout.into(), stderr: String::new() }
    }

    /// Failed result with the given exit code and stderr.
    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self { success: false, code: Some(code), stdout: String::new(), stderr: stderr.into() }
    }
}

/// Runs an argument vector in a working directory.
///
/// `Err` means the process could not be started at all; a non-zero exit is
/// an `Ok` result with `success == false`.
pub trait CommandExecutor: Send + Sync {
    fn execute(
        &self,
        program: &str,
        args: &[String],
        cwd: &Path,
    ) -> Result<CommandResult, std::io::Error>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessCommandExecutor;

impl CommandExecutor for ProcessCommandExecutor {
    fn execute(
        &self,
        program: &str,
        args: &[String],
        cwd: &Path,
    ) -> Result<CommandResult, std::io::Error> {
        let output = Command::new(program).args(args).current_dir(cwd).output()?;
        Ok(CommandResult {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted executor used by unit tests across the crate.

    use super::*;
    use std::collections::VecDeque;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Invocation {
        pub program: String,
        pub args: Vec<String>,
        pub cwd: PathBuf,
    }

    impl Invocation {
        pub fn argv(&self) -> Vec<&str> {
            self.args.iter().map(String::as_str).collect()
        }
    }

    type Rule = Box<dyn Fn(&Invocation) -> Option<Result<CommandResult, std::io::Error>> + Send>;

    /// Records every call. Responses come from matching rules first, then the
    /// FIFO queue, then default to an empty success.
    #[derive(Clone, Default)]
    pub struct MockExecutor {
        calls: Arc<Mutex<Vec<Invocation>>>,
        responses: Arc<Mutex<VecDeque<Result<CommandResult, std::io::Error>>>>,
        rules: Arc<Mutex<Vec<Rule>>>,
    }

    impl MockExecutor {
        pub fn new(responses: Vec<Result<CommandResult, std::io::Error>>) -> Self {
            Self {
                responses: Arc::new(Mutex::new(VecDeque::from(responses))),
                ..Self::default()
            }
        }

        /// Answer every call whose cwd and leading args match.
        pub fn respond(&self, cwd: impl Into<PathBuf>, args: &[&str], result: CommandResult) {
            let cwd = cwd.into();
            let prefix: Vec<String> = args.iter().map(|arg| arg.to_string()).collect();
            self.rules.lock().expect("mock rules lock poisoned").push(Box::new(
                move |invocation: &Invocation| {
                    (invocation.cwd == cwd && invocation.args.starts_with(&prefix))
                        .then(|| Ok(result.clone()))
                },
            ));
        }

        pub fn calls(&self) -> Vec<Invocation> {
            self.calls.lock().expect("mock calls lock poisoned").clone()
        }

        /// Calls whose args start with `args`.
        pub fn calls_matching(&self, args: &[&str]) -> Vec<Invocation> {
            self.calls()
                .into_iter()
                .filter(|call| {
                    call.args.len() >= args.len()
                        && call.args.iter().zip(args).all(|(have, want)| have == want)
                })
                .collect()
        }
    }

    impl CommandExecutor for MockExecutor {
        fn execute(
            &self,
            program: &str,
            args: &[String],
            cwd: &Path,
        ) -> Result<CommandResult, std::io::Error> {
            let invocation =
                Invocation { program: program.to_string(), args: args.to_vec(), cwd: cwd.into() };
            self.calls.lock().expect("mock calls lock poisoned").push(invocation.clone());

            let rules = self.rules.lock().expect("mock rules lock poisoned");
            for rule in rules.iter().rev() {
                if let Some(result) = rule(&invocation) {
                    return result;
                }
            }
            drop(rules);

            self.responses
                .lock()
                .expect("mock responses lock poisoned")
                .pop_front()
                .unwrap_or_else(|| Ok(CommandResult::ok("")))
        }
    }
}
