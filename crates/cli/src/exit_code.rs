// Consistent exit codes for the watcher CLI.
//
//   0 = success
//   1 = general error
//   2 = usage/argument error
//   3 = configuration missing, unreadable or invalid

use std::process;

use watcher_common::config::ConfigError;

/// Named exit codes for the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    Error = 1,
    Usage = 2,
    Config = 3,
}

impl ExitCode {
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Map an anyhow error to an exit code by inspecting the error chain.
    pub fn from_error(err: &anyhow::Error) -> Self {
        for cause in err.chain() {
            if cause.downcast_ref::<InvalidConfig>().is_some()
                || cause.downcast_ref::<ConfigError>().is_some()
            {
                return Self::Config;
            }
        }

        // The engine reports validation failures as plain messages.
        if format!("{err:#}").contains("invalid configuration") {
            return Self::Config;
        }

        Self::Error
    }

    /// Exit the process with this code.
    pub fn exit(self) -> ! {
        process::exit(self.code())
    }
}

/// A config that failed validation, embeddable in an `anyhow::Error` chain.
#[derive(Debug)]
pub struct InvalidConfig {
    pub name: String,
    pub errors: Vec<String>,
}

impl std::fmt::Display for InvalidConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "configuration '{}' is invalid: {}", self.name, self.errors.join("; "))
    }
}

impl std::error::Error for InvalidConfig {}
