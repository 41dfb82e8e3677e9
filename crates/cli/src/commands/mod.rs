// CLI subcommand dispatch.

use anyhow::{bail, Context};
use clap::Subcommand;
use serde::Serialize;
use watcher_common::config::{ConfigStore, WatcherConfig};

use crate::output::{self, OutputFormat};

pub mod init;
pub mod ls;
pub mod patterns;
pub mod run;
pub mod test_ignore;
pub mod validate;

#[derive(Subcommand)]
pub enum Command {
    /// Create a watcher config and the global ignore file
    Init(init::InitArgs),
    /// List watcher configs
    Ls(ls::LsArgs),
    /// Check a config against the filesystem
    Validate(validate::ValidateArgs),
    /// Run a watcher in the foreground until Ctrl-C
    Run(run::RunArgs),
    /// Show whether a path would be ignored, and by which rules
    TestIgnore(test_ignore::TestIgnoreArgs),
    /// List the ignore rules a watcher loads
    Patterns(patterns::PatternsArgs),
}

pub fn run(cmd: Command) -> anyhow::Result<()> {
    match cmd {
        Command::Init(args) => init::run(args),
        Command::Ls(args) => ls::run(args),
        Command::Validate(args) => validate::run(args),
        Command::Run(args) => run::run(args),
        Command::TestIgnore(args) => test_ignore::run(args),
        Command::Patterns(args) => patterns::run(args),
    }
}

fn config_store() -> anyhow::Result<ConfigStore> {
    ConfigStore::resolve().context("failed to locate config directory")
}

/// Load a config that must already exist on disk.
fn load_existing(store: &ConfigStore, name: &str) -> anyhow::Result<WatcherConfig> {
    if !store.exists(name) {
        bail!("config '{name}' does not exist. Run: watcher init {name}");
    }
    store.load(name).with_context(|| format!("failed to load config '{name}'"))
}

/// Print `result` on success or a mapped error on failure.
fn report<T, F>(format: OutputFormat, result: anyhow::Result<T>, human_fn: F) -> anyhow::Result<()>
where
    T: Serialize,
    F: FnOnce(&T) -> String,
{
    match result {
        Ok(value) => {
            output::print_output(format, &value, human_fn)?;
            Ok(())
        }
        Err(error) => {
            output::print_anyhow_error(format, &error);
            Err(error)
        }
    }
}
