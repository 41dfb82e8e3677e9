// `watcher init`: create a watcher config and the global ignore file.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use serde::Serialize;
use watcher_common::config::{ConfigOverrides, ConfigStore, CreateOutcome, DEFAULT_CONFIG_NAME};

use super::{config_store, report};
use crate::output::OutputFormat;

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Config name.
    #[arg(value_name = "NAME", default_value = DEFAULT_CONFIG_NAME)]
    name: String,

    /// Directory to watch.
    #[arg(short = 'w', long = "watch-dir", value_name = "DIR")]
    watch_dir: Option<PathBuf>,

    /// Git repository that receives commits.
    #[arg(short = 'r', long = "repo-dir", value_name = "DIR")]
    repo_dir: Option<PathBuf>,

    /// Seconds of quiet before committing.
    #[arg(short = 'd', long = "commit-delay", value_name = "SECS")]
    commit_delay: Option<i64>,

    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct InitResult {
    pub name: String,
    pub config_path: PathBuf,
    /// False when the config already existed and was left untouched.
    pub created: bool,
    pub global_ignore: PathBuf,
}

pub fn run(args: InitArgs) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    let result = config_store().and_then(|store| init(&store, &args));
    report(format, result, format_human)
}

fn init(store: &ConfigStore, args: &InitArgs) -> anyhow::Result<InitResult> {
    let global_ignore =
        store.ensure_global_ignore().context("failed to create global ignore file")?;
    let overrides = ConfigOverrides {
        watch_directory: args.watch_dir.clone(),
        repo_directory: args.repo_dir.clone(),
        commit_delay: args.commit_delay,
    };
    let outcome = store
        .create(&args.name, overrides)
        .with_context(|| format!("failed to create config '{}'", args.name))?;

    Ok(InitResult {
        name: args.name.clone(),
        config_path: outcome.path().to_path_buf(),
        created: matches!(outcome, CreateOutcome::Created(_)),
        global_ignore,
    })
}

fn format_human(result: &InitResult) -> String {
    let headline = if result.created {
        format!("Initialized watcher configuration: {}", result.name)
    } else {
        format!("Configuration '{}' already exists; left unchanged", result.name)
    };
    [
        headline,
        format!("  Config file:   {}", result.config_path.display()),
        format!("  Global ignore: {}", result.global_ignore.display()),
        String::new(),
        "Next steps:".to_string(),
        format!("  1. Check the config: watcher validate {}", result.name),
        format!("  2. Start watching:   watcher run {}", result.name),
    ]
    .join("\n")
}
