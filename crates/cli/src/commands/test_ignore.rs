// `watcher test-ignore`: show whether a path would be ignored, and why.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use serde::Serialize;
use watcher_common::config::{ConfigStore, DEFAULT_CONFIG_NAME};
use watcher_daemon::ignore::IgnoreMatcher;

use super::{config_store, load_existing, report};
use crate::output::OutputFormat;

#[derive(Debug, Args)]
pub struct TestIgnoreArgs {
    /// File to test; relative paths resolve against the current directory.
    #[arg(value_name = "PATH")]
    path: PathBuf,

    /// Config name.
    #[arg(value_name = "NAME", default_value = DEFAULT_CONFIG_NAME)]
    name: String,

    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TestIgnoreResult {
    pub path: PathBuf,
    pub config: String,
    pub ignored: bool,
    pub matched_by: Vec<String>,
}

pub fn run(args: TestIgnoreArgs) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    let result = std::env::current_dir()
        .context("failed to read current directory")
        .and_then(|cwd| {
            let store = config_store()?;
            test_ignore(&store, &args.name, &cwd.join(&args.path))
        });
    report(format, result, format_human)
}

fn test_ignore(store: &ConfigStore, name: &str, path: &Path) -> anyhow::Result<TestIgnoreResult> {
    let config = load_existing(store, name)?;
    let matcher = IgnoreMatcher::from_config(&config, Some(&store.global_ignore_path()));
    let verdict = matcher.test_pattern(path);
    Ok(TestIgnoreResult {
        path: path.to_path_buf(),
        config: name.to_string(),
        ignored: verdict.ignored,
        matched_by: verdict.matched_by,
    })
}

fn format_human(result: &TestIgnoreResult) -> String {
    let mut lines =
        vec![format!("File: {}", result.path.display()), format!("Config: {}", result.config)];
    if result.ignored {
        lines.push("Result: IGNORED".to_string());
        lines.push("Matched by:".to_string());
        lines.extend(result.matched_by.iter().map(|source| format!("  - {source}")));
    } else {
        lines.push("Result: NOT IGNORED".to_string());
    }
    lines.join("\n")
}
