// `watcher ls`: list watcher configs.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use serde::Serialize;
use watcher_common::config::ConfigStore;

use super::{config_store, report};
use crate::output::OutputFormat;

#[derive(Debug, Args)]
pub struct LsArgs {
    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct LsResult {
    pub config_dir: PathBuf,
    pub configs: Vec<ConfigEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfigEntry {
    pub name: String,
    pub path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watch_directory: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo_directory: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit_delay: Option<i64>,
    /// Load failure, when the file could not be read or parsed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub fn run(args: LsArgs) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    let result = config_store().and_then(|store| list(&store));
    report(format, result, format_human)
}

fn list(store: &ConfigStore) -> anyhow::Result<LsResult> {
    let names = store.list_configs().context("failed to list configs")?;
    let configs = names
        .into_iter()
        .map(|name| {
            let path = store.config_path(&name);
            match store.load(&name) {
                Ok(config) => ConfigEntry {
                    name,
                    path,
                    watch_directory: Some(config.watch_directory),
                    repo_directory: Some(config.repo_directory),
                    commit_delay: Some(config.commit_delay),
                    error: None,
                },
                Err(error) => ConfigEntry {
                    name,
                    path,
                    watch_directory: None,
                    repo_directory: None,
                    commit_delay: None,
                    error: Some(error.to_string()),
                },
            }
        })
        .collect();
    Ok(LsResult { config_dir: store.dir().to_path_buf(), configs })
}

fn format_human(result: &LsResult) -> String {
    if result.configs.is_empty() {
        return "No configurations found.\nRun 'watcher init' to create your first configuration."
            .into();
    }

    let mut lines = vec![format!(
        "{} configuration(s) in {}",
        result.configs.len(),
        result.config_dir.display()
    )];
    for entry in &result.configs {
        lines.push(String::new());
        lines.push(format!("  {}", entry.name));
        if let Some(error) = &entry.error {
            lines.push(format!("    error: {error}"));
            continue;
        }
        if let Some(watch) = &entry.watch_directory {
            lines.push(format!("    Watch: {}", watch.display()));
        }
        if let Some(repo) = &entry.repo_directory {
            lines.push(format!("    Repo:  {}", repo.display()));
        }
        if let Some(delay) = entry.commit_delay {
            lines.push(format!("    Delay: {delay}s"));
        }
    }
    lines.join("\n")
}
