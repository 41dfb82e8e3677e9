// `watcher patterns`: list the ignore rules a watcher loads.

use std::path::PathBuf;

use clap::Args;
use serde::Serialize;
use watcher_common::config::{ConfigStore, DEFAULT_CONFIG_NAME};
use watcher_daemon::ignore::{IgnoreMatcher, PatternListing};

use super::{config_store, load_existing, report};
use crate::output::OutputFormat;

#[derive(Debug, Args)]
pub struct PatternsArgs {
    /// Config name.
    #[arg(value_name = "NAME", default_value = DEFAULT_CONFIG_NAME)]
    name: String,

    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PatternsResult {
    pub config: String,
    pub watch_directory: PathBuf,
    pub global_ignore: PathBuf,
    pub respect_gitignore: bool,
    #[serde(flatten)]
    pub listing: PatternListing,
}

pub fn run(args: PatternsArgs) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    let result = config_store().and_then(|store| patterns(&store, &args.name));
    report(format, result, format_human)
}

fn patterns(store: &ConfigStore, name: &str) -> anyhow::Result<PatternsResult> {
    let config = load_existing(store, name)?;
    let global_ignore = store.global_ignore_path();
    let matcher = IgnoreMatcher::from_config(&config, Some(&global_ignore));
    matcher.load_gitignore(matcher.watch_root());

    Ok(PatternsResult {
        config: name.to_string(),
        watch_directory: matcher.watch_root().to_path_buf(),
        global_ignore,
        respect_gitignore: config.respect_gitignore,
        listing: matcher.patterns(),
    })
}

fn format_human(result: &PatternsResult) -> String {
    let mut lines = vec![
        format!("Config: {}", result.config),
        format!("Watch directory: {}", result.watch_directory.display()),
    ];
    let mut section = |title: String, patterns: &[String]| {
        lines.push(String::new());
        lines.push(format!("{title} ({})", patterns.len()));
        lines.extend(patterns.iter().map(|pattern| format!("  {pattern}")));
    };

    section(format!("Global ({})", result.global_ignore.display()), &result.listing.global);
    section("Config".to_string(), &result.listing.config);
    section("Ignore files".to_string(), &result.listing.files);
    if result.respect_gitignore {
        for (dir, patterns) in &result.listing.gitignore {
            section(format!("Gitignore {}", dir.display()), patterns);
        }
    } else {
        section("Gitignore (disabled)".to_string(), &[]);
    }
    lines.join("\n")
}
