// `watcher run`: run a watcher in the foreground until Ctrl-C.

use anyhow::Context;
use clap::Args;
use tracing::info;
use tracing_subscriber::EnvFilter;
use watcher_common::config::DEFAULT_CONFIG_NAME;

use super::config_store;
use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Config name.
    #[arg(value_name = "NAME", default_value = DEFAULT_CONFIG_NAME)]
    name: String,
}

pub fn run(args: RunArgs) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = run_foreground(&args.name);
    if let Err(error) = &result {
        output::print_anyhow_error(OutputFormat::Human, error);
    }
    result
}

fn run_foreground(name: &str) -> anyhow::Result<()> {
    let store = config_store()?;
    info!(config = %name, dir = %store.dir().display(), "starting watcher in foreground");
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;
    runtime.block_on(watcher_daemon::runtime::run_with_store(&store, name))
}
