// watcherd: standalone entry point. Usage: `watcherd [NAME]`.

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;
use watcher_common::config::DEFAULT_CONFIG_NAME;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let name = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG_NAME.to_string());
    info!(config = %name, "starting watcher daemon");
    watcher_daemon::runtime::run(&name)
        .await
        .context("watcher daemon terminated unexpectedly")
}
