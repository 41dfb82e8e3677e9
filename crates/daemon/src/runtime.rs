// Standalone runtime: load a named config and run its engine until Ctrl-C.

use anyhow::{Context, Result};
use tracing::info;
use watcher_common::config::ConfigStore;

use crate::engine::WatcherEngine;

/// Run the watcher for config `name` until the process receives Ctrl-C.
pub async fn run(name: &str) -> Result<()> {
    let store = ConfigStore::resolve().context("failed to locate config directory")?;
    run_with_store(&store, name).await
}

/// Like `run`, with configs read from `store`.
pub async fn run_with_store(store: &ConfigStore, name: &str) -> Result<()> {
    let config = store
        .load(name)
        .with_context(|| format!("failed to load config '{name}'"))?;
    let global_ignore =
        store.ensure_global_ignore().context("failed to prepare global ignore file")?;

    info!(
        config = %config.name,
        path = %store.config_path(name).display(),
        "loaded configuration"
    );

    let handle = WatcherEngine::new(config)
        .with_global_ignore(global_ignore)
        .start()
        .await
        .with_context(|| format!("failed to start watcher '{name}'"))?;

    tokio::signal::ctrl_c().await.context("failed to listen for Ctrl-C")?;
    handle.stop().await;
    info!("watcher stopped");
    Ok(())
}
