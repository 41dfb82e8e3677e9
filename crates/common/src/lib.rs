// watcher-common: shared types, path helpers and configuration for the watcher workspace

pub mod config;
pub mod path;
pub mod types;
