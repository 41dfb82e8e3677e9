// `watcher validate`: check a config against the filesystem.

use std::path::PathBuf;

use clap::Args;
use serde::Serialize;
use watcher_common::config::{ConfigStore, DEFAULT_CONFIG_NAME};

use super::{config_store, load_existing};
use crate::exit_code::InvalidConfig;
use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct ValidateArgs {
    /// Config name.
    #[arg(value_name = "NAME", default_value = DEFAULT_CONFIG_NAME)]
    name: String,

    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ValidateResult {
    pub name: String,
    pub path: PathBuf,
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

pub fn run(args: ValidateArgs) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    let result = match config_store().and_then(|store| validate(&store, &args.name)) {
        Ok(result) => result,
        Err(error) => {
            output::print_anyhow_error(format, &error);
            return Err(error);
        }
    };

    output::print_output(format, &result, format_human)?;
    if result.valid {
        Ok(())
    } else {
        Err(InvalidConfig { name: result.name, errors: result.errors }.into())
    }
}

fn validate(store: &ConfigStore, name: &str) -> anyhow::Result<ValidateResult> {
    let config = load_existing(store, name)?;
    let report = config.validate();
    Ok(ValidateResult {
        name: name.to_string(),
        path: store.config_path(name),
        valid: report.is_valid(),
        errors: report.errors,
        warnings: report.warnings,
    })
}

fn format_human(result: &ValidateResult) -> String {
    let mut lines = Vec::new();
    if result.valid {
        lines.push(format!("Config '{}' is valid ({})", result.name, result.path.display()));
    } else {
        lines.push(format!("Config '{}' is invalid:", result.name));
        lines.extend(result.errors.iter().map(|error| format!("  {error}")));
    }
    lines.extend(result.warnings.iter().map(|warning| format!("warning: {warning}")));
    lines.join("\n")
}
