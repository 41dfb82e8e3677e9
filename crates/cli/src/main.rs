// watcher CLI entry point.

use clap::Parser;

mod commands;
mod exit_code;
mod output;

use exit_code::ExitCode;

#[derive(Parser)]
#[command(name = "watcher", version, about = "Debounced auto-commit for git working trees")]
struct Cli {
    #[command(subcommand)]
    command: commands::Command,
}

fn main() {
    let cli = Cli::parse();
    if let Err(error) = commands::run(cli.command) {
        ExitCode::from_error(&error).exit();
    }
}
