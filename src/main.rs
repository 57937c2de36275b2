//! Absence Tracker CLI entry point.

use anyhow::Result;
use clap::Parser;

use absence_tracker::cli::commands;
use absence_tracker::cli::{handle_error, load_config, Cli, Commands};
use absence_tracker::infrastructure::logging::LoggerImpl;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json_mode = cli.json;

    if let Err(err) = run(cli).await {
        handle_error(err, json_mode);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;
    let _logger = LoggerImpl::init(&config.logging)?;

    match cli.command {
        Commands::Serve(args) => commands::serve::execute(args, config).await,
        Commands::Fetch(args) => commands::fetch::execute(args, config, cli.json).await,
        Commands::Config => commands::config::execute(config, cli.json),
    }
}
