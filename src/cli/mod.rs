//! Command-line interface
//!
//! clap command structures, config loading for commands, and error reporting.

pub mod commands;
pub mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::domain::models::Config;
use crate::infrastructure::config::ConfigLoader;

use commands::fetch::FetchArgs;
use commands::serve::ServeArgs;

#[derive(Parser, Debug)]
#[command(name = "absence-tracker")]
#[command(about = "Absence Tracker - cached student absence totals", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file, replacing the .absence-tracker/ project files
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve the cached absence totals over HTTP
    Serve(ServeArgs),

    /// Resolve absence totals once and print them
    Fetch(FetchArgs),

    /// Show the effective configuration (password redacted)
    Config,
}

/// Load configuration from `path` if given, else from the project hierarchy
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    }
}

/// Report a command failure and exit with status 1
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    if json_mode {
        let body = serde_json::json!({ "error": format!("{err:#}") });
        println!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("Error: {err:#}");
    }
    std::process::exit(1);
}
