use clap::Parser;
use std::path::PathBuf;

use crate::logging::LogLevel;

#[derive(Parser, Debug)]
#[command(name = "inspecta")]
#[command(
    author,
    version,
    about = "Admin console for a restaurant-inspection SQLite database"
)]
pub struct Cli {
    /// Path to the SQLite database
    #[arg(required = true, env = "INSPECTA_DB")]
    pub path: PathBuf,

    /// Dump a table to stdout instead of starting the TUI (needs --user)
    #[arg(short, long, requires = "user")]
    pub read: Option<String>,

    /// Account used for --read
    #[arg(short, long)]
    pub user: Option<String>,

    /// Password used for --read
    #[arg(long, env = "INSPECTA_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Output format for --read
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,

    /// Append logs to this file
    #[arg(long, env = "INSPECTA_LOG")]
    pub log_file: Option<PathBuf>,

    /// Minimum log level (RUST_LOG overrides)
    #[arg(long, default_value = "info")]
    pub log_level: LogLevel,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Csv,
    Json,
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
