//! CLI command definitions.

use std::path::PathBuf;

use clap::{Args, Subcommand};

/// Report command arguments.
#[derive(Debug, Args)]
pub struct ReportCommand {
    /// Only report on this user's spam folder (user@domain)
    #[arg(short, long, value_name = "ADDR")]
    pub user: Option<String>,

    /// Send the report here instead of the configured recipient
    #[arg(short, long, value_name = "ADDR")]
    pub to: Option<String>,

    /// Write the report into this directory instead of sending it
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Leave rspamd's server-wide counters out of the report
    #[arg(long)]
    pub no_rspamd: bool,
}

/// Stats command arguments.
#[derive(Debug, Args)]
pub struct StatsCommand {
    /// Only count this user's spam folder (user@domain)
    #[arg(short, long, value_name = "ADDR")]
    pub user: Option<String>,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,

    /// Number of misclassified domains to list (defaults to the configured value)
    #[arg(short, long, value_name = "N")]
    pub top: Option<usize>,
}

/// Rspamd command arguments.
#[derive(Debug, Args)]
pub struct RspamdCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}
