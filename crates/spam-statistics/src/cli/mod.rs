//! Command-line interface for spam-statistics.
//!
//! This module provides the CLI structure for the `spam-stats` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{ConfigCommand, ReportCommand, RspamdCommand, StatsCommand};

/// spam-stats - Report on the spam your mail server catches and misses
///
/// Reads the spam folders of a virtual mailbox tree, summarizes the Rspamd
/// verdicts found there, and emails an HTML report with charts.
#[derive(Debug, Parser)]
#[command(name = "spam-stats")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Build the report and send it
    Report(ReportCommand),

    /// Print statistics without building a report
    Stats(StatsCommand),

    /// Print rspamd's server-wide counters
    Rspamd(RspamdCommand),

    /// View or check configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}
