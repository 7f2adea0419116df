//! `spam-stats` - CLI for spam-statistics
//!
//! This binary collects statistics from the spam folders on a mail server
//! and sends them out as a report.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::PathBuf;

use anyhow::Context;
use chrono::Local;
use clap::Parser;
use tracing::{info, warn};

use spam_statistics::cli::{
    Cli, Command, ConfigCommand, ReportCommand, RspamdCommand, StatsCommand,
};
use spam_statistics::report::{DirectorySink, SmtpSink};
use spam_statistics::{
    init_logging, load_reporting_window, load_rspamd_statistics, Config, LoadOutcome,
    MessageTemplate, Report, ReportSink, RspamdStats, Statistics,
};

/// Who gets the report when nobody else is named.
const DEFAULT_RECIPIENT: &str = "postmaster";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    let config_path = cli.config;
    let load_config = || Config::load_from(config_path.clone());

    match cli.command {
        Command::Report(cmd) => handle_report(&load_config()?, cmd).await,
        Command::Stats(cmd) => handle_stats(&load_config()?, cmd).await,
        Command::Rspamd(cmd) => handle_rspamd(&load_config()?, &cmd).await,
        Command::Config(cmd) => handle_config(config_path, cmd),
    }
}

/// Load spam for `user` (or everyone), limited to the configured window.
async fn load_emails(config: &Config, user: Option<String>) -> anyhow::Result<LoadOutcome> {
    let config = config.clone();
    let today = Local::now().date_naive();
    let outcome = tokio::task::spawn_blocking(move || {
        load_reporting_window(&config, user.as_deref(), today)
    })
    .await
    .context("maildir scan panicked")??;

    if outcome.emails.is_empty() {
        warn!("No spam found in the reporting window");
    }
    Ok(outcome)
}

fn report_template(config: &Config, cmd: &ReportCommand) -> anyhow::Result<MessageTemplate> {
    let user_domain = cmd
        .user
        .as_deref()
        .and_then(|address| address.split_once('@'))
        .map(|(_, domain)| domain);
    let domain = config
        .report
        .domain
        .as_deref()
        .or(user_domain)
        .context("no report domain: set report.domain or pass --user")?;

    let recipient = cmd
        .to
        .as_deref()
        .or(config.report.recipient.as_deref())
        .or(cmd.user.as_deref())
        .unwrap_or(DEFAULT_RECIPIENT);

    Ok(MessageTemplate::new(
        domain,
        recipient,
        &config.report.sender_local_part,
    )?)
}

async fn handle_report(config: &Config, cmd: ReportCommand) -> anyhow::Result<()> {
    let template = report_template(config, &cmd)?;
    let outcome = load_emails(config, cmd.user.clone()).await?;

    let rspamd = if config.rspamd.enabled && !cmd.no_rspamd {
        match load_rspamd_statistics(&config.rspamd.command).await {
            Ok(stats) => Some(stats),
            Err(e) => {
                warn!(error = %e, "Leaving rspamd counters out of the report");
                None
            }
        }
    } else {
        None
    };

    let report = Report::build(&outcome.emails, rspamd, &config.report);
    let message = report.to_message(template)?;

    let sink: Box<dyn ReportSink> = match cmd.output {
        Some(dir) => Box::new(DirectorySink::new(dir)),
        None => Box::new(SmtpSink::new(&config.smtp)),
    };
    info!(
        sink = sink.name(),
        charts = report.images.len(),
        "Delivering report"
    );
    sink.deliver(message, &report.images).await?;
    Ok(())
}

async fn handle_stats(config: &Config, cmd: StatsCommand) -> anyhow::Result<()> {
    let outcome = load_emails(config, cmd.user).await?;
    let statistics = Statistics::compute(&outcome.emails, config.report.bin_size)
        .limit_domains(cmd.top.unwrap_or(config.report.top_domains));

    if cmd.json {
        let output = serde_json::json!({
            "unscored": outcome.unscored,
            "skipped": outcome.skipped,
            "statistics": statistics,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let summary = &statistics.summary;
    println!("Spam Statistics");
    println!("---------------");
    println!("Messages:        {}", summary.total());
    println!("Caught:          {}", summary.classified);
    println!(
        "Missed:          {} ({:.1}%)",
        summary.missed,
        summary.miss_ratio() * 100.0
    );
    println!("Unscored:        {}", outcome.unscored);
    println!("Skipped:         {}", outcome.skipped);
    if let (Some((first, _)), Some((last, _))) = (
        statistics.daily_results.as_slice().first(),
        statistics.daily_results.as_slice().last(),
    ) {
        println!("Received:        {first} to {last}");
    }

    if !statistics.offending_domains.is_empty() {
        println!();
        println!("Misclassified Domains");
        for (domain, count) in &statistics.offending_domains {
            println!("  {count:>5}  {domain}");
        }
    }
    Ok(())
}

fn print_rspamd_stats(stats: &RspamdStats) {
    println!("Rspamd Statistics");
    println!("-----------------");
    if let Some(scanned) = stats.scanned {
        println!("Scanned:         {scanned}");
    }
    for (action, count) in &stats.actions {
        println!("  {action:<15}{count}");
    }
    if let Some(spam) = stats.spam {
        println!("Spam:            {spam}");
    }
    if let Some(ham) = stats.ham {
        println!("Ham:             {ham}");
    }
    if let Some(learned) = stats.learned {
        println!("Learned:         {learned}");
    }
}

async fn handle_rspamd(config: &Config, cmd: &RspamdCommand) -> anyhow::Result<()> {
    let stats = load_rspamd_statistics(&config.rspamd.command).await?;
    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else if stats.is_empty() {
        println!("rspamd reported no counters.");
    } else {
        print_rspamd_stats(&stats);
    }
    Ok(())
}

fn handle_validate(path: PathBuf) {
    println!("Validating configuration: {}", path.display());
    match Config::load_from(Some(path)) {
        Ok(_) => println!("Configuration is valid."),
        Err(e) => println!("Configuration error: {e}"),
    }
}

/// `config_path` is the `-c` file, if any. Only `show` needs a loadable
/// config; `validate` reports on a broken one instead of failing on it.
fn handle_config(config_path: Option<PathBuf>, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            let config = Config::load_from(config_path)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                let unset = || "(unset)".to_string();
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Mail]");
                println!(
                    "  Virtual mailbox base: {}",
                    config.mail.virtual_mailbox_base.display()
                );
                println!("  Spam folder:          {}", config.mail.spam_folder);
                println!();
                println!("[Report]");
                println!(
                    "  Domain:               {}",
                    config.report.domain.clone().unwrap_or_else(unset)
                );
                println!(
                    "  Recipient:            {}",
                    config.report.recipient.clone().unwrap_or_else(unset)
                );
                println!("  Sender:               {}", config.report.sender_local_part);
                println!("  Window (days):        {}", config.report.window_days);
                println!("  Bin size:             {}", config.report.bin_size);
                println!("  Top domains:          {}", config.report.top_domains);
                println!();
                println!("[SMTP]");
                println!("  Host:                 {}", config.smtp.host);
                println!("  Port:                 {}", config.smtp.port);
                println!();
                println!("[Rspamd]");
                println!("  Enabled:              {}", config.rspamd.enabled);
                println!("  Command:              {}", config.rspamd.command);
            }
        }
        ConfigCommand::Path => {
            let path = config_path.unwrap_or_else(Config::default_config_path);
            println!("{}", path.display());
        }
        ConfigCommand::Validate { file } => {
            handle_validate(
                file.or(config_path)
                    .unwrap_or_else(Config::default_config_path),
            );
        }
    }
    Ok(())
}
