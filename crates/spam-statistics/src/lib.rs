//! `spam-statistics` - Spam reports for Rspamd-filtered virtual mailboxes
//!
//! This library reads the spam folders of a Maildir++ virtual mailbox tree,
//! computes statistics over the Rspamd verdicts it finds there, and renders
//! them into an HTML email report with inline SVG charts.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod maildir;
pub mod message;
pub mod plot;
pub mod report;
pub mod rspamd;
pub mod statistics;

pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use maildir::{load_configured_spam, load_reporting_window, LoadOutcome};
pub use report::{MessageTemplate, Report, ReportSink};
pub use rspamd::{load_rspamd_statistics, RspamdStats};
pub use statistics::{SpamEmail, Statistics};
