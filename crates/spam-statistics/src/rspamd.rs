//! Server-wide counters from rspamd.
//!
//! `rspamc stat` prints a block of human-readable counters:
//!
//! ```text
//! Results for command: stat (0.002 seconds)
//! Messages scanned: 1532
//! Messages with action reject: 120, 7.83%
//! Messages with action add header: 65, 4.24%
//! Messages with action no action: 1347, 87.92%
//! Messages treated as spam: 185, 12.07%
//! Messages treated as ham: 1347, 87.92%
//! Messages learned: 9
//! ```

use std::process::Stdio;

use serde::Serialize;
use tokio::process::Command;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::plot::{Color, Slice};

/// Counters reported by `rspamc stat`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RspamdStats {
    /// Total messages scanned.
    pub scanned: Option<u64>,
    /// Messages per action, in the order rspamd reports them.
    pub actions: Vec<(String, u64)>,
    /// Messages rspamd treated as spam.
    pub spam: Option<u64>,
    /// Messages rspamd treated as ham.
    pub ham: Option<u64>,
    /// Messages learned by the classifier.
    pub learned: Option<u64>,
}

/// Leading count in `N` or `N, P%`.
fn parse_count(value: &str) -> Option<u64> {
    value.split(',').next()?.trim().parse().ok()
}

/// Colors for the slices of the action chart, from most to least severe.
fn action_color(action: &str) -> Color {
    match action {
        "reject" => Color::Red,
        "soft reject" => Color::Orange,
        "rewrite subject" => Color::Violet,
        "add header" => Color::Yellow,
        "greylist" => Color::Indigo,
        "no action" => Color::Green,
        _ => Color::Blue,
    }
}

impl RspamdStats {
    /// Parse the output of `rspamc stat`. Lines that aren't recognized are ignored.
    #[must_use]
    pub fn parse(output: &str) -> Self {
        let mut stats = Self::default();
        for line in output.lines() {
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim();

            if let Some(action) = key.strip_prefix("Messages with action ") {
                if let Some(count) = parse_count(value) {
                    stats.actions.push((action.to_string(), count));
                }
                continue;
            }

            match key {
                "Messages scanned" => stats.scanned = parse_count(value),
                "Messages treated as spam" => stats.spam = parse_count(value),
                "Messages treated as ham" => stats.ham = parse_count(value),
                "Messages learned" => stats.learned = parse_count(value),
                _ => trace!(line, "Ignoring rspamc line"),
            }
        }

        stats
    }

    /// Whether `rspamc` reported anything at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Share of messages per action, for charting. Actions that never fired are left out.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn action_slices(&self) -> Vec<Slice> {
        let total: u64 = self.actions.iter().map(|(_, count)| count).sum();
        if total == 0 {
            return Vec::new();
        }

        self.actions
            .iter()
            .filter(|(_, count)| *count > 0)
            .map(|(action, count)| Slice {
                label: action.clone(),
                color: action_color(action),
                ratio: *count as f64 / total as f64,
            })
            .collect()
    }
}

/// Load statistics from rspamd by running `<command> stat`.
///
/// # Errors
///
/// Returns an error if the command can't be spawned or exits unsuccessfully.
pub async fn load_rspamd_statistics(command: &str) -> Result<RspamdStats> {
    debug!(command, "Querying rspamd");
    let output = Command::new(command)
        .arg("stat")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        return Err(Error::Subprocess {
            command: format!("{command} stat"),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(RspamdStats::parse(&String::from_utf8_lossy(&output.stdout)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const STAT: &str = "Results for command: stat (0.002 seconds)
Messages scanned: 1532
Messages with action reject: 120, 7.83%
Messages with action soft reject: 0, 0.00%
Messages with action rewrite subject: 0, 0.00%
Messages with action add header: 65, 4.24%
Messages with action greylist: 0, 0.00%
Messages with action no action: 1347, 87.92%
Messages treated as spam: 185, 12.07%
Messages treated as ham: 1347, 87.92%
Messages learned: 9
Connections count: 1532
Control connections count: 48
Pools allocated: 3210
";

    #[test]
    fn test_parse_stat_output() {
        let stats = RspamdStats::parse(STAT);
        assert_eq!(stats.scanned, Some(1532));
        assert_eq!(stats.spam, Some(185));
        assert_eq!(stats.ham, Some(1347));
        assert_eq!(stats.learned, Some(9));
        assert_eq!(stats.actions.len(), 6);
        assert_eq!(stats.actions[0], ("reject".to_string(), 120));
        assert_eq!(stats.actions[5], ("no action".to_string(), 1347));
    }

    #[test]
    fn test_parse_empty_output() {
        let stats = RspamdStats::parse("");
        assert!(stats.is_empty());
        assert!(stats.action_slices().is_empty());
    }

    #[test]
    fn test_action_slices_drop_unused_actions() {
        let slices = RspamdStats::parse(STAT).action_slices();
        let labels = slices.iter().map(|s| s.label.as_str()).collect::<Vec<_>>();
        assert_eq!(labels, vec!["reject", "add header", "no action"]);

        let total: f64 = slices.iter().map(|s| s.ratio).sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert_eq!(slices[0].color, Color::Red);
    }

    #[tokio::test]
    async fn test_load_missing_command() {
        let result = load_rspamd_statistics("/nonexistent/rspamc").await;
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_load_failing_command() {
        // `false stat` exits 1 without output
        let result = load_rspamd_statistics("false").await;
        assert!(matches!(result, Err(Error::Subprocess { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_load_from_command_output() {
        // `echo stat` prints a line with no counters in it
        let stats = load_rspamd_statistics("echo").await.unwrap();
        assert!(stats.is_empty());
    }
}
