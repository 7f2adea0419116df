//! Configuration management for spam-statistics.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;

use chrono::{Days, NaiveDate};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::statistics::MAX_BIN_SIZE;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default configuration directory name.
const CONFIG_DIR_NAME: &str = "spam-statistics";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `SPAM_STATISTICS_`, sections split on `__`)
/// 2. TOML config file at `~/.config/spam-statistics/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Mail store configuration.
    pub mail: MailConfig,
    /// Report configuration.
    pub report: ReportConfig,
    /// SMTP delivery configuration.
    pub smtp: SmtpConfig,
    /// Rspamd client configuration.
    pub rspamd: RspamdConfig,
}

/// Where the mail lives on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    /// Root of the virtual mailbox tree, laid out as `<domain>/<user>/`.
    pub virtual_mailbox_base: PathBuf,
    /// Name of the Maildir++ folder that holds spam.
    pub spam_folder: String,
}

/// What goes into the report, and who gets it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Mail domain the report is about. Also the sender's domain.
    pub domain: Option<String>,
    /// Recipient, either a bare user name (the domain is appended) or a full address.
    pub recipient: Option<String>,
    /// Local part of the sender address.
    pub sender_local_part: String,
    /// Only messages received in the last N days are counted.
    /// Set to 0 for unlimited.
    pub window_days: u32,
    /// Width of the bins in the spam score histogram.
    pub bin_size: i64,
    /// Number of misclassified domains to list.
    pub top_domains: usize,
}

/// SMTP delivery configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtpConfig {
    /// SMTP relay host.
    pub host: String,
    /// SMTP relay port.
    pub port: u16,
}

/// Rspamd client configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RspamdConfig {
    /// Whether server-wide rspamd counters are included in the report.
    pub enabled: bool,
    /// The rspamd client binary.
    pub command: String,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            virtual_mailbox_base: PathBuf::from("/var/spool/vmail"),
            spam_folder: ".Spam".to_string(),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            domain: None,
            recipient: None,
            sender_local_part: "spam-stats".to_string(),
            window_days: 30,
            bin_size: 1,
            top_domains: 10,
        }
    }
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 25,
        }
    }
}

impl Default for RspamdConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: "rspamc".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("SPAM_STATISTICS_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        let spam_folder = &self.mail.spam_folder;
        if spam_folder.is_empty() || spam_folder.contains('/') {
            return Err(Error::ConfigValidation {
                message: format!("spam_folder must be a single folder name, got '{spam_folder}'"),
            });
        }

        if !(1..=MAX_BIN_SIZE).contains(&self.report.bin_size) {
            return Err(Error::ConfigValidation {
                message: format!(
                    "bin_size must be between 1 and {MAX_BIN_SIZE}, got {}",
                    self.report.bin_size
                ),
            });
        }

        if self.report.sender_local_part.is_empty() {
            return Err(Error::ConfigValidation {
                message: "sender_local_part cannot be empty".to_string(),
            });
        }

        if self.smtp.port == 0 {
            return Err(Error::ConfigValidation {
                message: "smtp port must be greater than 0".to_string(),
            });
        }

        if self.rspamd.enabled && self.rspamd.command.trim().is_empty() {
            return Err(Error::ConfigValidation {
                message: "rspamd command cannot be empty".to_string(),
            });
        }

        Ok(())
    }

    /// Earliest day counted by the report, relative to `today`.
    #[must_use]
    pub fn window_start(&self, today: NaiveDate) -> Option<NaiveDate> {
        if self.report.window_days == 0 {
            None
        } else {
            today.checked_sub_days(Days::new(u64::from(self.report.window_days)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(
            config.mail.virtual_mailbox_base,
            PathBuf::from("/var/spool/vmail")
        );
        assert_eq!(config.mail.spam_folder, ".Spam");
        assert!(config.rspamd.enabled);
    }

    #[test]
    fn test_default_report_config() {
        let report = ReportConfig::default();

        assert!(report.domain.is_none());
        assert!(report.recipient.is_none());
        assert_eq!(report.sender_local_part, "spam-stats");
        assert_eq!(report.window_days, 30);
        assert_eq!(report.bin_size, 1);
        assert_eq!(report.top_domains, 10);
    }

    #[test]
    fn test_default_smtp_config() {
        let smtp = SmtpConfig::default();
        assert_eq!(smtp.host, "localhost");
        assert_eq!(smtp.port, 25);
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_nested_spam_folder() {
        let mut config = Config::default();
        config.mail.spam_folder = ".Junk/Sub".to_string();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("spam_folder"));
    }

    #[test]
    fn test_validate_zero_bin_size() {
        let mut config = Config::default();
        config.report.bin_size = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("bin_size"));

        config.report.bin_size = MAX_BIN_SIZE + 1;
        assert!(config.validate().is_err());
        config.report.bin_size = MAX_BIN_SIZE;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_port() {
        let mut config = Config::default();
        config.smtp.port = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("port"));
    }

    #[test]
    fn test_validate_empty_rspamd_command() {
        let mut config = Config::default();
        config.rspamd.command = "  ".to_string();
        assert!(config.validate().is_err());

        // An empty command is fine when rspamd is switched off
        config.rspamd.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_window_start() {
        let config = Config::default();
        let today = NaiveDate::from_ymd_opt(2025, 3, 31).unwrap();
        assert_eq!(
            config.window_start(today),
            NaiveDate::from_ymd_opt(2025, 3, 1)
        );
    }

    #[test]
    fn test_window_start_unlimited() {
        let mut config = Config::default();
        config.report.window_days = 0;
        let today = NaiveDate::from_ymd_opt(2025, 3, 31).unwrap();
        assert!(config.window_start(today).is_none());
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("spam-statistics"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_load_nonexistent_config() {
        let result = Config::load_from(Some(PathBuf::from("/nonexistent/config.toml")));
        assert!(result.is_ok());
        assert_eq!(result.unwrap(), Config::default());
    }

    #[test]
    fn test_load_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[mail]
virtual_mailbox_base = "/srv/mail"

[report]
domain = "example.com"
recipient = "postmaster"
bin_size = 5

[smtp]
port = 2525
"#,
        )
        .unwrap();

        let config = Config::load_from(Some(path)).unwrap();
        assert_eq!(config.mail.virtual_mailbox_base, PathBuf::from("/srv/mail"));
        assert_eq!(config.mail.spam_folder, ".Spam");
        assert_eq!(config.report.domain.as_deref(), Some("example.com"));
        assert_eq!(config.report.recipient.as_deref(), Some("postmaster"));
        assert_eq!(config.report.bin_size, 5);
        assert_eq!(config.smtp.port, 2525);
        assert_eq!(config.smtp.host, "localhost");
    }

    #[test]
    fn test_load_invalid_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[report]\nbin_size = -3\n").unwrap();

        let err = Config::load_from(Some(path)).unwrap_err();
        assert!(matches!(err, Error::ConfigValidation { .. }));
    }

    #[test]
    fn test_report_config_deserialize() {
        let json = r#"{"domain": "example.org", "top_domains": 3}"#;
        let report: ReportConfig = serde_json::from_str(json).unwrap();
        assert_eq!(report.domain.as_deref(), Some("example.org"));
        assert_eq!(report.top_domains, 3);
        assert_eq!(report.bin_size, 1);
    }

    #[test]
    fn test_config_serialize() {
        let json = serde_json::to_string(&Config::default()).unwrap();
        assert!(json.contains("virtual_mailbox_base"));
        assert!(json.contains("sender_local_part"));
    }
}
