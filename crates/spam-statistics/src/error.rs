//! Error types for spam-statistics.
//!
//! This module defines all error types used throughout the spam-statistics crate,
//! providing detailed context for debugging and user-friendly error messages.

use std::path::PathBuf;
use thiserror::Error;

use crate::message::SPAMD_RESULT_HEADER;

/// The main error type for spam-statistics operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Message Errors ===
    /// A required header is absent, or its value couldn't be parsed.
    #[error("message is missing or has a malformed {header} header")]
    MissingOrMalformedHeader {
        /// Name of the offending header.
        header: &'static str,
    },

    /// The raw message couldn't be parsed at all.
    #[error("failed to parse message: {0}")]
    MessageParse(#[from] mailparse::MailParseError),

    /// A mailbox address couldn't be parsed.
    #[error("invalid address '{address}': {message}")]
    InvalidAddress {
        /// The address as given.
        address: String,
        /// Description of what went wrong.
        message: String,
    },

    // === Maildir Errors ===
    /// Failed to read a message file from a Maildir.
    #[error("failed to read message {path}: {source}")]
    MessageRead {
        /// Path to the message file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to list a directory.
    #[error("failed to read directory {path}: {source}")]
    DirectoryRead {
        /// Path to the directory.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Rspamd Errors ===
    /// The rspamd client exited unsuccessfully.
    #[error("'{command}' failed: {stderr}")]
    Subprocess {
        /// The command that was run.
        command: String,
        /// Whatever the command wrote to stderr.
        stderr: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Report Errors ===
    /// A chart was requested for a series with no data points.
    #[error("no data to plot for '{name}'")]
    EmptyChart {
        /// Name of the chart.
        name: String,
    },

    /// The plotting backend failed to draw a chart.
    #[error("failed to draw chart: {0}")]
    Chart(String),

    /// Failed to assemble the report message.
    #[error("failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Failed to deliver the report over SMTP.
    #[error("SMTP delivery failed: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for spam-statistics operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new chart drawing error.
    #[must_use]
    pub fn chart(message: impl std::fmt::Display) -> Self {
        Self::Chart(message.to_string())
    }

    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create an invalid address error.
    #[must_use]
    pub fn invalid_address(address: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidAddress {
            address: address.into(),
            message: message.into(),
        }
    }

    /// Create a missing header error.
    #[must_use]
    pub fn missing_header(header: &'static str) -> Self {
        Self::MissingOrMalformedHeader { header }
    }

    /// Check if this error means a message in the spam folder was never scored by rspamd,
    /// as opposed to being unreadable.
    #[must_use]
    pub fn is_unscored_message(&self) -> bool {
        matches!(
            self,
            Self::MissingOrMalformedHeader {
                header: SPAMD_RESULT_HEADER
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::missing_header("X-Spamd-Result");
        assert_eq!(
            err.to_string(),
            "message is missing or has a malformed X-Spamd-Result header"
        );

        let err = Error::chart("backend exploded");
        assert_eq!(err.to_string(), "failed to draw chart: backend exploded");
    }

    #[test]
    fn test_is_unscored_message() {
        assert!(Error::missing_header(SPAMD_RESULT_HEADER).is_unscored_message());
        assert!(!Error::missing_header("From").is_unscored_message());
        assert!(!Error::internal("test").is_unscored_message());
    }

    #[test]
    fn test_internal_error() {
        let err = Error::internal("something went wrong");
        assert_eq!(err.to_string(), "internal error: something went wrong");
    }

    #[test]
    fn test_invalid_address_display() {
        let err = Error::invalid_address("nobody", "missing domain");
        let msg = err.to_string();
        assert!(msg.contains("nobody"));
        assert!(msg.contains("missing domain"));
    }

    #[test]
    fn test_subprocess_error_display() {
        let err = Error::Subprocess {
            command: "rspamc stat".to_string(),
            stderr: "connection refused".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("rspamc stat"));
        assert!(msg.contains("connection refused"));
    }

    #[test]
    fn test_empty_chart_display() {
        let err = Error::EmptyChart {
            name: "Spam Received".to_string(),
        };
        assert!(err.to_string().contains("Spam Received"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_config_validation_error_display() {
        let err = Error::ConfigValidation {
            message: "bin_size must be positive".to_string(),
        };
        assert!(err.to_string().contains("bin_size"));
    }

    #[test]
    fn test_message_read_error_display() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = Error::MessageRead {
            path: PathBuf::from("/var/spool/vmail/example.com/user/.Spam/cur/1"),
            source: io_err,
        };
        assert!(err.to_string().contains(".Spam/cur/1"));
    }

    #[test]
    fn test_directory_create_error_display() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = Error::DirectoryCreate {
            path: PathBuf::from("/root/forbidden"),
            source: io_err,
        };
        assert!(err.to_string().contains("/root/forbidden"));
    }
}
