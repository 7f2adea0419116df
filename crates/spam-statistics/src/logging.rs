//! Tracing setup for the library and the `spam-stats` binary.
//!
//! Everything goes to stderr, leaving stdout to `--json` output.

use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Targets whose level follows `-q`/`-v`. Dependencies stay at their defaults.
const LOG_TARGETS: [&str; 2] = ["spam_statistics", "spam_stats"];

/// How much the command line asked to see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// `-q`: errors only.
    Quiet,
    /// Info and above.
    #[default]
    Normal,
    /// `-v`
    Verbose,
    /// `-vv`
    Trace,
}

impl Verbosity {
    /// The most detailed level shown.
    #[must_use]
    pub fn level(self) -> Level {
        match self {
            Self::Quiet => Level::ERROR,
            Self::Normal => Level::INFO,
            Self::Verbose => Level::DEBUG,
            Self::Trace => Level::TRACE,
        }
    }

    /// `EnvFilter` directives applying this level to our own targets.
    #[must_use]
    pub fn directives(self) -> String {
        let level = self.level().as_str().to_lowercase();
        LOG_TARGETS
            .iter()
            .map(|target| format!("{target}={level}"))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// `rust_log` wins when it parses; a bad value falls back to `verbosity`.
fn filter(verbosity: Verbosity, rust_log: Option<&str>) -> EnvFilter {
    rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(verbosity.directives()))
}

/// Install the global subscriber. Later calls are no-ops.
///
/// ```no_run
/// use spam_statistics::{init_logging, logging::Verbosity};
///
/// init_logging(Verbosity::Verbose);
/// ```
pub fn init_logging(verbosity: Verbosity) {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();

    let _ = tracing_subscriber::registry()
        .with(filter(verbosity, rust_log.as_deref()))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true),
        )
        .try_init();
}

/// Warnings only, captured per test.
#[cfg(test)]
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered(filter: &EnvFilter) -> String {
        filter.to_string().to_lowercase()
    }

    #[test]
    fn test_verbosity_level() {
        assert_eq!(Verbosity::default().level(), Level::INFO);
        assert_eq!(Verbosity::Quiet.level(), Level::ERROR);
        assert_eq!(Verbosity::Trace.level(), Level::TRACE);
    }

    #[test]
    fn test_verbosity_directives() {
        assert_eq!(
            Verbosity::Verbose.directives(),
            "spam_statistics=debug,spam_stats=debug"
        );
    }

    #[test]
    fn test_filter_follows_verbosity() {
        let filter = rendered(&filter(Verbosity::Quiet, None));
        assert!(filter.contains("spam_statistics=error"), "{filter}");
        assert!(filter.contains("spam_stats=error"), "{filter}");
    }

    #[test]
    fn test_filter_rust_log_overrides() {
        let filter = rendered(&filter(Verbosity::Quiet, Some("lettre=trace")));
        assert!(filter.contains("lettre=trace"), "{filter}");
        assert!(!filter.contains("spam_statistics"), "{filter}");
    }

    #[test]
    fn test_filter_bad_rust_log_falls_back() {
        let filter = rendered(&filter(Verbosity::Verbose, Some("spam_statistics=loud")));
        assert!(filter.contains("spam_statistics=debug"), "{filter}");
    }
}
