//! Where finished reports go.

use std::path::PathBuf;

use async_trait::async_trait;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{debug, info};

use crate::config::SmtpConfig;
use crate::error::{Error, Result};
use crate::plot::Image;

/// File name of the message written by [`DirectorySink`].
pub const MESSAGE_FILE_NAME: &str = "report.eml";

/// A destination for a finished report.
#[async_trait]
pub trait ReportSink: Send + Sync {
    /// The name of this sink (for logging/debugging).
    fn name(&self) -> &'static str;

    /// Hand the report over.
    ///
    /// `images` are the charts already embedded in `message`, for sinks that
    /// can also store them separately.
    ///
    /// # Errors
    ///
    /// Returns an error if the report couldn't be delivered.
    async fn deliver(&self, message: Message, images: &[Image]) -> Result<()>;
}

/// Deliver reports to an SMTP relay, unencrypted. Meant for the local MTA.
pub struct SmtpSink {
    host: String,
    port: u16,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl std::fmt::Debug for SmtpSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpSink")
            .field("host", &self.host)
            .field("port", &self.port)
            .finish_non_exhaustive()
    }
}

impl SmtpSink {
    /// Create a sink for the relay named in `config`.
    #[must_use]
    pub fn new(config: &SmtpConfig) -> Self {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
            .port(config.port)
            .build();

        Self {
            host: config.host.clone(),
            port: config.port,
            transport,
        }
    }
}

#[async_trait]
impl ReportSink for SmtpSink {
    fn name(&self) -> &'static str {
        "smtp"
    }

    async fn deliver(&self, message: Message, _images: &[Image]) -> Result<()> {
        debug!(host = %self.host, port = self.port, "Sending report");
        let response = self.transport.send(message).await?;
        info!(
            host = %self.host,
            code = %response.code(),
            "Report sent"
        );
        Ok(())
    }
}

/// Write reports to a directory: the message as `report.eml`, plus each chart as an SVG file.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    /// Create a sink writing into `dir`, which is created on delivery if needed.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl ReportSink for DirectorySink {
    fn name(&self) -> &'static str {
        "directory"
    }

    async fn deliver(&self, message: Message, images: &[Image]) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| Error::DirectoryCreate {
                path: self.dir.clone(),
                source,
            })?;

        tokio::fs::write(self.dir.join(MESSAGE_FILE_NAME), message.formatted()).await?;
        for (i, image) in images.iter().enumerate() {
            tokio::fs::write(self.dir.join(format!("chart{i}.svg")), &image.svg).await?;
        }

        info!(dir = %self.dir.display(), charts = images.len(), "Report written");
        Ok(())
    }
}
