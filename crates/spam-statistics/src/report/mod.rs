//! Assembling the emailed report.
//!
//! A report is an HTML message with every chart embedded inline: the body is a
//! `multipart/related` whose first part is the HTML and whose remaining parts
//! are `image/svg+xml` attachments referenced from the HTML by `cid:` URL.

mod sink;

use std::fmt::Write as _;

use lettre::message::{header, Mailbox, MultiPart, SinglePart};
use lettre::Message;
use tracing::{debug, warn};

pub use sink::{DirectorySink, ReportSink, SmtpSink};

use crate::config::ReportConfig;
use crate::error::{Error, Result};
use crate::plot::{Color, Image, Quantity, Slice};
use crate::rspamd::RspamdStats;
use crate::statistics::{Occurrences, SpamEmail, Statistics};

const SUBJECT: &str = "Spam Statistics";

/// Escape text for inclusion in HTML element content.
fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn parse_mailbox(address: &str) -> Result<Mailbox> {
    address
        .parse()
        .map_err(|e: lettre::address::AddressError| Error::invalid_address(address, e.to_string()))
}

/// Sender and recipient of the report.
#[derive(Debug, Clone)]
pub struct MessageTemplate {
    /// Domain the report is about.
    pub domain: String,
    /// Who receives the report.
    pub recipient: Mailbox,
    /// Who the report is from.
    pub sender: Mailbox,
}

impl MessageTemplate {
    /// Create a template. A recipient without an `@` is taken to be a user of `domain`.
    ///
    /// # Errors
    ///
    /// Returns an error if either address is invalid.
    pub fn new(domain: &str, recipient: &str, sender_local_part: &str) -> Result<Self> {
        let recipient = if recipient.contains('@') {
            recipient.to_string()
        } else {
            format!("{recipient}@{domain}")
        };

        Ok(Self {
            recipient: parse_mailbox(&recipient)?,
            sender: parse_mailbox(&format!("{sender_local_part}@{domain}"))?,
            domain: domain.to_string(),
        })
    }

    /// Build the message: HTML sections first, then every image inline.
    ///
    /// # Errors
    ///
    /// Returns an error if the message can't be assembled.
    pub fn make_message<'a, I>(self, images: I, sections: &[String]) -> Result<Message>
    where
        I: IntoIterator<Item = &'a Image>,
    {
        let svg = header::ContentType::parse("image/svg+xml")
            .map_err(|e| Error::internal(e.to_string()))?;

        let mut html_image_content = String::new();
        let mut image_parts = Vec::new();
        for (i, image) in images.into_iter().enumerate() {
            let cid = format!("image{i}");
            let _ = writeln!(
                html_image_content,
                r#"<p><img src="cid:{cid}" alt="{}" /></p>"#,
                escape_html(&image.alt)
            );
            image_parts.push(
                SinglePart::builder()
                    .header(svg.clone())
                    .header(header::ContentDisposition::inline())
                    .header(header::ContentId::from(format!("<{cid}>")))
                    .body(image.svg.clone()),
            );
        }

        let html_body = format!(
            "<html>\n<body>\n<p>Here are the spam statistics for {}.</p>\n{}{}</body>\n</html>\n",
            escape_html(&self.domain),
            sections.concat(),
            html_image_content
        );

        let multipart = image_parts.into_iter().fold(
            MultiPart::related().singlepart(SinglePart::html(html_body)),
            MultiPart::singlepart,
        );

        Ok(Message::builder()
            .from(self.sender)
            .to(self.recipient)
            .subject(SUBJECT)
            .multipart(multipart)?)
    }
}

/// HTML list of the domains that have sent mail misclassified as ham.
#[must_use]
pub fn domain_report(domains: &[(String, Occurrences)], limit: usize) -> String {
    let mut html = String::from("<h3>Misclassified Domains</h3>\n");
    html.push_str("<p>Domains that have sent mail misclassified as ham.</p>\n");
    if domains.is_empty() || limit == 0 {
        html.push_str("<p>None.</p>\n");
        return html;
    }

    html.push_str("<ul style=\"list-style-type:none;\">\n");
    for (domain, count) in domains.iter().take(limit) {
        let _ = writeln!(html, "<li>{}: {count}</li>", escape_html(domain));
    }
    html.push_str("</ul>\n");
    html
}

/// HTML summary of what was found in the spam folders.
#[must_use]
pub fn summary_report(statistics: &Statistics) -> String {
    let summary = &statistics.summary;
    format!(
        "<h3>Summary</h3>\n<p>{} messages in spam folders: {} caught by the filter, \
         {} missed ({:.1}%).</p>\n",
        summary.total(),
        summary.classified,
        summary.missed,
        summary.miss_ratio() * 100.0
    )
}

/// HTML table of rspamd's server-wide counters.
#[must_use]
pub fn rspamd_report(stats: &RspamdStats) -> String {
    let mut html = String::from("<h3>Rspamd</h3>\n<table>\n");
    let mut row = |label: &str, value: u64| {
        let _ = writeln!(
            html,
            "<tr><td>{}</td><td>{value}</td></tr>",
            escape_html(label)
        );
    };

    if let Some(scanned) = stats.scanned {
        row("Messages scanned", scanned);
    }
    for (action, count) in &stats.actions {
        row(&format!("Action: {action}"), *count);
    }
    if let Some(spam) = stats.spam {
        row("Treated as spam", spam);
    }
    if let Some(ham) = stats.ham {
        row("Treated as ham", ham);
    }
    if let Some(learned) = stats.learned {
        row("Learned", learned);
    }

    html.push_str("</table>\n");
    html
}

/// Keep a chart if it rendered, log and drop it if it didn't.
fn keep_chart(images: &mut Vec<Image>, chart: Result<Image>) {
    match chart {
        Ok(image) => images.push(image),
        Err(Error::EmptyChart { name }) => debug!(chart = %name, "Nothing to plot"),
        Err(e) => warn!(error = %e, "Dropping chart"),
    }
}

/// Everything that goes into one report.
#[derive(Debug, Clone)]
pub struct Report {
    /// Statistics over the spam folders.
    pub statistics: Statistics,
    /// Server-wide rspamd counters, if they were collected.
    pub rspamd: Option<RspamdStats>,
    /// HTML sections, in order.
    pub sections: Vec<String>,
    /// Rendered charts, in order.
    pub images: Vec<Image>,
}

impl Report {
    /// Compute statistics and render every chart that has data.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn build(emails: &[SpamEmail], rspamd: Option<RspamdStats>, config: &ReportConfig) -> Self {
        let statistics = Statistics::compute(emails, config.bin_size);

        let mut sections = vec![summary_report(&statistics)];
        if let Some(stats) = rspamd.as_ref().filter(|stats| !stats.is_empty()) {
            sections.push(rspamd_report(stats));
        }
        sections.push(domain_report(
            &statistics.offending_domains,
            config.top_domains,
        ));

        let mut images = Vec::new();
        keep_chart(
            &mut images,
            Quantity::new("Spam Score Distribution", "Score", "Messages", &statistics.results)
                .make_histogram(),
        );
        keep_chart(
            &mut images,
            Quantity::new("Spam Caught", "Day", "Messages", statistics.spam_rate.as_slice())
                .make_linechart(),
        );
        keep_chart(
            &mut images,
            Quantity::new("Spam Missed", "Day", "Messages", statistics.miss_rate.as_slice())
                .make_linechart(),
        );
        keep_chart(
            &mut images,
            Quantity::new("Daily Spam Scores", "Day", "Score", &statistics.daily_results)
                .make_boxplot(),
        );

        let summary = statistics.summary;
        if summary.total() > 0 {
            let total = summary.total() as f64;
            let slices = [
                Slice {
                    label: "Caught".to_string(),
                    color: Color::Green,
                    ratio: summary.classified as f64 / total,
                },
                Slice {
                    label: "Missed".to_string(),
                    color: Color::Red,
                    ratio: summary.missed as f64 / total,
                },
            ];
            keep_chart(
                &mut images,
                Quantity::new("Classification", "", "", slices.as_slice()).make_pie(),
            );
        }

        if let Some(stats) = &rspamd {
            let slices = stats.action_slices();
            keep_chart(
                &mut images,
                Quantity::new("Rspamd Actions", "", "", slices.as_slice()).make_pie(),
            );
        }

        Self {
            statistics,
            rspamd,
            sections,
            images,
        }
    }

    /// Turn the report into a message.
    ///
    /// # Errors
    ///
    /// Returns an error if the message can't be assembled.
    pub fn to_message(&self, template: MessageTemplate) -> Result<Message> {
        template.make_message(&self.images, &self.sections)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn template() -> MessageTemplate {
        MessageTemplate::new("example.com", "postmaster", "spam-stats").unwrap()
    }

    fn email(d: u32, spam_result: f64, is_spam: bool, from: &str) -> SpamEmail {
        SpamEmail {
            received: NaiveDate::from_ymd_opt(2025, 1, d).unwrap(),
            spam_result,
            is_spam,
            from: from.to_string(),
        }
    }

    fn image(alt: &str) -> Image {
        Image {
            svg: format!("<svg xmlns=\"http://www.w3.org/2000/svg\"><title>{alt}</title></svg>"),
            alt: alt.to_string(),
        }
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & Jerry's</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; Jerry&#39;s&lt;/a&gt;"
        );
    }

    #[test]
    fn test_template_bare_recipient() {
        let template = template();
        assert_eq!(template.recipient.email.to_string(), "postmaster@example.com");
        assert_eq!(template.sender.email.to_string(), "spam-stats@example.com");
    }

    #[test]
    fn test_template_full_recipient() {
        let template = MessageTemplate::new("example.com", "admin@example.org", "stats").unwrap();
        assert_eq!(template.recipient.email.to_string(), "admin@example.org");
    }

    #[test]
    fn test_template_invalid_domain() {
        let err = MessageTemplate::new("not a domain", "postmaster", "spam-stats").unwrap_err();
        assert!(matches!(err, Error::InvalidAddress { .. }));
    }

    #[test]
    fn test_make_message_embeds_images() {
        let images = vec![image("First"), image("Second")];
        let message = template()
            .make_message(&images, &["<h3>Section</h3>\n".to_string()])
            .unwrap();
        let formatted = String::from_utf8(message.formatted()).unwrap();

        assert!(formatted.contains("Subject: Spam Statistics"));
        assert!(formatted.contains("multipart/related"));
        assert!(formatted.contains("Content-ID: <image0>"));
        assert!(formatted.contains("Content-ID: <image1>"));
        assert!(formatted.contains("image/svg+xml"));
        assert!(formatted.contains("cid:image1"));
        assert!(formatted.contains("<h3>Section</h3>"));
    }

    #[test]
    fn test_make_message_without_images() {
        let message = template()
            .make_message(&Vec::<Image>::new(), &[])
            .unwrap();
        let formatted = String::from_utf8(message.formatted()).unwrap();
        assert!(formatted.contains("spam statistics for example.com"));
        assert!(!formatted.contains("Content-ID"));
    }

    #[test]
    fn test_domain_report() {
        let domains = vec![
            ("promo.example".to_string(), 3),
            ("<evil>.example".to_string(), 2),
            ("other.example".to_string(), 1),
        ];
        let html = domain_report(&domains, 2);
        assert!(html.contains("<li>promo.example: 3</li>"));
        assert!(html.contains("&lt;evil&gt;.example: 2"));
        assert!(!html.contains("other.example"));
    }

    #[test]
    fn test_domain_report_empty() {
        let html = domain_report(&[], 10);
        assert!(html.contains("None."));
    }

    #[test]
    fn test_rspamd_report() {
        let stats = RspamdStats {
            scanned: Some(10),
            actions: vec![("reject".to_string(), 2)],
            spam: Some(2),
            ham: Some(8),
            learned: None,
        };
        let html = rspamd_report(&stats);
        assert!(html.contains("<td>Messages scanned</td><td>10</td>"));
        assert!(html.contains("<td>Action: reject</td><td>2</td>"));
        assert!(!html.contains("Learned"));
    }

    #[test]
    fn test_build_report() {
        let emails = vec![
            email(1, 16.0, true, "bulk@spam.example"),
            email(2, 19.0, true, "bulk@spam.example"),
            email(2, 3.0, false, "offers@promo.example"),
        ];
        let report = Report::build(&emails, None, &ReportConfig::default());

        assert_eq!(report.statistics.summary.total(), 3);
        assert_eq!(report.sections.len(), 2);
        let alts = report.images.iter().map(|i| i.alt.as_str()).collect::<Vec<_>>();
        assert_eq!(
            alts,
            vec![
                "Spam Score Distribution",
                "Spam Caught",
                "Spam Missed",
                "Daily Spam Scores",
                "Classification",
            ]
        );
    }

    #[test]
    fn test_build_report_with_rspamd() {
        let emails = vec![email(1, 16.0, true, "bulk@spam.example")];
        let stats = RspamdStats {
            scanned: Some(10),
            actions: vec![("reject".to_string(), 2), ("no action".to_string(), 8)],
            ..RspamdStats::default()
        };
        let report = Report::build(&emails, Some(stats), &ReportConfig::default());

        assert_eq!(report.sections.len(), 3);
        assert!(report.images.iter().any(|i| i.alt == "Rspamd Actions"));
        // Nothing was missed, so there's no miss-rate chart
        assert!(!report.images.iter().any(|i| i.alt == "Spam Missed"));
    }

    #[test]
    fn test_build_report_with_forged_score() {
        let raw = "X-Spamd-Result: default: True [99999999999999999999999 / 15.00]\n\
X-Spam: Yes\n\
From: bulk@spam.example\n\
\n\
body\n";
        let forged = crate::message::parse_spam_email(
            raw.as_bytes(),
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        )
        .unwrap();
        let emails = vec![forged, email(2, 16.0, true, "bulk@spam.example")];

        let report = Report::build(&emails, None, &ReportConfig::default());
        assert_eq!(report.statistics.summary.total(), 2);
        assert_eq!(report.statistics.results.as_slice(), &[(16, 1)]);
        assert!(report
            .images
            .iter()
            .any(|i| i.alt == "Spam Score Distribution"));
    }

    #[test]
    fn test_build_empty_report() {
        let report = Report::build(&[], None, &ReportConfig::default());
        assert!(report.images.is_empty());
        let message = report.to_message(template()).unwrap();
        assert!(!message.formatted().is_empty());
    }
}
