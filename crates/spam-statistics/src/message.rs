//! Extract the rspamd verdict from a stored message.

use std::sync::LazyLock;

use chrono::NaiveDate;
use mailparse::MailHeaderMap;
use regex::Regex;

use crate::error::{Error, Result};
use crate::statistics::{SpamEmail, SpamResult};

/// Header carrying the rspamd score, e.g. `default: True [15.21 / 15.00]; ...`.
pub const SPAMD_RESULT_HEADER: &str = "X-Spamd-Result";

/// Header carrying the rspamd verdict, `Yes` for spam.
pub const SPAM_FLAG_HEADER: &str = "X-Spam";

/// The score opens the first bracket; the second number is the threshold.
/// Later brackets belong to symbols and are never read.
static SPAMD_RESULT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\[]*\[\s*(-?[0-9]+(?:\.[0-9]*)?|-?\.[0-9]+)")
        .expect("score pattern is valid")
});

/// Parse the score out of an `X-Spamd-Result` header value.
///
/// # Errors
///
/// Returns [`Error::MissingOrMalformedHeader`] if no score can be found.
pub fn parse_spamd_result(value: &str) -> Result<SpamResult> {
    SPAMD_RESULT_REGEX
        .captures(value)
        .and_then(|captures| captures.get(1))
        .and_then(|score| score.as_str().parse::<SpamResult>().ok())
        .ok_or(Error::missing_header(SPAMD_RESULT_HEADER))
}

/// Build a [`SpamEmail`] from a raw RFC 5322 message.
///
/// Only the header block is parsed; the body is never looked at.
///
/// # Errors
///
/// Returns an error if the header block is unparsable, or if the score or
/// `From` header is missing.
pub fn parse_spam_email(raw: &[u8], received: NaiveDate) -> Result<SpamEmail> {
    let (headers, _) = mailparse::parse_headers(raw)?;

    let spam_result = headers
        .get_first_value(SPAMD_RESULT_HEADER)
        .ok_or(Error::missing_header(SPAMD_RESULT_HEADER))
        .and_then(|value| parse_spamd_result(&value))?;

    let is_spam = headers
        .get_first_value(SPAM_FLAG_HEADER)
        .is_some_and(|value| value.trim().eq_ignore_ascii_case("yes"));

    let from = headers
        .get_first_value("From")
        .ok_or(Error::missing_header("From"))?;

    Ok(SpamEmail {
        received,
        spam_result,
        is_spam,
        from,
    })
}
