//! Statistics over the contents of spam folders.
//!
//! Every message found in a spam folder becomes a [`SpamEmail`]. Messages
//! rspamd flagged as spam were filed there automatically; the rest were
//! missed by the filter and moved there by hand.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use serde::Serialize;
use tracing::warn;

macro_rules! impl_distribution {
    ($owner:ty, $datum:ty, $field:tt) => {
        impl<'a> IntoIterator for &'a $owner {
            type Item = &'a $datum;
            type IntoIter = std::slice::Iter<'a, $datum>;

            fn into_iter(self) -> Self::IntoIter {
                self.$field.iter()
            }
        }

        impl $owner {
            /// Number of data points.
            #[must_use]
            pub fn len(&self) -> usize {
                self.$field.len()
            }

            /// Whether there are no data points.
            #[must_use]
            pub fn is_empty(&self) -> bool {
                self.$field.is_empty()
            }

            /// The data points, in order.
            #[must_use]
            pub fn as_slice(&self) -> &[$datum] {
                &self.$field
            }
        }
    };
}

/// The score rspamd assigns to a message, summarizing how spam-like it is.
pub type SpamResult = f64;

/// The number of occurrences of an event.
pub type Occurrences = usize;

/// Spam results are sorted into integer-sized bins for calculating the distribution.
pub type SpamResultBin = i64;

/// Largest score magnitude taken at face value. Rspamd scores are sums of
/// symbol weights and stay in the tens, so anything past this is a forged or
/// corrupt header.
pub const MAX_SPAM_RESULT: SpamResult = 1e6;

/// Widest histogram bin. Together with [`MAX_SPAM_RESULT`] this keeps every
/// bin edge far from the `i64` bounds.
pub const MAX_BIN_SIZE: SpamResultBin = 1_000_000;

/// Whether a score can be binned and charted.
#[must_use]
pub fn is_plausible_score(score: SpamResult) -> bool {
    score.is_finite() && score.abs() <= MAX_SPAM_RESULT
}

/// A message found in a spam folder.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpamEmail {
    /// Day the message was delivered.
    pub received: NaiveDate,
    /// Score from the `X-Spamd-Result` header.
    pub spam_result: SpamResult,
    /// Whether rspamd flagged the message (`X-Spam: Yes`).
    pub is_spam: bool,
    /// Raw value of the `From` header.
    pub from: String,
}

impl AsRef<SpamEmail> for SpamEmail {
    fn as_ref(&self) -> &SpamEmail {
        self
    }
}

/// A series of data points that correlate a [`SpamResult`] assigned to an email with the date
/// that the email was received.
pub type SpamResults = Vec<SpamEmail>;

/// The distribution of the frequency of [`SpamResult`]s over a given bin size.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SpamResultsDistribution {
    bin_size: SpamResultBin,
    bins: Vec<(SpamResultBin, Occurrences)>,
}

impl_distribution!(SpamResultsDistribution, (SpamResultBin, Occurrences), bins);

impl SpamResultsDistribution {
    /// Sort every score into a bin `bin_size` wide. Bins are labeled by their lower bound.
    ///
    /// `bin_size` is clamped to `1..=MAX_BIN_SIZE`. Implausible scores are left out.
    #[must_use]
    pub fn new(emails: &[SpamEmail], bin_size: SpamResultBin) -> Self {
        let bin_size = bin_size.clamp(1, MAX_BIN_SIZE);
        let mut bins = BTreeMap::<SpamResultBin, Occurrences>::new();
        for email in emails
            .iter()
            .filter(|email| is_plausible_score(email.spam_result))
        {
            // Bounded by MAX_SPAM_RESULT, so the cast is exact
            #[allow(clippy::cast_possible_truncation)]
            let floor = email.spam_result.floor() as SpamResultBin;
            let Some(bin) = floor.div_euclid(bin_size).checked_mul(bin_size) else {
                continue;
            };
            *bins.entry(bin).or_default() += 1;
        }

        Self {
            bin_size,
            bins: bins.into_iter().collect(),
        }
    }

    /// Width of each bin.
    #[must_use]
    pub fn bin_size(&self) -> SpamResultBin {
        self.bin_size
    }
}

impl From<&[SpamEmail]> for SpamResultsDistribution {
    fn from(value: &[SpamEmail]) -> Self {
        Self::new(value, 1)
    }
}

/// Count messages matching `predicate` on every day between the first and last match.
fn daily_occurrences<P>(emails: &[SpamEmail], predicate: P) -> Vec<(NaiveDate, Occurrences)>
where
    P: Fn(&SpamEmail) -> bool,
{
    let mut counts = BTreeMap::<NaiveDate, Occurrences>::new();
    for email in emails.iter().filter(|email| predicate(email)) {
        *counts.entry(email.received).or_default() += 1;
    }

    let (Some(&earliest), Some(&latest)) = (counts.keys().next(), counts.keys().next_back())
    else {
        return Vec::new();
    };

    earliest
        .iter_days()
        .take_while(|day| *day <= latest)
        .map(|day| (day, counts.get(&day).copied().unwrap_or(0)))
        .collect()
}

/// The distribution of spam received per day.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SpamRateDistribution(Vec<(NaiveDate, Occurrences)>);

impl_distribution!(SpamRateDistribution, (NaiveDate, Occurrences), 0);

impl From<&[SpamEmail]> for SpamRateDistribution {
    fn from(value: &[SpamEmail]) -> Self {
        Self(daily_occurrences(value, |email| email.is_spam))
    }
}

/// The distribution of email erroneously classified as ham received per day.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MissRateDistribution(Vec<(NaiveDate, Occurrences)>);

impl_distribution!(MissRateDistribution, (NaiveDate, Occurrences), 0);

impl From<&[SpamEmail]> for MissRateDistribution {
    fn from(value: &[SpamEmail]) -> Self {
        Self(daily_occurrences(value, |email| !email.is_spam))
    }
}

/// Every score received on each day, ordered by day.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DailySpamResults(Vec<(NaiveDate, Vec<SpamResult>)>);

impl_distribution!(DailySpamResults, (NaiveDate, Vec<SpamResult>), 0);

impl From<&[SpamEmail]> for DailySpamResults {
    fn from(value: &[SpamEmail]) -> Self {
        let mut days = BTreeMap::<NaiveDate, Vec<SpamResult>>::new();
        for email in value {
            days.entry(email.received)
                .or_default()
                .push(email.spam_result);
        }

        Self(days.into_iter().collect())
    }
}

/// How many messages in the spam folder rspamd caught, and how many it missed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClassificationSummary {
    /// Messages rspamd flagged as spam.
    pub classified: Occurrences,
    /// Messages rspamd let through as ham.
    pub missed: Occurrences,
}

impl ClassificationSummary {
    /// Total number of messages.
    #[must_use]
    pub fn total(&self) -> Occurrences {
        self.classified + self.missed
    }

    /// Fraction of messages rspamd missed, or 0 if there are none.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn miss_ratio(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            total => self.missed as f64 / total as f64,
        }
    }
}

impl From<&[SpamEmail]> for ClassificationSummary {
    fn from(value: &[SpamEmail]) -> Self {
        let classified = value.iter().filter(|email| email.is_spam).count();
        Self {
            classified,
            missed: value.len() - classified,
        }
    }
}

/// Domain part of a `From` header value, lower-cased.
fn sender_domain(from: &str) -> Option<String> {
    let addresses = mailparse::addrparse(from).ok()?;
    let address = addresses.extract_single_info()?.addr;
    let (_, domain) = address.rsplit_once('@')?;
    if domain.is_empty() {
        None
    } else {
        Some(domain.to_ascii_lowercase())
    }
}

/// Return the domains that sent the most mail misclassified as ham, most frequent first.
///
/// Ties are broken alphabetically so the ordering is stable.
pub fn top_offending_domains<S, I>(iter: I) -> Vec<(String, Occurrences)>
where
    I: IntoIterator<Item = S>,
    S: AsRef<SpamEmail>,
{
    let mut counts = HashMap::<String, Occurrences>::new();
    let mut error_count = 0;
    for message in iter {
        let message = message.as_ref();
        if message.is_spam {
            continue;
        }

        match sender_domain(&message.from) {
            Some(domain) => *counts.entry(domain).or_default() += 1,
            None => error_count += 1,
        }
    }

    if error_count > 0 {
        warn!(
            error_count,
            "Some sender addresses failed to parse while determining the spammiest domains"
        );
    }

    let mut counts = counts.into_iter().collect::<Vec<_>>();
    counts.sort_by(|(one_domain, one), (two_domain, two)| {
        two.cmp(one).then_with(|| one_domain.cmp(two_domain))
    });
    counts
}

/// Keep only messages received on or after `since`.
#[must_use]
pub fn filter_since(results: SpamResults, since: NaiveDate) -> SpamResults {
    results
        .into_iter()
        .filter(|email| email.received >= since)
        .collect()
}

/// All statistics computed over one set of spam folders.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Statistics {
    /// Caught versus missed.
    pub summary: ClassificationSummary,
    /// Histogram of scores.
    pub results: SpamResultsDistribution,
    /// Caught spam per day.
    pub spam_rate: SpamRateDistribution,
    /// Missed spam per day.
    pub miss_rate: MissRateDistribution,
    /// Scores per day.
    pub daily_results: DailySpamResults,
    /// Domains whose mail was missed, most frequent first.
    pub offending_domains: Vec<(String, Occurrences)>,
}

impl Statistics {
    /// Compute everything at once.
    #[must_use]
    pub fn compute(emails: &[SpamEmail], bin_size: SpamResultBin) -> Self {
        Self {
            summary: ClassificationSummary::from(emails),
            results: SpamResultsDistribution::new(emails, bin_size),
            spam_rate: SpamRateDistribution::from(emails),
            miss_rate: MissRateDistribution::from(emails),
            daily_results: DailySpamResults::from(emails),
            offending_domains: top_offending_domains(emails),
        }
    }

    /// Keep only the `limit` most frequent offending domains.
    #[must_use]
    pub fn limit_domains(mut self, limit: usize) -> Self {
        self.offending_domains.truncate(limit);
        self
    }
}
