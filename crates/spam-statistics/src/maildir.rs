//! Reading spam out of Maildir++ trees.
//!
//! A virtual mailbox base is laid out as `<base>/<domain>/<user>/`, where each
//! user directory is a Maildir (see maildir(5)). Subfolders are dot-prefixed
//! directories such as `.Spam`, each with its own `cur/` and `new/`.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDate};
use tracing::{debug, info, warn};

use crate::config::{Config, MailConfig};
use crate::error::{Error, Result};
use crate::message::parse_spam_email;
use crate::statistics::{filter_since, SpamEmail, SpamResults};

/// Maildir subdirectories that hold delivered messages. `tmp/` is skipped.
const MESSAGE_DIRS: [&str; 2] = ["cur", "new"];

/// The messages loaded from a set of spam folders.
#[derive(Debug, Default)]
pub struct LoadOutcome {
    /// Messages that carried an rspamd verdict.
    pub emails: SpamResults,
    /// Messages rspamd never scored, e.g. filed into the spam folder by hand
    /// from another account.
    pub unscored: usize,
    /// Messages that couldn't be read or parsed.
    pub skipped: usize,
}

fn read_dir(path: &Path) -> Result<fs::ReadDir> {
    path.read_dir().map_err(|source| Error::DirectoryRead {
        path: path.to_path_buf(),
        source,
    })
}

/// List every message file in a user's spam folder.
///
/// Missing `cur/` or `new/` directories are not an error: a folder that never
/// received mail may not have them yet.
///
/// # Errors
///
/// Returns an error if an existing message directory can't be listed.
pub fn list_user_spam(user_dir: impl AsRef<Path>, spam_folder: &str) -> Result<Vec<PathBuf>> {
    let spam_dir = user_dir.as_ref().join(spam_folder);
    let mut spam = Vec::new();

    for subdir in MESSAGE_DIRS {
        let dir = spam_dir.join(subdir);
        if !dir.is_dir() {
            continue;
        }

        let mut emails = read_dir(&dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .collect::<Vec<_>>();
        spam.append(&mut emails);
    }

    debug!(
        folder = %spam_dir.display(),
        count = spam.len(),
        "Listed spam folder"
    );
    Ok(spam)
}

/// List the spam of every user of every domain under a virtual mailbox base.
///
/// # Errors
///
/// Returns an error if the base directory itself can't be listed.
pub fn list_virtual_mailbox_spam(
    base: impl AsRef<Path>,
    spam_folder: &str,
) -> Result<Vec<PathBuf>> {
    let mut spam = Vec::new();
    for domain in read_dir(base.as_ref())?.filter_map(|entry| entry.ok()) {
        let domain = domain.path();
        if !domain.is_dir() {
            continue;
        }

        let users = match read_dir(&domain) {
            Ok(users) => users,
            Err(e) => {
                warn!(error = %e, "Skipping unreadable domain");
                continue;
            }
        };

        for user in users.filter_map(|entry| entry.ok()) {
            let user = user.path();
            if !user.is_dir() {
                continue;
            }

            match list_user_spam(&user, spam_folder) {
                Ok(mut emails) => spam.append(&mut emails),
                Err(e) => warn!(error = %e, "Skipping unreadable mailbox"),
            }
        }
    }

    Ok(spam)
}

/// Resolve `user@domain` to the user's Maildir under a virtual mailbox base.
///
/// # Errors
///
/// Returns [`Error::InvalidAddress`] unless the address has exactly one `@`
/// separating a non-empty user and domain that are plain path components.
pub fn user_maildir(base: impl AsRef<Path>, address: &str) -> Result<PathBuf> {
    let (user, domain) = address
        .split_once('@')
        .ok_or_else(|| Error::invalid_address(address, "expected user@domain"))?;

    let is_component = |part: &str| {
        !part.is_empty() && part != "." && part != ".." && !part.contains(['/', '@'])
    };
    if !is_component(user) || !is_component(domain) {
        return Err(Error::invalid_address(address, "expected user@domain"));
    }

    Ok(base.as_ref().join(domain).join(user))
}

/// Delivery time encoded in a Maildir file name, `<seconds>.<unique>.<host>[:2,<flags>]`.
fn delivery_date_from_name(path: &Path) -> Option<NaiveDate> {
    let name = path.file_name()?.to_str()?;
    let (seconds, _) = name.split_once('.')?;
    let seconds = seconds.parse::<i64>().ok()?;
    let delivered = DateTime::from_timestamp(seconds, 0)?;
    Some(delivered.with_timezone(&Local).date_naive())
}

/// The day a message was delivered.
///
/// Maildir delivery sets the modification time of the message file; the
/// file name is consulted when the metadata can't be read.
fn date_received(path: &Path) -> Option<NaiveDate> {
    let modified = fs::metadata(path).and_then(|metadata| metadata.modified());
    match modified {
        Ok(modified) => Some(DateTime::<Local>::from(modified).date_naive()),
        Err(_) => delivery_date_from_name(path),
    }
}

/// Load and parse one message from a spam folder.
///
/// # Errors
///
/// Returns an error if the file can't be read or the message has no rspamd verdict.
pub fn load_spam_email(path: impl AsRef<Path>) -> Result<SpamEmail> {
    let path = path.as_ref();
    let contents = fs::read(path).map_err(|source| Error::MessageRead {
        path: path.to_path_buf(),
        source,
    })?;
    let received = date_received(path).ok_or_else(|| Error::MessageRead {
        path: path.to_path_buf(),
        source: std::io::Error::other("no delivery time available"),
    })?;

    parse_spam_email(&contents, received)
}

/// Load every message in `paths`, skipping the ones that fail.
pub fn load_spam<I, P>(paths: I) -> LoadOutcome
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let mut outcome = LoadOutcome::default();
    for path in paths {
        let path = path.as_ref();
        match load_spam_email(path) {
            Ok(email) => outcome.emails.push(email),
            Err(e) if e.is_unscored_message() => {
                debug!(path = %path.display(), error = %e, "Message has no rspamd verdict");
                outcome.unscored += 1;
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping message");
                outcome.skipped += 1;
            }
        }
    }

    info!(
        loaded = outcome.emails.len(),
        unscored = outcome.unscored,
        skipped = outcome.skipped,
        "Loaded spam"
    );
    outcome
}

/// Load every message in one user's spam folder.
///
/// # Errors
///
/// Returns an error if the spam folder can't be listed.
pub fn load_user_spam(user_dir: impl AsRef<Path>, spam_folder: &str) -> Result<LoadOutcome> {
    Ok(load_spam(list_user_spam(user_dir, spam_folder)?))
}

/// Load every message in every spam folder under a virtual mailbox base.
///
/// # Errors
///
/// Returns an error if the base directory can't be listed.
pub fn load_virtual_mailbox_spam(
    base: impl AsRef<Path>,
    spam_folder: &str,
) -> Result<LoadOutcome> {
    Ok(load_spam(list_virtual_mailbox_spam(base, spam_folder)?))
}

/// Load one user's spam if `user` is given, otherwise everyone's.
///
/// # Errors
///
/// Returns an error if `user` isn't a valid address or a directory can't be listed.
pub fn load_configured_spam(config: &MailConfig, user: Option<&str>) -> Result<LoadOutcome> {
    match user {
        Some(address) => {
            let user_dir = user_maildir(&config.virtual_mailbox_base, address)?;
            debug!(user = address, dir = %user_dir.display(), "Loading user spam");
            load_user_spam(user_dir, &config.spam_folder)
        }
        None => load_virtual_mailbox_spam(&config.virtual_mailbox_base, &config.spam_folder),
    }
}

/// Load the spam a report covers: [`load_configured_spam`], then only what
/// arrived within `report.window_days` of `today`.
///
/// # Errors
///
/// Same as [`load_configured_spam`].
pub fn load_reporting_window(
    config: &Config,
    user: Option<&str>,
    today: NaiveDate,
) -> Result<LoadOutcome> {
    let outcome = load_configured_spam(&config.mail, user)?;
    let Some(since) = config.window_start(today) else {
        return Ok(outcome);
    };

    let loaded = outcome.emails.len();
    let emails = filter_since(outcome.emails, since);
    debug!(%since, dropped = loaded - emails.len(), "Applied reporting window");
    Ok(LoadOutcome { emails, ..outcome })
}
