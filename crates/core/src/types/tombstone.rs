//! Email tombstoning for soft-deleted users.
//!
//! A deleted user keeps their row, but their email is rewritten to a unique
//! `deleted+<unix_millis>-<id>@<domain>` address so the original can be
//! registered again.

use chrono::{DateTime, Utc};

use super::email::Email;
use super::id::UserId;

const TOMBSTONE_PREFIX: &str = "deleted+";

/// Rewrite `email` into its tombstone form.
///
/// The domain is preserved so the address still satisfies [`Email::parse`].
#[must_use]
pub fn tombstone_email(email: &Email, deleted_at: DateTime<Utc>, id: UserId) -> String {
    format!(
        "{TOMBSTONE_PREFIX}{}-{}@{}",
        deleted_at.timestamp_millis(),
        id,
        email.domain()
    )
}

/// Whether `email` looks like a tombstone produced by [`tombstone_email`].
///
/// The check is case-insensitive on the prefix and requires the
/// `<millis>-<id>` part to be numeric.
#[must_use]
pub fn is_tombstone(email: &str) -> bool {
    let Some((local, _domain)) = email.rsplit_once('@') else {
        return false;
    };
    let local = local.to_ascii_lowercase();
    let Some(rest) = local.strip_prefix(TOMBSTONE_PREFIX) else {
        return false;
    };
    let Some((millis, id)) = rest.split_once('-') else {
        return false;
    };
    !millis.is_empty()
        && !id.is_empty()
        && millis.bytes().all(|b| b.is_ascii_digit())
        && id.bytes().all(|b| b.is_ascii_digit())
}
