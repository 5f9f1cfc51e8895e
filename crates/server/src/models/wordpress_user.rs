//! Local cache of WordPress suspension state.

use chrono::{DateTime, Utc};
use serde::Serialize;

use deskops_core::WpUserId;

/// Suspension state for one WordPress account.
///
/// WordPress has no native "suspended" flag; suspension strips every role and
/// this row remembers what to restore.
#[derive(Debug, Clone, Serialize)]
pub struct WordPressUserState {
    pub wp_user_id: WpUserId,
    pub suspended: bool,
    pub suspended_at: Option<DateTime<Utc>>,
    pub reason: Option<String>,
    pub previous_roles: Vec<String>,
    pub updated_at: DateTime<Utc>,
}
