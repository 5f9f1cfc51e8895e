//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use deskops_core::{Email, Role, UserId};

/// A DeskOps account: staff member or customer.
///
/// The password hash never leaves the repository layer.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub name: String,
    pub role: Role,
    pub phone: Option<String>,
    pub company: Option<String>,
    /// Set when the account was soft-deleted; the email is then a tombstone.
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}
