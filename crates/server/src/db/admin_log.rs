//! Audit trail repository. Rows are append-only; the table rejects updates
//! and deletes with a trigger.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;

use deskops_core::{AdminLogId, UserId};

use super::RepositoryError;
use crate::models::AdminLogEntry;

#[derive(Debug, sqlx::FromRow)]
struct AdminLogRow {
    id: i32,
    actor_id: Option<i32>,
    actor_name: Option<String>,
    action: String,
    target: Option<String>,
    details: sqlx::types::Json<Value>,
    created_at: DateTime<Utc>,
}

impl From<AdminLogRow> for AdminLogEntry {
    fn from(row: AdminLogRow) -> Self {
        Self {
            id: AdminLogId::new(row.id),
            actor_id: row.actor_id.map(UserId::new),
            actor_name: row.actor_name,
            action: row.action,
            target: row.target,
            details: row.details.0,
            created_at: row.created_at,
        }
    }
}

/// A new audit record.
#[derive(Debug, Clone)]
pub struct NewAdminLog {
    /// `None` for system actions (CLI imports).
    pub actor_id: Option<UserId>,
    /// Dotted action name, e.g. `wordpress.users.suspend`.
    pub action: String,
    pub target: Option<String>,
    pub details: Value,
}

impl NewAdminLog {
    #[must_use]
    pub fn new(actor_id: Option<UserId>, action: impl Into<String>) -> Self {
        Self {
            actor_id,
            action: action.into(),
            target: None,
            details: Value::Object(serde_json::Map::new()),
        }
    }

    #[must_use]
    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    #[must_use]
    pub fn details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }
}

/// Filters and paging for [`AdminLogRepository::list`].
#[derive(Debug, Clone)]
pub struct AdminLogFilter {
    /// Exact action, or a prefix ending in `.` (e.g. `wordpress.`).
    pub action: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

impl Default for AdminLogFilter {
    fn default() -> Self {
        Self {
            action: None,
            limit: 50,
            offset: 0,
        }
    }
}

pub struct AdminLogRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AdminLogRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Append an entry.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn append(&self, entry: &NewAdminLog) -> Result<AdminLogId, RepositoryError> {
        let id = sqlx::query_scalar::<_, i32>(
            r"
            INSERT INTO deskops.admin_log (actor_id, action, target, details)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            ",
        )
        .bind(entry.actor_id)
        .bind(&entry.action)
        .bind(entry.target.as_deref())
        .bind(sqlx::types::Json(&entry.details))
        .fetch_one(self.pool)
        .await?;

        Ok(AdminLogId::new(id))
    }

    /// List entries, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, filter: &AdminLogFilter) -> Result<Vec<AdminLogEntry>, RepositoryError> {
        let (exact, prefix) = split_action_filter(filter.action.as_deref());

        let rows = sqlx::query_as::<_, AdminLogRow>(
            r"
            SELECT l.id, l.actor_id, u.name AS actor_name, l.action, l.target,
                   l.details, l.created_at
            FROM deskops.admin_log l
            LEFT JOIN deskops.app_user u ON u.id = l.actor_id
            WHERE ($1::text IS NULL OR l.action = $1)
              AND ($2::text IS NULL OR starts_with(l.action, $2))
            ORDER BY l.created_at DESC, l.id DESC
            LIMIT $3 OFFSET $4
            ",
        )
        .bind(exact)
        .bind(prefix)
        .bind(filter.limit)
        .bind(filter.offset)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

/// Split an action filter into `(exact, prefix)`.
fn split_action_filter(action: Option<&str>) -> (Option<&str>, Option<&str>) {
    match action.map(str::trim).filter(|a| !a.is_empty()) {
        Some(a) if a.ends_with('.') => (None, Some(a)),
        Some(a) => (Some(a), None),
        None => (None, None),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_split_action_filter() {
        assert_eq!(split_action_filter(None), (None, None));
        assert_eq!(split_action_filter(Some("  ")), (None, None));
        assert_eq!(
            split_action_filter(Some("users.create")),
            (Some("users.create"), None)
        );
        assert_eq!(
            split_action_filter(Some("wordpress.")),
            (None, Some("wordpress."))
        );
    }

    #[test]
    fn test_new_admin_log_builder() {
        let entry = NewAdminLog::new(Some(UserId::new(3)), "tickets.delete")
            .target("ticket:9")
            .details(json!({ "subject": "Printer" }));

        assert_eq!(entry.action, "tickets.delete");
        assert_eq!(entry.target.as_deref(), Some("ticket:9"));
        assert_eq!(entry.details["subject"], "Printer");
    }

    #[test]
    fn test_new_admin_log_defaults_to_empty_object() {
        let entry = NewAdminLog::new(None, "cli.sync");
        assert_eq!(entry.details, json!({}));
    }
}
