//! Ticket repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use deskops_core::{CategoryId, TicketId, TicketPriority, TicketStatus, UserId};

use super::RepositoryError;
use crate::models::Ticket;

/// Shared projection. `$1` is always "include internal messages in the count".
const TICKET_SELECT: &str = r"
    SELECT t.id, t.subject, t.description, t.status, t.priority,
           t.category_id, c.name AS category_name,
           t.customer_id, cu.name AS customer_name,
           t.assignee_id, a.name AS assignee_name,
           t.created_by,
           (SELECT COUNT(*) FROM deskops.ticket_message m
            WHERE m.ticket_id = t.id AND ($1 OR NOT m.internal)) AS message_count,
           t.resolved_at, t.created_at, t.updated_at
    FROM deskops.ticket t
    JOIN deskops.app_user cu ON cu.id = t.customer_id
    LEFT JOIN deskops.app_user a ON a.id = t.assignee_id
    LEFT JOIN deskops.category c ON c.id = t.category_id
";

#[derive(Debug, sqlx::FromRow)]
struct TicketRow {
    id: i32,
    subject: String,
    description: String,
    status: TicketStatus,
    priority: TicketPriority,
    category_id: Option<i32>,
    category_name: Option<String>,
    customer_id: i32,
    customer_name: String,
    assignee_id: Option<i32>,
    assignee_name: Option<String>,
    created_by: i32,
    message_count: i64,
    resolved_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<TicketRow> for Ticket {
    fn from(row: TicketRow) -> Self {
        Self {
            id: TicketId::new(row.id),
            subject: row.subject,
            description: row.description,
            status: row.status,
            priority: row.priority,
            category_id: row.category_id.map(CategoryId::new),
            category_name: row.category_name,
            customer_id: UserId::new(row.customer_id),
            customer_name: row.customer_name,
            assignee_id: row.assignee_id.map(UserId::new),
            assignee_name: row.assignee_name,
            created_by: UserId::new(row.created_by),
            message_count: row.message_count,
            resolved_at: row.resolved_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Filters for [`TicketRepository::list`]. All set filters must match.
#[derive(Debug, Clone, Default)]
pub struct TicketFilter {
    pub status: Option<TicketStatus>,
    pub priority: Option<TicketPriority>,
    pub category_id: Option<CategoryId>,
    pub assignee_id: Option<UserId>,
    pub customer_id: Option<UserId>,
    /// Only tickets without an assignee.
    pub unassigned: bool,
    /// Skip resolved and closed tickets.
    pub open_only: bool,
    /// Case-insensitive match on the subject.
    pub search: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone)]
pub struct NewTicket {
    pub subject: String,
    pub description: String,
    pub priority: TicketPriority,
    pub category_id: Option<CategoryId>,
    pub customer_id: UserId,
    pub created_by: UserId,
}

/// Partial update; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct TicketUpdate {
    pub subject: Option<String>,
    pub description: Option<String>,
    pub status: Option<TicketStatus>,
    pub priority: Option<TicketPriority>,
    pub category_id: Option<CategoryId>,
    /// Remove the category (wins over `category_id`).
    pub clear_category: bool,
}

/// Repository for ticket database operations.
pub struct TicketRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> TicketRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List tickets matching `filter`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        filter: &TicketFilter,
        include_internal: bool,
    ) -> Result<Vec<Ticket>, RepositoryError> {
        let search = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());

        let sql = format!(
            r"{TICKET_SELECT}
            WHERE ($2::deskops.ticket_status IS NULL OR t.status = $2)
              AND ($3::deskops.ticket_priority IS NULL OR t.priority = $3)
              AND ($4::int IS NULL OR t.category_id = $4)
              AND ($5::int IS NULL OR t.assignee_id = $5)
              AND ($6::int IS NULL OR t.customer_id = $6)
              AND (NOT $7 OR t.assignee_id IS NULL)
              AND ($8::text IS NULL OR t.subject ILIKE '%' || $8 || '%')
              AND (NOT $11 OR t.status NOT IN ('resolved', 'closed'))
            ORDER BY t.created_at DESC
            LIMIT $9 OFFSET $10
            "
        );

        let rows = sqlx::query_as::<_, TicketRow>(&sql)
            .bind(include_internal)
            .bind(filter.status)
            .bind(filter.priority)
            .bind(filter.category_id)
            .bind(filter.assignee_id)
            .bind(filter.customer_id)
            .bind(filter.unassigned)
            .bind(search)
            .bind(filter.limit)
            .bind(filter.offset)
            .bind(filter.open_only)
            .fetch_all(self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Get a ticket by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(
        &self,
        id: TicketId,
        include_internal: bool,
    ) -> Result<Option<Ticket>, RepositoryError> {
        let sql = format!("{TICKET_SELECT} WHERE t.id = $2");

        let row = sqlx::query_as::<_, TicketRow>(&sql)
            .bind(include_internal)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(Into::into))
    }

    /// Create a ticket in the `open` state.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Invalid` if the customer or category doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, ticket: &NewTicket) -> Result<Ticket, RepositoryError> {
        let id = sqlx::query_scalar::<_, i32>(
            r"
            INSERT INTO deskops.ticket
                (subject, description, priority, category_id, customer_id, created_by)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            ",
        )
        .bind(&ticket.subject)
        .bind(&ticket.description)
        .bind(ticket.priority)
        .bind(ticket.category_id)
        .bind(ticket.customer_id)
        .bind(ticket.created_by)
        .fetch_one(self.pool)
        .await
        .map_err(invalid_on_foreign_key)?;

        self.get_by_id(TicketId::new(id), true)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    /// Apply a partial update.
    ///
    /// Moving to `resolved`/`closed` stamps `resolved_at`; moving back clears it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the ticket doesn't exist.
    /// Returns `RepositoryError::Invalid` if the category doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn update(
        &self,
        id: TicketId,
        update: &TicketUpdate,
    ) -> Result<Ticket, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE deskops.ticket
            SET subject = COALESCE($2, subject),
                description = COALESCE($3, description),
                status = COALESCE($4, status),
                priority = COALESCE($5, priority),
                category_id = CASE WHEN $7 THEN NULL ELSE COALESCE($6, category_id) END,
                resolved_at = CASE
                    WHEN $4::deskops.ticket_status IS NULL THEN resolved_at
                    WHEN $4 IN ('resolved', 'closed') THEN COALESCE(resolved_at, NOW())
                    ELSE NULL
                END
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(update.subject.as_deref())
        .bind(update.description.as_deref())
        .bind(update.status)
        .bind(update.priority)
        .bind(update.category_id)
        .bind(update.clear_category)
        .execute(self.pool)
        .await
        .map_err(invalid_on_foreign_key)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        self.get_by_id(id, true)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    /// Set or clear the assignee.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the ticket doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn assign(
        &self,
        id: TicketId,
        assignee: Option<UserId>,
    ) -> Result<Ticket, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE deskops.ticket
            SET assignee_id = $2,
                status = CASE WHEN $2::int IS NOT NULL AND status = 'open'
                              THEN 'in_progress'::deskops.ticket_status
                              ELSE status END
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(assignee)
        .execute(self.pool)
        .await
        .map_err(invalid_on_foreign_key)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        self.get_by_id(id, true)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    /// Delete a ticket and its messages.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the ticket doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn delete(&self, id: TicketId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM deskops.ticket WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }
}

fn invalid_on_foreign_key(e: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_foreign_key_violation()
    {
        return RepositoryError::Invalid("referenced user or category does not exist".to_owned());
    }
    RepositoryError::Database(e)
}
