//! Calendar event repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use deskops_core::{EventId, TicketId, UserId};

use super::RepositoryError;
use crate::models::Event;

#[derive(Debug, sqlx::FromRow)]
struct EventRow {
    id: i32,
    title: String,
    description: Option<String>,
    location: Option<String>,
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
    ticket_id: Option<i32>,
    created_by: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<EventRow> for Event {
    fn from(row: EventRow) -> Self {
        Self {
            id: EventId::new(row.id),
            title: row.title,
            description: row.description,
            location: row.location,
            starts_at: row.starts_at,
            ends_at: row.ends_at,
            ticket_id: row.ticket_id.map(TicketId::new),
            created_by: UserId::new(row.created_by),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewEvent {
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub ticket_id: Option<TicketId>,
    pub created_by: UserId,
}

/// Partial update; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct EventUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub ticket_id: Option<TicketId>,
    /// Remove the ticket link (wins over `ticket_id`).
    pub unlink_ticket: bool,
}

pub struct EventRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> EventRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List events overlapping `[from, to)`, by start time.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Event>, RepositoryError> {
        let rows = sqlx::query_as::<_, EventRow>(
            r"
            SELECT id, title, description, location, starts_at, ends_at, ticket_id,
                   created_by, created_at, updated_at
            FROM deskops.event
            WHERE starts_at < $2 AND ends_at >= $1
            ORDER BY starts_at, id
            ",
        )
        .bind(from)
        .bind(to)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: EventId) -> Result<Option<Event>, RepositoryError> {
        let row = sqlx::query_as::<_, EventRow>(
            r"
            SELECT id, title, description, location, starts_at, ends_at, ticket_id,
                   created_by, created_at, updated_at
            FROM deskops.event
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Invalid` if the event ends before it starts or
    /// the linked ticket doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, event: &NewEvent) -> Result<Event, RepositoryError> {
        check_range(event.starts_at, event.ends_at)?;

        let row = sqlx::query_as::<_, EventRow>(
            r"
            INSERT INTO deskops.event
                (title, description, location, starts_at, ends_at, ticket_id, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, title, description, location, starts_at, ends_at, ticket_id,
                      created_by, created_at, updated_at
            ",
        )
        .bind(&event.title)
        .bind(event.description.as_deref())
        .bind(event.location.as_deref())
        .bind(event.starts_at)
        .bind(event.ends_at)
        .bind(event.ticket_id)
        .bind(event.created_by)
        .fetch_one(self.pool)
        .await
        .map_err(map_constraint)?;

        Ok(row.into())
    }

    /// Apply a partial update. The merged start/end pair is validated.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the event doesn't exist.
    /// Returns `RepositoryError::Invalid` if the result would end before it starts.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn update(&self, id: EventId, update: &EventUpdate) -> Result<Event, RepositoryError> {
        let current = self.get_by_id(id).await?.ok_or(RepositoryError::NotFound)?;
        check_range(
            update.starts_at.unwrap_or(current.starts_at),
            update.ends_at.unwrap_or(current.ends_at),
        )?;

        let row = sqlx::query_as::<_, EventRow>(
            r"
            UPDATE deskops.event
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                location = COALESCE($4, location),
                starts_at = COALESCE($5, starts_at),
                ends_at = COALESCE($6, ends_at),
                ticket_id = CASE WHEN $8 THEN NULL ELSE COALESCE($7, ticket_id) END
            WHERE id = $1
            RETURNING id, title, description, location, starts_at, ends_at, ticket_id,
                      created_by, created_at, updated_at
            ",
        )
        .bind(id)
        .bind(update.title.as_deref())
        .bind(update.description.as_deref())
        .bind(update.location.as_deref())
        .bind(update.starts_at)
        .bind(update.ends_at)
        .bind(update.ticket_id)
        .bind(update.unlink_ticket)
        .fetch_optional(self.pool)
        .await
        .map_err(map_constraint)?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the event doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn delete(&self, id: EventId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM deskops.event WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }
}

fn check_range(starts_at: DateTime<Utc>, ends_at: DateTime<Utc>) -> Result<(), RepositoryError> {
    if ends_at < starts_at {
        return Err(RepositoryError::Invalid(
            "event must not end before it starts".to_owned(),
        ));
    }
    Ok(())
}

fn map_constraint(e: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e {
        if db_err.is_foreign_key_violation() {
            return RepositoryError::Invalid("linked ticket does not exist".to_owned());
        }
        // Concurrent update moved the other end of the range
        if db_err.is_check_violation() {
            return RepositoryError::Invalid(
                "event must not end before it starts".to_owned(),
            );
        }
    }
    RepositoryError::Database(e)
}
