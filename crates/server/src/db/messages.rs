//! Ticket message repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use deskops_core::{TicketId, TicketMessageId, UserId};

use super::RepositoryError;
use crate::models::TicketMessage;

#[derive(Debug, sqlx::FromRow)]
struct MessageRow {
    id: i32,
    ticket_id: i32,
    author_id: i32,
    author_name: String,
    body: String,
    internal: bool,
    created_at: DateTime<Utc>,
}

impl From<MessageRow> for TicketMessage {
    fn from(row: MessageRow) -> Self {
        Self {
            id: TicketMessageId::new(row.id),
            ticket_id: TicketId::new(row.ticket_id),
            author_id: UserId::new(row.author_id),
            author_name: row.author_name,
            body: row.body,
            internal: row.internal,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewMessage {
    pub ticket_id: TicketId,
    pub author_id: UserId,
    pub body: String,
    pub internal: bool,
}

/// Repository for ticket messages.
pub struct MessageRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> MessageRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List a ticket's messages, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        ticket_id: TicketId,
        include_internal: bool,
    ) -> Result<Vec<TicketMessage>, RepositoryError> {
        let rows = sqlx::query_as::<_, MessageRow>(
            r"
            SELECT m.id, m.ticket_id, m.author_id, u.name AS author_name,
                   m.body, m.internal, m.created_at
            FROM deskops.ticket_message m
            JOIN deskops.app_user u ON u.id = m.author_id
            WHERE m.ticket_id = $1 AND ($2 OR NOT m.internal)
            ORDER BY m.created_at ASC, m.id ASC
            ",
        )
        .bind(ticket_id)
        .bind(include_internal)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Add a message to a ticket.
    ///
    /// When `reopen_finished` is set (the author is the ticket's customer) a
    /// `resolved` or `closed` ticket goes back to `open`. Returns the message
    /// and whether the ticket was reopened.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the ticket doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(
        &self,
        message: &NewMessage,
        reopen_finished: bool,
    ) -> Result<(TicketMessage, bool), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, MessageRow>(
            r"
            WITH inserted AS (
                INSERT INTO deskops.ticket_message (ticket_id, author_id, body, internal)
                VALUES ($1, $2, $3, $4)
                RETURNING id, ticket_id, author_id, body, internal, created_at
            )
            SELECT i.id, i.ticket_id, i.author_id, u.name AS author_name,
                   i.body, i.internal, i.created_at
            FROM inserted i
            JOIN deskops.app_user u ON u.id = i.author_id
            ",
        )
        .bind(message.ticket_id)
        .bind(message.author_id)
        .bind(&message.body)
        .bind(message.internal)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_foreign_key_violation()
            {
                return RepositoryError::NotFound;
            }
            RepositoryError::Database(e)
        })?;

        let reopened = if reopen_finished {
            sqlx::query(
                r"
                UPDATE deskops.ticket
                SET status = 'open', resolved_at = NULL
                WHERE id = $1 AND status IN ('resolved', 'closed')
                ",
            )
            .bind(message.ticket_id)
            .execute(&mut *tx)
            .await?
            .rows_affected()
                > 0
        } else {
            false
        };

        if !reopened {
            sqlx::query("UPDATE deskops.ticket SET updated_at = NOW() WHERE id = $1")
                .bind(message.ticket_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        Ok((row.into(), reopened))
    }
}
