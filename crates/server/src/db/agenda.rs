//! Agenda repository.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;

use deskops_core::{AgendaItemId, UserId};

use super::RepositoryError;
use crate::models::AgendaItem;

#[derive(Debug, sqlx::FromRow)]
struct AgendaRow {
    id: i32,
    owner_id: i32,
    project: String,
    title: String,
    notes: Option<String>,
    due_date: Option<NaiveDate>,
    done: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<AgendaRow> for AgendaItem {
    fn from(row: AgendaRow) -> Self {
        Self {
            id: AgendaItemId::new(row.id),
            owner_id: UserId::new(row.owner_id),
            project: row.project,
            title: row.title,
            notes: row.notes,
            due_date: row.due_date,
            done: row.done,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewAgendaItem {
    pub owner_id: UserId,
    pub project: String,
    pub title: String,
    pub notes: Option<String>,
    pub due_date: Option<NaiveDate>,
}

/// Partial update; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct AgendaUpdate {
    pub project: Option<String>,
    pub title: Option<String>,
    pub notes: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub done: Option<bool>,
}

pub struct AgendaRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AgendaRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List agenda items. `None` lists every owner's rows.
    ///
    /// Open items come first, then by due date (undated last).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, owner: Option<UserId>) -> Result<Vec<AgendaItem>, RepositoryError> {
        let rows = sqlx::query_as::<_, AgendaRow>(
            r"
            SELECT id, owner_id, project, title, notes, due_date, done, created_at, updated_at
            FROM deskops.agenda_item
            WHERE ($1::int IS NULL OR owner_id = $1)
            ORDER BY done, due_date NULLS LAST, id
            ",
        )
        .bind(owner)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: AgendaItemId) -> Result<Option<AgendaItem>, RepositoryError> {
        let row = sqlx::query_as::<_, AgendaRow>(
            r"
            SELECT id, owner_id, project, title, notes, due_date, done, created_at, updated_at
            FROM deskops.agenda_item
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
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, item: &NewAgendaItem) -> Result<AgendaItem, RepositoryError> {
        let row = sqlx::query_as::<_, AgendaRow>(
            r"
            INSERT INTO deskops.agenda_item (owner_id, project, title, notes, due_date)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, owner_id, project, title, notes, due_date, done, created_at, updated_at
            ",
        )
        .bind(item.owner_id)
        .bind(&item.project)
        .bind(&item.title)
        .bind(item.notes.as_deref())
        .bind(item.due_date)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the item doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn update(
        &self,
        id: AgendaItemId,
        update: &AgendaUpdate,
    ) -> Result<AgendaItem, RepositoryError> {
        let row = sqlx::query_as::<_, AgendaRow>(
            r"
            UPDATE deskops.agenda_item
            SET project = COALESCE($2, project),
                title = COALESCE($3, title),
                notes = COALESCE($4, notes),
                due_date = COALESCE($5, due_date),
                done = COALESCE($6, done)
            WHERE id = $1
            RETURNING id, owner_id, project, title, notes, due_date, done, created_at, updated_at
            ",
        )
        .bind(id)
        .bind(update.project.as_deref())
        .bind(update.title.as_deref())
        .bind(update.notes.as_deref())
        .bind(update.due_date)
        .bind(update.done)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the item doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn delete(&self, id: AgendaItemId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM deskops.agenda_item WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }
}
