//! Result repository.
//!
//! Same shape as the agenda, but rows record outcomes per reporting period
//! instead of due dates.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use deskops_core::{ResultItemId, UserId};

use super::RepositoryError;
use crate::models::ResultItem;

#[derive(Debug, sqlx::FromRow)]
struct ResultRow {
    id: i32,
    owner_id: i32,
    project: String,
    title: String,
    outcome: Option<String>,
    period: Option<String>,
    done: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ResultRow> for ResultItem {
    fn from(row: ResultRow) -> Self {
        Self {
            id: ResultItemId::new(row.id),
            owner_id: UserId::new(row.owner_id),
            project: row.project,
            title: row.title,
            outcome: row.outcome,
            period: row.period,
            done: row.done,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewResultItem {
    pub owner_id: UserId,
    pub project: String,
    pub title: String,
    pub outcome: Option<String>,
    pub period: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ResultUpdate {
    pub project: Option<String>,
    pub title: Option<String>,
    pub outcome: Option<String>,
    pub period: Option<String>,
    pub done: Option<bool>,
}

pub struct ResultRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ResultRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List result rows, most recent period first. `None` lists every owner.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, owner: Option<UserId>) -> Result<Vec<ResultItem>, RepositoryError> {
        let rows = sqlx::query_as::<_, ResultRow>(
            r"
            SELECT id, owner_id, project, title, outcome, period, done, created_at, updated_at
            FROM deskops.result_item
            WHERE ($1::int IS NULL OR owner_id = $1)
            ORDER BY period DESC NULLS LAST, project, id
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
    pub async fn get_by_id(&self, id: ResultItemId) -> Result<Option<ResultItem>, RepositoryError> {
        let row = sqlx::query_as::<_, ResultRow>(
            r"
            SELECT id, owner_id, project, title, outcome, period, done, created_at, updated_at
            FROM deskops.result_item
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
    pub async fn create(&self, item: &NewResultItem) -> Result<ResultItem, RepositoryError> {
        let row = sqlx::query_as::<_, ResultRow>(
            r"
            INSERT INTO deskops.result_item (owner_id, project, title, outcome, period)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, owner_id, project, title, outcome, period, done, created_at, updated_at
            ",
        )
        .bind(item.owner_id)
        .bind(&item.project)
        .bind(&item.title)
        .bind(item.outcome.as_deref())
        .bind(item.period.as_deref())
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the row doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn update(
        &self,
        id: ResultItemId,
        update: &ResultUpdate,
    ) -> Result<ResultItem, RepositoryError> {
        let row = sqlx::query_as::<_, ResultRow>(
            r"
            UPDATE deskops.result_item
            SET project = COALESCE($2, project),
                title = COALESCE($3, title),
                outcome = COALESCE($4, outcome),
                period = COALESCE($5, period),
                done = COALESCE($6, done)
            WHERE id = $1
            RETURNING id, owner_id, project, title, outcome, period, done, created_at, updated_at
            ",
        )
        .bind(id)
        .bind(update.project.as_deref())
        .bind(update.title.as_deref())
        .bind(update.outcome.as_deref())
        .bind(update.period.as_deref())
        .bind(update.done)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the row doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn delete(&self, id: ResultItemId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM deskops.result_item WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }
}
