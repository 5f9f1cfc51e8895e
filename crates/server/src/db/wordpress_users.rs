//! Local cache of WordPress suspension state.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use deskops_core::WpUserId;

use super::RepositoryError;
use crate::models::WordPressUserState;

#[derive(Debug, sqlx::FromRow)]
struct WordPressUserRow {
    wp_user_id: i64,
    suspended: bool,
    suspended_at: Option<DateTime<Utc>>,
    reason: Option<String>,
    previous_roles: Vec<String>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<WordPressUserRow> for WordPressUserState {
    type Error = RepositoryError;

    fn try_from(row: WordPressUserRow) -> Result<Self, Self::Error> {
        let wp_user_id = u64::try_from(row.wp_user_id)
            .map(WpUserId::new)
            .map_err(|_| {
                RepositoryError::DataCorruption(format!(
                    "negative WordPress user id: {}",
                    row.wp_user_id
                ))
            })?;

        Ok(Self {
            wp_user_id,
            suspended: row.suspended,
            suspended_at: row.suspended_at,
            reason: row.reason,
            previous_roles: row.previous_roles,
            updated_at: row.updated_at,
        })
    }
}

pub struct WordPressUserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> WordPressUserRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: WpUserId) -> Result<Option<WordPressUserState>, RepositoryError> {
        let row = sqlx::query_as::<_, WordPressUserRow>(
            r"
            SELECT wp_user_id, suspended, suspended_at, reason, previous_roles, updated_at
            FROM deskops.wordpress_user
            WHERE wp_user_id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Fetch cached state for many users in one query, keyed by ID.
    ///
    /// IDs with no cached row are absent from the map.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_many(
        &self,
        ids: &[WpUserId],
    ) -> Result<HashMap<WpUserId, WordPressUserState>, RepositoryError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let raw = ids
            .iter()
            .filter_map(|id| i64::try_from(id.as_u64()).ok())
            .collect::<Vec<_>>();

        let rows = sqlx::query_as::<_, WordPressUserRow>(
            r"
            SELECT wp_user_id, suspended, suspended_at, reason, previous_roles, updated_at
            FROM deskops.wordpress_user
            WHERE wp_user_id = ANY($1)
            ",
        )
        .bind(raw)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let state = WordPressUserState::try_from(row)?;
                Ok((state.wp_user_id, state))
            })
            .collect()
    }

    /// List suspended users, most recently suspended first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_suspended(&self) -> Result<Vec<WordPressUserState>, RepositoryError> {
        let rows = sqlx::query_as::<_, WordPressUserRow>(
            r"
            SELECT wp_user_id, suspended, suspended_at, reason, previous_roles, updated_at
            FROM deskops.wordpress_user
            WHERE suspended
            ORDER BY suspended_at DESC NULLS LAST, wp_user_id
            ",
        )
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Record a suspension.
    ///
    /// `previous_roles` is only overwritten when non-empty, so suspending an
    /// already suspended user keeps the roles to restore.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the upsert fails.
    pub async fn mark_suspended(
        &self,
        id: WpUserId,
        previous_roles: &[String],
        reason: Option<&str>,
    ) -> Result<WordPressUserState, RepositoryError> {
        let row = sqlx::query_as::<_, WordPressUserRow>(
            r"
            INSERT INTO deskops.wordpress_user
                (wp_user_id, suspended, suspended_at, reason, previous_roles, updated_at)
            VALUES ($1, TRUE, NOW(), $2, $3, NOW())
            ON CONFLICT (wp_user_id) DO UPDATE
            SET suspended = TRUE,
                suspended_at = COALESCE(deskops.wordpress_user.suspended_at, NOW()),
                reason = COALESCE(EXCLUDED.reason, deskops.wordpress_user.reason),
                previous_roles = CASE
                    WHEN cardinality(EXCLUDED.previous_roles) > 0 THEN EXCLUDED.previous_roles
                    ELSE deskops.wordpress_user.previous_roles
                END,
                updated_at = NOW()
            RETURNING wp_user_id, suspended, suspended_at, reason, previous_roles, updated_at
            ",
        )
        .bind(id)
        .bind(reason)
        .bind(previous_roles)
        .fetch_one(self.pool)
        .await?;

        row.try_into()
    }

    /// Record that a user was restored. Clears the remembered roles.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the upsert fails.
    pub async fn mark_unsuspended(
        &self,
        id: WpUserId,
    ) -> Result<WordPressUserState, RepositoryError> {
        let row = sqlx::query_as::<_, WordPressUserRow>(
            r"
            INSERT INTO deskops.wordpress_user (wp_user_id, suspended, updated_at)
            VALUES ($1, FALSE, NOW())
            ON CONFLICT (wp_user_id) DO UPDATE
            SET suspended = FALSE,
                suspended_at = NULL,
                reason = NULL,
                previous_roles = '{}',
                updated_at = NOW()
            RETURNING wp_user_id, suspended, suspended_at, reason, previous_roles, updated_at
            ",
        )
        .bind(id)
        .fetch_one(self.pool)
        .await?;

        row.try_into()
    }
}
