//! User repository for database operations.
//!
//! Staff and customers live in `deskops.app_user`. Deletion is soft: the row
//! stays, `deleted_at` is set and the email is replaced by a tombstone so the
//! original address can be registered again.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use deskops_core::{Email, Role, UserId, is_tombstone, tombstone_email};

use super::{RepositoryError, conflict_on_unique};
use crate::models::User;

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i32,
    email: String,
    name: String,
    role: Role,
    phone: Option<String>,
    company: Option<String>,
    deleted_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: UserId::new(row.id),
            email,
            name: row.name,
            role: row.role,
            phone: row.phone,
            company: row.company,
            deleted_at: row.deleted_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct LoginRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: Option<String>,
}

// =============================================================================
// Inputs
// =============================================================================

/// Filters for [`UserRepository::list`].
#[derive(Debug, Default, Clone)]
pub struct UserFilter {
    pub role: Option<Role>,
    /// Only staff roles (ignored when `role` is set).
    pub staff_only: bool,
    pub include_deleted: bool,
    /// Case-insensitive match on name or email.
    pub search: Option<String>,
}

/// Fields for a new user. `password_hash` is `None` for customers.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: Email,
    pub name: String,
    pub role: Role,
    pub password_hash: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
}

/// Partial update; `None` leaves a field unchanged.
#[derive(Debug, Default, Clone)]
pub struct UserUpdate {
    pub email: Option<Email>,
    pub name: Option<String>,
    pub role: Option<Role>,
    pub password_hash: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List users, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the data is invalid.
    pub async fn list(&self, filter: &UserFilter) -> Result<Vec<User>, RepositoryError> {
        let search = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());

        let rows = sqlx::query_as::<_, UserRow>(
            r"
            SELECT id, email, name, role, phone, company, deleted_at, created_at, updated_at
            FROM deskops.app_user
            WHERE ($1::deskops.user_role IS NULL OR role = $1)
              AND ($1::deskops.user_role IS NOT NULL OR NOT $2 OR role <> 'CUSTOMER')
              AND ($3 OR deleted_at IS NULL)
              AND ($4::text IS NULL
                   OR name ILIKE '%' || $4 || '%'
                   OR email ILIKE '%' || $4 || '%')
            ORDER BY created_at DESC
            ",
        )
        .bind(filter.role)
        .bind(filter.staff_only)
        .bind(filter.include_deleted)
        .bind(search)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Get a user by ID, including soft-deleted users.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the data is invalid.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            SELECT id, email, name, role, phone, company, deleted_at, created_at, updated_at
            FROM deskops.app_user
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Get an active user by email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the data is invalid.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            SELECT id, email, name, role, phone, company, deleted_at, created_at, updated_at
            FROM deskops.app_user
            WHERE lower(email) = lower($1) AND deleted_at IS NULL
            ",
        )
        .bind(email)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Get an active user together with their password hash, for login.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the data is invalid.
    pub async fn get_login(
        &self,
        email: &Email,
    ) -> Result<Option<(User, Option<String>)>, RepositoryError> {
        let row = sqlx::query_as::<_, LoginRow>(
            r"
            SELECT id, email, name, role, phone, company, deleted_at, created_at, updated_at,
                   password_hash
            FROM deskops.app_user
            WHERE lower(email) = lower($1) AND deleted_at IS NULL
            ",
        )
        .bind(email)
        .fetch_optional(self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let user = User::try_from(row.user)?;
        Ok(Some((user, row.password_hash)))
    }

    /// Create a new user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Invalid` if the email is a tombstone address.
    /// Returns `RepositoryError::Conflict` if the email already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, user: &NewUser) -> Result<User, RepositoryError> {
        reject_tombstone(&user.email)?;

        let row = sqlx::query_as::<_, UserRow>(
            r"
            INSERT INTO deskops.app_user (email, name, role, password_hash, phone, company)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, email, name, role, phone, company, deleted_at, created_at, updated_at
            ",
        )
        .bind(&user.email)
        .bind(&user.name)
        .bind(user.role)
        .bind(user.password_hash.as_deref())
        .bind(user.phone.as_deref())
        .bind(user.company.as_deref())
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "email already exists"))?;

        row.try_into()
    }

    /// Update an active user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist or is deleted.
    /// Returns `RepositoryError::Invalid` if the new email is a tombstone address.
    /// Returns `RepositoryError::Conflict` if the email is used by another user.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn update(&self, id: UserId, update: &UserUpdate) -> Result<User, RepositoryError> {
        if let Some(email) = &update.email {
            reject_tombstone(email)?;
        }

        let row = sqlx::query_as::<_, UserRow>(
            r"
            UPDATE deskops.app_user
            SET email = COALESCE($2, email),
                name = COALESCE($3, name),
                role = COALESCE($4, role),
                password_hash = COALESCE($5, password_hash),
                phone = COALESCE($6, phone),
                company = COALESCE($7, company)
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING id, email, name, role, phone, company, deleted_at, created_at, updated_at
            ",
        )
        .bind(id)
        .bind(update.email.as_ref())
        .bind(update.name.as_deref())
        .bind(update.role)
        .bind(update.password_hash.as_deref())
        .bind(update.phone.as_deref())
        .bind(update.company.as_deref())
        .fetch_optional(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "email already exists"))?
        .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    /// Soft-delete a user: tombstone the email and set `deleted_at`.
    ///
    /// The password hash is cleared so the row can never log in again.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    /// Returns `RepositoryError::Conflict` if the user is already deleted.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn soft_delete(&self, id: UserId) -> Result<User, RepositoryError> {
        let user = self.get_by_id(id).await?.ok_or(RepositoryError::NotFound)?;
        if user.is_deleted() {
            return Err(RepositoryError::Conflict("user already deleted".to_owned()));
        }

        let deleted_at = Utc::now();
        let tombstone = tombstone_email(&user.email, deleted_at, id);

        let row = sqlx::query_as::<_, UserRow>(
            r"
            UPDATE deskops.app_user
            SET email = $2, deleted_at = $3, password_hash = NULL
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING id, email, name, role, phone, company, deleted_at, created_at, updated_at
            ",
        )
        .bind(id)
        .bind(&tombstone)
        .bind(deleted_at)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "tombstone collision"))?
        // Lost a race with a concurrent delete
        .ok_or_else(|| RepositoryError::Conflict("user already deleted".to_owned()))?;

        row.try_into()
    }

    /// Count active users with the given role.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_by_role(&self, role: Role) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>(
            r"
            SELECT COUNT(*)
            FROM deskops.app_user
            WHERE role = $1 AND deleted_at IS NULL
            ",
        )
        .bind(role)
        .fetch_one(self.pool)
        .await?;

        Ok(count)
    }
}

fn reject_tombstone(email: &Email) -> Result<(), RepositoryError> {
    if is_tombstone(email.as_str()) {
        return Err(RepositoryError::Invalid(
            "email address is reserved for deleted accounts".to_owned(),
        ));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_reject_tombstone() {
        let tomb = Email::parse("deleted+1700000000000-7@example.com").unwrap();
        assert!(matches!(
            reject_tombstone(&tomb),
            Err(RepositoryError::Invalid(_))
        ));

        let live = Email::parse("jane@example.com").unwrap();
        assert!(reject_tombstone(&live).is_ok());
    }

    #[test]
    fn test_row_conversion_rejects_bad_email() {
        let now = Utc::now();
        let row = UserRow {
            id: 1,
            email: "broken".to_owned(),
            name: "Broken".to_owned(),
            role: Role::Viewer,
            phone: None,
            company: None,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };
        let result: Result<User, _> = row.try_into();
        assert!(matches!(result, Err(RepositoryError::DataCorruption(_))));
    }
}
