//! DeskOps account management (admin only).

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch},
};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use deskops_core::{Email, Role, UserId};

use super::{audit, optional, required};
use crate::db::{NewAdminLog, NewUser, UserFilter, UserRepository, UserUpdate};
use crate::error::AppError;
use crate::middleware::RequireAdmin;
use crate::models::User;
use crate::services::hash_new_password;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/users", get(index).post(create))
        .route("/api/users/{id}", patch(update).delete(destroy))
}

#[derive(Debug, Default, Deserialize)]
pub struct UserQuery {
    pub role: Option<Role>,
    #[serde(default)]
    pub include_deleted: bool,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub name: String,
    pub role: Role,
    /// Required for staff. Customers without one can't log in.
    pub password: Option<SecretString>,
    pub phone: Option<String>,
    pub company: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub name: Option<String>,
    pub role: Option<Role>,
    pub password: Option<SecretString>,
    pub phone: Option<String>,
    pub company: Option<String>,
}

#[instrument(skip(_admin, state))]
pub async fn index(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<Vec<User>>, AppError> {
    let filter = UserFilter {
        role: query.role,
        staff_only: false,
        include_deleted: query.include_deleted,
        search: query.search,
    };
    Ok(Json(UserRepository::new(state.pool()).list(&filter).await?))
}

#[instrument(skip(admin, state, body), fields(admin_id = %admin.id))]
pub async fn create(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(body): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let password_hash = match (&body.password, body.role.is_staff()) {
        (Some(password), _) => Some(hash_new_password(password.expose_secret())?),
        (None, true) => {
            return Err(AppError::BadRequest(
                "staff accounts need a password".to_owned(),
            ));
        }
        (None, false) => None,
    };

    let user = UserRepository::new(state.pool())
        .create(&NewUser {
            email: Email::parse_normalized(&body.email)
                .map_err(|e| AppError::BadRequest(e.to_string()))?,
            name: required(&body.name, "name")?,
            role: body.role,
            password_hash,
            phone: optional(body.phone.as_deref()),
            company: optional(body.company.as_deref()),
        })
        .await?;

    audit(
        &state,
        NewAdminLog::new(Some(admin.id), "user.create")
            .target(user.id.to_string())
            .details(json!({ "email": user.email, "role": user.role })),
    )
    .await;

    Ok((StatusCode::CREATED, Json(user)))
}

#[instrument(skip(admin, state, body), fields(admin_id = %admin.id))]
pub async fn update(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<UserId>,
    Json(body): Json<UpdateUserRequest>,
) -> Result<Json<User>, AppError> {
    let repo = UserRepository::new(state.pool());
    let existing = repo
        .get_by_id(id)
        .await?
        .filter(|u| !u.is_deleted())
        .ok_or_else(|| AppError::NotFound(format!("user {id}")))?;

    if let Some(role) = body.role
        && role != Role::Admin
    {
        ensure_other_admin(&repo, &existing).await?;
    }

    let update = UserUpdate {
        email: body
            .email
            .as_deref()
            .map(Email::parse_normalized)
            .transpose()
            .map_err(|e| AppError::BadRequest(e.to_string()))?,
        name: body
            .name
            .as_deref()
            .map(|n| required(n, "name"))
            .transpose()?,
        role: body.role,
        password_hash: body
            .password
            .as_ref()
            .map(|p| hash_new_password(p.expose_secret()))
            .transpose()?,
        phone: body.phone,
        company: body.company,
    };
    let user = repo.update(id, &update).await?;

    audit(
        &state,
        NewAdminLog::new(Some(admin.id), "user.update")
            .target(id.to_string())
            .details(json!({
                "role": update.role,
                "email_changed": update.email.is_some(),
                "password_changed": update.password_hash.is_some(),
            })),
    )
    .await;

    Ok(Json(user))
}

/// Soft delete: the email becomes a tombstone and the row stays.
#[instrument(skip(admin, state), fields(admin_id = %admin.id))]
pub async fn destroy(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<UserId>,
) -> Result<StatusCode, AppError> {
    if id == admin.id {
        return Err(AppError::BadRequest(
            "you cannot delete your own account".to_owned(),
        ));
    }

    let repo = UserRepository::new(state.pool());
    let existing = repo
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {id}")))?;
    ensure_other_admin(&repo, &existing).await?;

    let deleted = repo.soft_delete(id).await?;

    audit(
        &state,
        NewAdminLog::new(Some(admin.id), "user.delete")
            .target(id.to_string())
            .details(json!({ "email": existing.email, "tombstone": deleted.email })),
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}

/// Refuse to remove or demote the last active admin.
async fn ensure_other_admin(repo: &UserRepository<'_>, user: &User) -> Result<(), AppError> {
    if user.role == Role::Admin
        && !user.is_deleted()
        && repo.count_by_role(Role::Admin).await? <= 1
    {
        return Err(AppError::Conflict(
            "cannot remove the last admin".to_owned(),
        ));
    }
    Ok(())
}
