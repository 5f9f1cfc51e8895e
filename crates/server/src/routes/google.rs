//! Google Workspace directory (admin only).
//!
//! Paths take the user's primary email (or directory ID) as `{email}`.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;

use deskops_core::Email;

use super::{audit, optional, required};
use crate::db::NewAdminLog;
use crate::error::AppError;
use crate::google::{
    DirectoryQuery, DirectoryUser, DirectoryUserPage, NewDirectoryUser, UserName,
    temporary_password,
};
use crate::middleware::RequireStaff;
use crate::models::CurrentUser;
use crate::services::auth::MIN_PASSWORD_LENGTH;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/google/users", get(index).post(create))
        .route("/api/google/users/{email}", get(show).delete(destroy))
        .route("/api/google/users/{email}/suspend", post(suspend))
        .route("/api/google/users/{email}/unsuspend", post(unsuspend))
        .route("/api/google/users/{email}/reset-password", post(reset_password))
}

#[derive(Debug, Deserialize)]
pub struct CreateDirectoryUserRequest {
    pub primary_email: String,
    pub given_name: String,
    pub family_name: String,
    /// Generated when absent, and returned once.
    pub password: Option<SecretString>,
    pub org_unit_path: Option<String>,
}

/// A created user, with the temporary password when one was generated.
#[derive(Debug, Serialize)]
pub struct CreatedDirectoryUser {
    pub user: DirectoryUser,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temporary_password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PasswordReset {
    pub primary_email: String,
    pub temporary_password: String,
}

fn require_directory(user: &CurrentUser) -> Result<(), AppError> {
    if user.role.can_manage_directory() {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Only admins can manage the Google directory".to_owned(),
        ))
    }
}

#[instrument(skip(user, state), fields(user_id = %user.id))]
pub async fn index(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    Query(query): Query<DirectoryQuery>,
) -> Result<Json<DirectoryUserPage>, AppError> {
    require_directory(&user)?;
    Ok(Json(state.directory()?.list_users(&query).await?))
}

#[instrument(skip(user, state), fields(user_id = %user.id))]
pub async fn show(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<DirectoryUser>, AppError> {
    require_directory(&user)?;
    Ok(Json(state.directory()?.get_user(&email).await?))
}

/// Create a user in the Workspace domain. It must change its password at
/// first login.
#[instrument(skip(user, state, body), fields(user_id = %user.id, email = %body.primary_email))]
pub async fn create(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    Json(body): Json<CreateDirectoryUserRequest>,
) -> Result<(StatusCode, Json<CreatedDirectoryUser>), AppError> {
    require_directory(&user)?;
    let directory = state.directory()?;

    let email = Email::parse_normalized(&body.primary_email)
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    if !directory.owns_email(email.as_str()) {
        return Err(AppError::BadRequest(format!(
            "email must belong to {}",
            directory.domain()
        )));
    }

    let (password, generated) = match &body.password {
        Some(password) => {
            let password = password.expose_secret();
            if password.chars().count() < MIN_PASSWORD_LENGTH {
                return Err(AppError::BadRequest(format!(
                    "password must be at least {MIN_PASSWORD_LENGTH} characters"
                )));
            }
            (password.to_owned(), false)
        }
        None => (temporary_password(), true),
    };

    let created = directory
        .create_user(&NewDirectoryUser {
            primary_email: email.into_inner(),
            name: UserName {
                given_name: required(&body.given_name, "given_name")?,
                family_name: required(&body.family_name, "family_name")?,
                full_name: None,
            },
            password: password.clone(),
            change_password_at_next_login: true,
            org_unit_path: optional(body.org_unit_path.as_deref()),
        })
        .await?;

    audit(
        &state,
        NewAdminLog::new(Some(user.id), "google.users.create")
            .target(created.primary_email.clone())
            .details(json!({ "org_unit_path": created.org_unit_path })),
    )
    .await;

    Ok((
        StatusCode::CREATED,
        Json(CreatedDirectoryUser {
            user: created,
            temporary_password: generated.then_some(password),
        }),
    ))
}

#[instrument(skip(user, state), fields(user_id = %user.id))]
pub async fn suspend(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<DirectoryUser>, AppError> {
    set_suspended(&state, &user, &email, true).await.map(Json)
}

#[instrument(skip(user, state), fields(user_id = %user.id))]
pub async fn unsuspend(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<DirectoryUser>, AppError> {
    set_suspended(&state, &user, &email, false).await.map(Json)
}

async fn set_suspended(
    state: &AppState,
    user: &CurrentUser,
    email: &str,
    suspended: bool,
) -> Result<DirectoryUser, AppError> {
    require_directory(user)?;
    let updated = state.directory()?.set_suspended(email, suspended).await?;

    let action = if suspended {
        "google.users.suspend"
    } else {
        "google.users.unsuspend"
    };
    audit(
        state,
        NewAdminLog::new(Some(user.id), action).target(updated.primary_email.clone()),
    )
    .await;

    Ok(updated)
}

/// Set a temporary password, returned once.
#[instrument(skip(user, state), fields(user_id = %user.id))]
pub async fn reset_password(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<PasswordReset>, AppError> {
    require_directory(&user)?;
    let temporary_password = state.directory()?.reset_password(&email).await?;

    audit(
        &state,
        NewAdminLog::new(Some(user.id), "google.users.reset_password").target(email.clone()),
    )
    .await;

    Ok(Json(PasswordReset {
        primary_email: email,
        temporary_password,
    }))
}

#[instrument(skip(user, state), fields(user_id = %user.id))]
pub async fn destroy(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<StatusCode, AppError> {
    require_directory(&user)?;
    state.directory()?.delete_user(&email).await?;

    audit(
        &state,
        NewAdminLog::new(Some(user.id), "google.users.delete").target(email),
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}
