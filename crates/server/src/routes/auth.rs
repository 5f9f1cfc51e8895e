//! Login, logout and the current user.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use serde::Deserialize;
use secrecy::{ExposeSecret, SecretString};
use tower_sessions::Session;
use tracing::instrument;

use crate::db::UserRepository;
use crate::error::{AppError, clear_sentry_user};
use crate::middleware::{RequireAuth, clear_current_user, set_current_user};
use crate::models::{CurrentUser, User};
use crate::services::AuthService;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/me", get(me))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: SecretString,
}

/// Check credentials and start a session.
#[instrument(skip(state, session, body), fields(email = %body.email))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<LoginRequest>,
) -> Result<Json<User>, AppError> {
    let user = AuthService::new(state.pool())
        .login(&body.email, body.password.expose_secret())
        .await?;

    set_current_user(&session, &CurrentUser::from(&user))
        .await
        .map_err(|e| AppError::Internal(format!("session error: {e}")))?;

    Ok(Json(user))
}

/// End the session. Succeeds even when nobody was logged in.
#[instrument(skip_all)]
pub async fn logout(session: Session) -> Result<StatusCode, AppError> {
    clear_current_user(&session)
        .await
        .map_err(|e| AppError::Internal(format!("session error: {e}")))?;
    clear_sentry_user();
    Ok(StatusCode::NO_CONTENT)
}

/// The logged-in user, read fresh from the database.
///
/// A user deleted since login gets a 401 and their session is dropped.
#[instrument(skip_all, fields(user_id = %current.id))]
pub async fn me(
    RequireAuth(current): RequireAuth,
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<User>, AppError> {
    let user = UserRepository::new(state.pool())
        .get_by_id(current.id)
        .await?
        .filter(|u| !u.is_deleted());

    match user {
        Some(user) => Ok(Json(user)),
        None => {
            let _ = clear_current_user(&session).await;
            Err(AppError::Unauthorized("account no longer exists".to_owned()))
        }
    }
}
