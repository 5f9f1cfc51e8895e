//! Authentication extractors.
//!
//! Each extractor reads the [`CurrentUser`] from the session and checks the
//! role. Rejections are JSON: 401 when nobody is logged in, 403 when the role
//! is not enough.
//!
//! # Example
//!
//! ```rust,ignore
//! async fn delete_ticket(
//!     RequireWriter(user): RequireWriter,
//!     Path(id): Path<TicketId>,
//! ) -> Result<StatusCode, AppError> {
//!     // ...
//! }
//! ```

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;
use tower_sessions::Session;

use deskops_core::Role;

use crate::error::set_sentry_user;
use crate::models::{CurrentUser, session_keys};

/// Rejection for the authentication extractors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRejection {
    /// Nobody is logged in.
    Unauthorized,
    /// Logged in, but the role doesn't allow this.
    Forbidden(&'static str),
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "Authentication required" })),
            )
                .into_response(),
            Self::Forbidden(message) => {
                (StatusCode::FORBIDDEN, Json(json!({ "error": message }))).into_response()
            }
        }
    }
}

async fn current_user(parts: &Parts) -> Result<CurrentUser, AuthRejection> {
    // Get the session from extensions (set by SessionManagerLayer)
    let session = parts
        .extensions
        .get::<Session>()
        .ok_or(AuthRejection::Unauthorized)?;

    let user: CurrentUser = session
        .get(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten()
        .ok_or(AuthRejection::Unauthorized)?;

    set_sentry_user(user.id, Some(user.email.as_str()));
    Ok(user)
}

fn require(
    user: CurrentUser,
    allowed: fn(Role) -> bool,
    message: &'static str,
) -> Result<CurrentUser, AuthRejection> {
    if allowed(user.role) {
        Ok(user)
    } else {
        Err(AuthRejection::Forbidden(message))
    }
}

/// Any logged-in user, customers included.
pub struct RequireAuth(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        current_user(parts).await.map(Self)
    }
}

/// Any staff role (not a customer).
pub struct RequireStaff(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireStaff
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = current_user(parts).await?;
        require(user, Role::is_staff, "Staff access required").map(Self)
    }
}

/// A role that can create and edit (not Viewer, not Customer).
pub struct RequireWriter(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireWriter
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = current_user(parts).await?;
        require(user, Role::can_write, "Your role cannot make changes").map(Self)
    }
}

/// Admins only.
pub struct RequireAdmin(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = current_user(parts).await?;
        require(
            user,
            |role| role == Role::Admin,
            "Only admins can access this resource",
        )
        .map(Self)
    }
}

/// Helper to set the current user in the session.
///
/// The session ID is cycled first so a pre-login ID can't be reused.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Helper to end the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use deskops_core::{Email, UserId};

    use super::*;

    fn user(role: Role) -> CurrentUser {
        CurrentUser {
            id: UserId::new(1),
            email: Email::parse("sam@example.com").unwrap(),
            name: "Sam".to_owned(),
            role,
        }
    }

    #[test]
    fn test_require_writer_roles() {
        for role in [Role::Admin, Role::Coordinator, Role::Editor] {
            assert!(require(user(role), Role::can_write, "no").is_ok());
        }
        for role in [Role::Viewer, Role::Customer] {
            assert_eq!(
                require(user(role), Role::can_write, "no").err(),
                Some(AuthRejection::Forbidden("no"))
            );
        }
    }

    #[test]
    fn test_require_staff_excludes_customers() {
        assert!(require(user(Role::Viewer), Role::is_staff, "no").is_ok());
        assert!(require(user(Role::Customer), Role::is_staff, "no").is_err());
    }

    #[test]
    fn test_rejection_status() {
        assert_eq!(
            AuthRejection::Unauthorized.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthRejection::Forbidden("x").into_response().status(),
            StatusCode::FORBIDDEN
        );
    }
}
