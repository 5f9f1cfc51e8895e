//! WordPress, WooCommerce and Tutor LMS handlers.
//!
//! Staff can read; changes need `can_manage_integrations`. Every change is
//! written to the audit log.

pub mod courses;
pub mod enrollment;
pub mod orders;
pub mod users;

use axum::Router;

use crate::error::AppError;
use crate::models::CurrentUser;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(users::router())
        .merge(courses::router())
        .merge(enrollment::router())
        .merge(orders::router())
}

fn require_integrations(user: &CurrentUser) -> Result<(), AppError> {
    if user.role.can_manage_integrations() {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Your role cannot operate integrations".to_owned(),
        ))
    }
}
