//! Tutor LMS courses.

use axum::{Json, Router, extract::State, routing::get};
use tracing::instrument;

use crate::error::AppError;
use crate::middleware::RequireStaff;
use crate::state::AppState;
use crate::wordpress::Course;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/wordpress/courses", get(index))
}

#[instrument(skip_all)]
pub async fn index(
    RequireStaff(_user): RequireStaff,
    State(state): State<AppState>,
) -> Result<Json<Vec<Course>>, AppError> {
    Ok(Json(state.tutor()?.list_courses().await?))
}
