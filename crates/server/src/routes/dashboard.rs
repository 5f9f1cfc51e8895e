//! Dashboard overview.

use axum::{Json, Router, extract::State, routing::get};
use tracing::instrument;

use crate::db::{DashboardRepository, DashboardSummary};
use crate::error::AppError;
use crate::middleware::RequireStaff;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/dashboard", get(show))
}

/// Ticket counts, the caller's open queue and the week ahead.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn show(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
) -> Result<Json<DashboardSummary>, AppError> {
    let summary = DashboardRepository::new(state.pool()).summary(user.id).await?;
    Ok(Json(summary))
}
