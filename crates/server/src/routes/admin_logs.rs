//! Audit trail (admin only).

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use serde::Deserialize;
use tracing::instrument;

use super::PaginationQuery;
use crate::db::{AdminLogFilter, AdminLogRepository};
use crate::error::AppError;
use crate::middleware::RequireAdmin;
use crate::models::AdminLogEntry;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/admin-logs", get(index))
}

#[derive(Debug, Default, Deserialize)]
pub struct AdminLogQuery {
    /// Exact action, or a prefix ending in `.`.
    pub action: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Newest first.
#[instrument(skip(_admin, state))]
pub async fn index(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Query(query): Query<AdminLogQuery>,
) -> Result<Json<Vec<AdminLogEntry>>, AppError> {
    let (limit, offset) = PaginationQuery {
        page: query.page,
        per_page: query.per_page,
    }
    .limit_offset();

    let filter = AdminLogFilter {
        action: query.action,
        limit,
        offset,
    };
    Ok(Json(AdminLogRepository::new(state.pool()).list(&filter).await?))
}
