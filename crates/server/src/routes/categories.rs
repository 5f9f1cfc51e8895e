//! Ticket categories.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
};
use serde::Deserialize;
use tracing::instrument;

use deskops_core::CategoryId;

use super::{audit, optional, required};
use crate::db::{CategoryRepository, NewAdminLog};
use crate::error::AppError;
use crate::middleware::{RequireAuth, RequireStaff, RequireWriter};
use crate::models::Category;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/categories", get(index).post(create))
        .route("/api/categories/{id}", delete(destroy))
}

#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
    pub description: Option<String>,
}

/// Customers need the list to file tickets.
#[instrument(skip_all)]
pub async fn index(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
) -> Result<Json<Vec<Category>>, AppError> {
    Ok(Json(CategoryRepository::new(state.pool()).list().await?))
}

#[instrument(skip(_user, state))]
pub async fn create(
    RequireWriter(_user): RequireWriter,
    State(state): State<AppState>,
    Json(body): Json<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<Category>), AppError> {
    let name = required(&body.name, "name")?;
    let description = optional(body.description.as_deref());

    let category = CategoryRepository::new(state.pool())
        .create(&name, description.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// Refused with 409 while any ticket still uses the category.
#[instrument(skip(user, state), fields(user_id = %user.id))]
pub async fn destroy(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
) -> Result<StatusCode, AppError> {
    if !user.role.can_delete() {
        return Err(AppError::Forbidden(
            "Your role cannot delete categories".to_owned(),
        ));
    }

    CategoryRepository::new(state.pool()).delete(id).await?;
    audit(
        &state,
        NewAdminLog::new(Some(user.id), "category.delete").target(id.to_string()),
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}
