//! Agenda and result rows.
//!
//! Every staff member can read every row. Editors change only the rows they
//! own; Admins and Coordinators change anyone's.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch},
};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::instrument;

use deskops_core::{AgendaItemId, ResultItemId, UserId};

use super::{optional, required};
use crate::db::{
    AgendaRepository, AgendaUpdate, NewAgendaItem, NewResultItem, ResultRepository, ResultUpdate,
};
use crate::error::AppError;
use crate::middleware::{RequireStaff, RequireWriter};
use crate::models::{AgendaItem, CurrentUser, ResultItem};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/agenda", get(list_agenda).post(create_agenda))
        .route(
            "/api/agenda/{id}",
            patch(update_agenda).delete(delete_agenda),
        )
        .route("/api/results", get(list_results).post(create_result))
        .route(
            "/api/results/{id}",
            patch(update_result).delete(delete_result),
        )
}

/// `?owner_id=` for one person, `?all=true` for everyone, otherwise the caller.
#[derive(Debug, Default, Deserialize)]
pub struct OwnerQuery {
    pub owner_id: Option<UserId>,
    #[serde(default)]
    pub all: bool,
}

impl OwnerQuery {
    fn owner(&self, user: &CurrentUser) -> Option<UserId> {
        if self.all {
            None
        } else {
            Some(self.owner_id.unwrap_or(user.id))
        }
    }
}

fn check_owner(user: &CurrentUser, owner: UserId) -> Result<(), AppError> {
    if owner == user.id || user.role.can_modify_others_rows() {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "You can only change your own rows".to_owned(),
        ))
    }
}

/// Owner for a new row: the caller, unless someone allowed to act for others
/// named one.
fn new_owner(user: &CurrentUser, requested: Option<UserId>) -> Result<UserId, AppError> {
    let owner = requested.unwrap_or(user.id);
    check_owner(user, owner)?;
    Ok(owner)
}

// =============================================================================
// Agenda
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateAgendaRequest {
    pub owner_id: Option<UserId>,
    pub project: String,
    pub title: String,
    pub notes: Option<String>,
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateAgendaRequest {
    pub project: Option<String>,
    pub title: Option<String>,
    pub notes: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub done: Option<bool>,
}

#[instrument(skip(user, state), fields(user_id = %user.id))]
pub async fn list_agenda(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    Query(query): Query<OwnerQuery>,
) -> Result<Json<Vec<AgendaItem>>, AppError> {
    let items = AgendaRepository::new(state.pool())
        .list(query.owner(&user))
        .await?;
    Ok(Json(items))
}

#[instrument(skip(user, state), fields(user_id = %user.id))]
pub async fn create_agenda(
    RequireWriter(user): RequireWriter,
    State(state): State<AppState>,
    Json(body): Json<CreateAgendaRequest>,
) -> Result<(StatusCode, Json<AgendaItem>), AppError> {
    let item = NewAgendaItem {
        owner_id: new_owner(&user, body.owner_id)?,
        project: required(&body.project, "project")?,
        title: required(&body.title, "title")?,
        notes: optional(body.notes.as_deref()),
        due_date: body.due_date,
    };
    let item = AgendaRepository::new(state.pool()).create(&item).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

#[instrument(skip(user, state), fields(user_id = %user.id))]
pub async fn update_agenda(
    RequireWriter(user): RequireWriter,
    State(state): State<AppState>,
    Path(id): Path<AgendaItemId>,
    Json(body): Json<UpdateAgendaRequest>,
) -> Result<Json<AgendaItem>, AppError> {
    let repo = AgendaRepository::new(state.pool());
    let existing = repo
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("agenda item {id}")))?;
    check_owner(&user, existing.owner_id)?;

    let update = AgendaUpdate {
        project: body
            .project
            .as_deref()
            .map(|p| required(p, "project"))
            .transpose()?,
        title: body
            .title
            .as_deref()
            .map(|t| required(t, "title"))
            .transpose()?,
        notes: body.notes,
        due_date: body.due_date,
        done: body.done,
    };
    Ok(Json(repo.update(id, &update).await?))
}

#[instrument(skip(user, state), fields(user_id = %user.id))]
pub async fn delete_agenda(
    RequireWriter(user): RequireWriter,
    State(state): State<AppState>,
    Path(id): Path<AgendaItemId>,
) -> Result<StatusCode, AppError> {
    let repo = AgendaRepository::new(state.pool());
    let existing = repo
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("agenda item {id}")))?;
    check_owner(&user, existing.owner_id)?;

    repo.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Results
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateResultRequest {
    pub owner_id: Option<UserId>,
    pub project: String,
    pub title: String,
    pub outcome: Option<String>,
    pub period: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateResultRequest {
    pub project: Option<String>,
    pub title: Option<String>,
    pub outcome: Option<String>,
    pub period: Option<String>,
    pub done: Option<bool>,
}

#[instrument(skip(user, state), fields(user_id = %user.id))]
pub async fn list_results(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    Query(query): Query<OwnerQuery>,
) -> Result<Json<Vec<ResultItem>>, AppError> {
    let items = ResultRepository::new(state.pool())
        .list(query.owner(&user))
        .await?;
    Ok(Json(items))
}

#[instrument(skip(user, state), fields(user_id = %user.id))]
pub async fn create_result(
    RequireWriter(user): RequireWriter,
    State(state): State<AppState>,
    Json(body): Json<CreateResultRequest>,
) -> Result<(StatusCode, Json<ResultItem>), AppError> {
    let item = NewResultItem {
        owner_id: new_owner(&user, body.owner_id)?,
        project: required(&body.project, "project")?,
        title: required(&body.title, "title")?,
        outcome: optional(body.outcome.as_deref()),
        period: optional(body.period.as_deref()),
    };
    let item = ResultRepository::new(state.pool()).create(&item).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

#[instrument(skip(user, state), fields(user_id = %user.id))]
pub async fn update_result(
    RequireWriter(user): RequireWriter,
    State(state): State<AppState>,
    Path(id): Path<ResultItemId>,
    Json(body): Json<UpdateResultRequest>,
) -> Result<Json<ResultItem>, AppError> {
    let repo = ResultRepository::new(state.pool());
    let existing = repo
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("result {id}")))?;
    check_owner(&user, existing.owner_id)?;

    let update = ResultUpdate {
        project: body
            .project
            .as_deref()
            .map(|p| required(p, "project"))
            .transpose()?,
        title: body
            .title
            .as_deref()
            .map(|t| required(t, "title"))
            .transpose()?,
        outcome: body.outcome,
        period: body.period,
        done: body.done,
    };
    Ok(Json(repo.update(id, &update).await?))
}

#[instrument(skip(user, state), fields(user_id = %user.id))]
pub async fn delete_result(
    RequireWriter(user): RequireWriter,
    State(state): State<AppState>,
    Path(id): Path<ResultItemId>,
) -> Result<StatusCode, AppError> {
    let repo = ResultRepository::new(state.pool());
    let existing = repo
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("result {id}")))?;
    check_owner(&user, existing.owner_id)?;

    repo.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
