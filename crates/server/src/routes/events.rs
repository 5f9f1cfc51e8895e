//! Calendar events.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch},
};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tracing::instrument;

use deskops_core::{EventId, TicketId};

use super::{optional, required};
use crate::db::{EventRepository, EventUpdate, NewEvent};
use crate::error::AppError;
use crate::middleware::{RequireStaff, RequireWriter};
use crate::models::{CurrentUser, Event};
use crate::state::AppState;

/// Window listed when the client gives no `to`.
const DEFAULT_WINDOW_DAYS: i64 = 30;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/events", get(index).post(create))
        .route("/api/events/{id}", patch(update).delete(destroy))
}

#[derive(Debug, Default, Deserialize)]
pub struct RangeQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl RangeQuery {
    fn resolve(&self, now: DateTime<Utc>) -> Result<(DateTime<Utc>, DateTime<Utc>), AppError> {
        let from = self.from.unwrap_or(now);
        let to = self
            .to
            .unwrap_or_else(|| from + Duration::days(DEFAULT_WINDOW_DAYS));
        if to < from {
            return Err(AppError::BadRequest("`to` is before `from`".to_owned()));
        }
        Ok((from, to))
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateEventRequest {
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub ticket_id: Option<TicketId>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateEventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub ticket_id: Option<TicketId>,
    #[serde(default)]
    pub unlink_ticket: bool,
}

/// Events overlapping `?from&to` (default: the next 30 days).
#[instrument(skip(_user, state))]
pub async fn index(
    RequireStaff(_user): RequireStaff,
    State(state): State<AppState>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<Vec<Event>>, AppError> {
    let (from, to) = query.resolve(Utc::now())?;
    let events = EventRepository::new(state.pool())
        .list_range(from, to)
        .await?;
    Ok(Json(events))
}

#[instrument(skip(user, state), fields(user_id = %user.id))]
pub async fn create(
    RequireWriter(user): RequireWriter,
    State(state): State<AppState>,
    Json(body): Json<CreateEventRequest>,
) -> Result<(StatusCode, Json<Event>), AppError> {
    let event = NewEvent {
        title: required(&body.title, "title")?,
        description: optional(body.description.as_deref()),
        location: optional(body.location.as_deref()),
        starts_at: body.starts_at,
        ends_at: body.ends_at,
        ticket_id: body.ticket_id,
        created_by: user.id,
    };
    let event = EventRepository::new(state.pool()).create(&event).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

#[instrument(skip(user, state), fields(user_id = %user.id))]
pub async fn update(
    RequireWriter(user): RequireWriter,
    State(state): State<AppState>,
    Path(id): Path<EventId>,
    Json(body): Json<UpdateEventRequest>,
) -> Result<Json<Event>, AppError> {
    let repo = EventRepository::new(state.pool());
    let existing = repo
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("event {id}")))?;
    check_creator(&user, &existing)?;

    let update = EventUpdate {
        title: body
            .title
            .as_deref()
            .map(|t| required(t, "title"))
            .transpose()?,
        description: body.description,
        location: body.location,
        starts_at: body.starts_at,
        ends_at: body.ends_at,
        ticket_id: body.ticket_id,
        unlink_ticket: body.unlink_ticket,
    };
    Ok(Json(repo.update(id, &update).await?))
}

#[instrument(skip(user, state), fields(user_id = %user.id))]
pub async fn destroy(
    RequireWriter(user): RequireWriter,
    State(state): State<AppState>,
    Path(id): Path<EventId>,
) -> Result<StatusCode, AppError> {
    let repo = EventRepository::new(state.pool());
    let existing = repo
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("event {id}")))?;
    check_creator(&user, &existing)?;

    repo.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn check_creator(user: &CurrentUser, event: &Event) -> Result<(), AppError> {
    if event.created_by == user.id || user.role.can_modify_others_rows() {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "You can only change events you created".to_owned(),
        ))
    }
}
