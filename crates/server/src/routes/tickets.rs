//! Ticket, message and assignment handlers.
//!
//! Customers only ever see tickets where they are the customer, and never see
//! internal notes. Someone else's ticket is a 404 for them, not a 403.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use deskops_core::{CategoryId, Role, TicketId, TicketPriority, TicketStatus, UserId};

use super::{PaginationQuery, audit, required};
use crate::db::{
    MessageRepository, NewAdminLog, NewMessage, NewTicket, TicketFilter, TicketRepository,
    TicketUpdate, UserRepository,
};
use crate::error::AppError;
use crate::middleware::{RequireAuth, RequireStaff, RequireWriter};
use crate::models::{CurrentUser, Ticket, TicketMessage};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/tickets", get(index).post(create))
        .route(
            "/api/tickets/{id}",
            get(show).patch(update).delete(destroy),
        )
        .route("/api/tickets/{id}/assign", post(assign))
        .route(
            "/api/tickets/{id}/messages",
            get(list_messages).post(create_message),
        )
}

// =============================================================================
// Request types
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct TicketQuery {
    pub status: Option<TicketStatus>,
    pub priority: Option<TicketPriority>,
    pub category_id: Option<CategoryId>,
    pub assignee_id: Option<UserId>,
    pub customer_id: Option<UserId>,
    #[serde(default)]
    pub unassigned: bool,
    #[serde(default)]
    pub open_only: bool,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl TicketQuery {
    fn into_filter(self, user: &CurrentUser) -> TicketFilter {
        let (limit, offset) = PaginationQuery {
            page: self.page,
            per_page: self.per_page,
        }
        .limit_offset();

        TicketFilter {
            status: self.status,
            priority: self.priority,
            category_id: self.category_id,
            assignee_id: self.assignee_id,
            // Customers are pinned to their own tickets whatever they ask for
            customer_id: if user.role.is_staff() {
                self.customer_id
            } else {
                Some(user.id)
            },
            unassigned: self.unassigned,
            open_only: self.open_only,
            search: self.search,
            limit,
            offset,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateTicketRequest {
    pub subject: String,
    pub description: String,
    #[serde(default)]
    pub priority: TicketPriority,
    pub category_id: Option<CategoryId>,
    /// Required for staff; ignored for customers.
    pub customer_id: Option<UserId>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateTicketRequest {
    pub subject: Option<String>,
    pub description: Option<String>,
    pub status: Option<TicketStatus>,
    pub priority: Option<TicketPriority>,
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub clear_category: bool,
}

#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    /// `null` unassigns.
    pub assignee_id: Option<UserId>,
}

#[derive(Debug, Deserialize)]
pub struct CreateMessageRequest {
    pub body: String,
    #[serde(default)]
    pub internal: bool,
}

// =============================================================================
// Handlers
// =============================================================================

#[instrument(skip(user, state), fields(user_id = %user.id))]
pub async fn index(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Query(query): Query<TicketQuery>,
) -> Result<Json<Vec<Ticket>>, AppError> {
    let filter = query.into_filter(&user);
    let tickets = TicketRepository::new(state.pool())
        .list(&filter, user.role.is_staff())
        .await?;
    Ok(Json(tickets))
}

#[instrument(skip(user, state, body), fields(user_id = %user.id))]
pub async fn create(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Json(body): Json<CreateTicketRequest>,
) -> Result<(StatusCode, Json<Ticket>), AppError> {
    let customer_id = if user.role.is_staff() {
        if !user.role.can_write() {
            return Err(AppError::Forbidden("Your role cannot make changes".to_owned()));
        }
        let id = body
            .customer_id
            .ok_or_else(|| AppError::BadRequest("customer_id is required".to_owned()))?;
        ensure_customer(&state, id).await?;
        id
    } else {
        user.id
    };

    let ticket = TicketRepository::new(state.pool())
        .create(&NewTicket {
            subject: required(&body.subject, "subject")?,
            description: required(&body.description, "description")?,
            priority: body.priority,
            category_id: body.category_id,
            customer_id,
            created_by: user.id,
        })
        .await?;

    tracing::info!(ticket_id = %ticket.id, "ticket created");
    Ok((StatusCode::CREATED, Json(ticket)))
}

#[instrument(skip(user, state), fields(user_id = %user.id))]
pub async fn show(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<TicketId>,
) -> Result<Json<Ticket>, AppError> {
    visible_ticket(&state, &user, id).await.map(Json)
}

#[instrument(skip(_user, state, body))]
pub async fn update(
    RequireWriter(_user): RequireWriter,
    State(state): State<AppState>,
    Path(id): Path<TicketId>,
    Json(body): Json<UpdateTicketRequest>,
) -> Result<Json<Ticket>, AppError> {
    let update = TicketUpdate {
        subject: body
            .subject
            .as_deref()
            .map(|s| required(s, "subject"))
            .transpose()?,
        description: body
            .description
            .as_deref()
            .map(|s| required(s, "description"))
            .transpose()?,
        status: body.status,
        priority: body.priority,
        category_id: body.category_id,
        clear_category: body.clear_category,
    };

    let ticket = TicketRepository::new(state.pool()).update(id, &update).await?;
    Ok(Json(ticket))
}

#[instrument(skip(user, state), fields(user_id = %user.id))]
pub async fn destroy(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<TicketId>,
) -> Result<StatusCode, AppError> {
    if !user.role.can_delete() {
        return Err(AppError::Forbidden("Your role cannot delete tickets".to_owned()));
    }

    let repo = TicketRepository::new(state.pool());
    let ticket = repo
        .get_by_id(id, true)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("ticket {id}")))?;
    repo.delete(id).await?;

    audit(
        &state,
        NewAdminLog::new(Some(user.id), "ticket.delete")
            .target(id.to_string())
            .details(json!({ "subject": ticket.subject, "customer_id": ticket.customer_id })),
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(user, state, body), fields(user_id = %user.id))]
pub async fn assign(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<TicketId>,
    Json(body): Json<AssignRequest>,
) -> Result<Json<Ticket>, AppError> {
    if !user.role.can_assign_tickets() {
        return Err(AppError::Forbidden("Your role cannot assign tickets".to_owned()));
    }

    if let Some(assignee) = body.assignee_id {
        let staff = UserRepository::new(state.pool())
            .get_by_id(assignee)
            .await?
            .filter(|u| u.role.is_staff() && !u.is_deleted());
        if staff.is_none() {
            return Err(AppError::BadRequest(
                "tickets can only be assigned to active staff".to_owned(),
            ));
        }
    }

    let ticket = TicketRepository::new(state.pool())
        .assign(id, body.assignee_id)
        .await?;

    audit(
        &state,
        NewAdminLog::new(Some(user.id), "ticket.assign")
            .target(id.to_string())
            .details(json!({ "assignee_id": body.assignee_id })),
    )
    .await;

    Ok(Json(ticket))
}

#[instrument(skip(user, state), fields(user_id = %user.id))]
pub async fn list_messages(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<TicketId>,
) -> Result<Json<Vec<TicketMessage>>, AppError> {
    visible_ticket(&state, &user, id).await?;
    let messages = MessageRepository::new(state.pool())
        .list(id, user.role.is_staff())
        .await?;
    Ok(Json(messages))
}

#[instrument(skip(user, state, body), fields(user_id = %user.id))]
pub async fn create_message(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<TicketId>,
    Json(body): Json<CreateMessageRequest>,
) -> Result<(StatusCode, Json<TicketMessage>), AppError> {
    let ticket = visible_ticket(&state, &user, id).await?;

    if user.role.is_staff() && !user.role.can_write() {
        return Err(AppError::Forbidden("Your role cannot make changes".to_owned()));
    }
    if body.internal && !user.role.is_staff() {
        return Err(AppError::Forbidden(
            "Only staff can add internal notes".to_owned(),
        ));
    }

    let message = NewMessage {
        ticket_id: id,
        author_id: user.id,
        body: required(&body.body, "body")?,
        internal: body.internal,
    };
    let (message, reopened) = MessageRepository::new(state.pool())
        .create(&message, ticket.customer_id == user.id)
        .await?;

    if reopened {
        tracing::info!(ticket_id = %id, "customer reply reopened ticket");
    }
    Ok((StatusCode::CREATED, Json(message)))
}

// =============================================================================
// Helpers
// =============================================================================

/// Fetch a ticket the caller may see.
async fn visible_ticket(
    state: &AppState,
    user: &CurrentUser,
    id: TicketId,
) -> Result<Ticket, AppError> {
    TicketRepository::new(state.pool())
        .get_by_id(id, user.role.is_staff())
        .await?
        .filter(|t| can_see(user, t))
        .ok_or_else(|| AppError::NotFound(format!("ticket {id}")))
}

fn can_see(user: &CurrentUser, ticket: &Ticket) -> bool {
    user.role.is_staff() || ticket.customer_id == user.id
}

async fn ensure_customer(state: &AppState, id: UserId) -> Result<(), AppError> {
    let customer = UserRepository::new(state.pool())
        .get_by_id(id)
        .await?
        .filter(|u| u.role == Role::Customer && !u.is_deleted());
    if customer.is_none() {
        return Err(AppError::BadRequest(format!("user {id} is not an active customer")));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use deskops_core::Email;

    use super::*;

    fn user(id: i32, role: Role) -> CurrentUser {
        CurrentUser {
            id: UserId::new(id),
            email: Email::parse("someone@example.com").unwrap(),
            name: "Someone".to_owned(),
            role,
        }
    }

    fn ticket(customer: i32) -> Ticket {
        let now = Utc::now();
        Ticket {
            id: TicketId::new(1),
            subject: "Printer".to_owned(),
            description: "Jammed".to_owned(),
            status: TicketStatus::Open,
            priority: TicketPriority::Medium,
            category_id: None,
            category_name: None,
            customer_id: UserId::new(customer),
            customer_name: "Customer".to_owned(),
            assignee_id: None,
            assignee_name: None,
            created_by: UserId::new(customer),
            message_count: 0,
            resolved_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_customer_sees_only_own_tickets() {
        assert!(can_see(&user(7, Role::Customer), &ticket(7)));
        assert!(!can_see(&user(8, Role::Customer), &ticket(7)));
        assert!(can_see(&user(1, Role::Viewer), &ticket(7)));
    }

    #[test]
    fn test_customer_filter_is_pinned() {
        let query = TicketQuery {
            customer_id: Some(UserId::new(99)),
            ..TicketQuery::default()
        };
        let filter = query.into_filter(&user(7, Role::Customer));
        assert_eq!(filter.customer_id, Some(UserId::new(7)));

        let query = TicketQuery {
            customer_id: Some(UserId::new(99)),
            ..TicketQuery::default()
        };
        let filter = query.into_filter(&user(1, Role::Editor));
        assert_eq!(filter.customer_id, Some(UserId::new(99)));
    }
}
