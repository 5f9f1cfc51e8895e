//! WordPress accounts and suspension.
//!
//! WordPress has no "suspended" flag. Suspending strips every role and the
//! local `wordpress_user` cache remembers them for unsuspension.

use std::collections::HashMap;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;

use deskops_core::WpUserId;

use super::require_integrations;
use crate::db::{NewAdminLog, WordPressUserRepository};
use crate::error::AppError;
use crate::middleware::RequireStaff;
use crate::models::WordPressUserState;
use crate::routes::audit;
use crate::services::auth::MIN_PASSWORD_LENGTH;
use crate::services::{SuspensionOutcome, suspend_users, unsuspend_users};
use crate::state::AppState;
use crate::wordpress::{NewWpUser, WpUser, WpUserQuery};

/// WordPress caps `per_page` at 100.
const MAX_PER_PAGE: u32 = 100;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/wordpress/users", get(index).post(create))
        .route("/api/wordpress/users/suspended", get(suspended))
        .route("/api/wordpress/users/{id}", delete(destroy))
        .route("/api/wordpress/users/suspend", post(suspend))
        .route("/api/wordpress/users/unsuspend", post(unsuspend))
}

// =============================================================================
// Types
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct WpUserListQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub search: Option<String>,
}

/// A WordPress user with its local suspension state merged in.
#[derive(Debug, Serialize)]
pub struct WpUserView {
    #[serde(flatten)]
    pub user: WpUser,
    pub suspended: bool,
    pub suspended_at: Option<DateTime<Utc>>,
    pub suspension_reason: Option<String>,
}

impl WpUserView {
    fn merge(user: WpUser, state: Option<&WordPressUserState>) -> Self {
        let suspended = state.filter(|s| s.suspended);
        Self {
            suspended: suspended.is_some(),
            suspended_at: suspended.and_then(|s| s.suspended_at),
            suspension_reason: suspended.and_then(|s| s.reason.clone()),
            user,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct WpUserViewPage {
    pub users: Vec<WpUserView>,
    pub page: u32,
    pub total_pages: u32,
}

#[derive(Debug, Deserialize)]
pub struct DeleteQuery {
    /// Who inherits the deleted user's posts.
    pub reassign: Option<WpUserId>,
}

#[derive(Debug, Deserialize)]
pub struct SuspendRequest {
    pub user_ids: Vec<WpUserId>,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UnsuspendRequest {
    pub user_ids: Vec<WpUserId>,
}

// =============================================================================
// Handlers
// =============================================================================

/// One page of users, with the suspension cache looked up in one query.
#[instrument(skip(_user, state))]
pub async fn index(
    RequireStaff(_user): RequireStaff,
    State(state): State<AppState>,
    Query(query): Query<WpUserListQuery>,
) -> Result<Json<WpUserViewPage>, AppError> {
    let query = WpUserQuery {
        page: query.page.unwrap_or(1).max(1),
        per_page: query.per_page.unwrap_or(20).clamp(1, MAX_PER_PAGE),
        search: query.search.filter(|s| !s.trim().is_empty()),
        ..WpUserQuery::default()
    };
    let page = state.wordpress()?.list_users(&query).await?;

    let ids: Vec<WpUserId> = page.users.iter().map(|u| u.id).collect();
    let cache = WordPressUserRepository::new(state.pool())
        .get_many(&ids)
        .await?;

    Ok(Json(WpUserViewPage {
        users: page
            .users
            .into_iter()
            .map(|u| {
                let cached = cache.get(&u.id);
                WpUserView::merge(u, cached)
            })
            .collect(),
        page: page.page,
        total_pages: page.total_pages,
    }))
}

/// Every account the cache holds as suspended, from the local table only.
#[instrument(skip(_user, state))]
pub async fn suspended(
    RequireStaff(_user): RequireStaff,
    State(state): State<AppState>,
) -> Result<Json<Vec<WordPressUserState>>, AppError> {
    let rows = WordPressUserRepository::new(state.pool())
        .list_suspended()
        .await?;
    Ok(Json(rows))
}

#[instrument(skip(user, state, body), fields(user_id = %user.id, username = %body.username))]
pub async fn create(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    Json(body): Json<NewWpUser>,
) -> Result<(StatusCode, Json<WpUser>), AppError> {
    require_integrations(&user)?;
    if body.password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AppError::BadRequest(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    let created = state.wordpress()?.create_user(&body).await?;

    audit(
        &state,
        NewAdminLog::new(Some(user.id), "wordpress.users.create")
            .target(created.id.to_string())
            .details(json!({
                "username": body.username,
                "email": body.email,
                "roles": created.roles,
            })),
    )
    .await;

    Ok((StatusCode::CREATED, Json(created)))
}

#[instrument(skip(user, state), fields(user_id = %user.id))]
pub async fn destroy(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<WpUserId>,
    Query(query): Query<DeleteQuery>,
) -> Result<StatusCode, AppError> {
    require_integrations(&user)?;
    if query.reassign == Some(id) {
        return Err(AppError::BadRequest(
            "cannot reassign content to the user being deleted".to_owned(),
        ));
    }

    state.wordpress()?.delete_user(id, query.reassign).await?;

    audit(
        &state,
        NewAdminLog::new(Some(user.id), "wordpress.users.delete")
            .target(id.to_string())
            .details(json!({ "reassign": query.reassign })),
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}

/// Strip roles from each account and remember them locally.
#[instrument(skip(user, state, body), fields(user_id = %user.id, count = body.user_ids.len()))]
pub async fn suspend(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    Json(body): Json<SuspendRequest>,
) -> Result<Json<SuspensionOutcome>, AppError> {
    require_integrations(&user)?;
    require_ids(&body.user_ids)?;
    let reason = body
        .reason
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty());

    let outcome = suspend_users(
        state.wordpress()?,
        &body.user_ids,
        state.config().enrollment_batch_size,
    )
    .await;

    let cache = WordPressUserRepository::new(state.pool());
    for result in outcome.succeeded() {
        if let Err(e) = cache
            .mark_suspended(result.wp_user_id, &result.roles, reason)
            .await
        {
            tracing::error!(
                wp_user_id = %result.wp_user_id,
                roles = ?result.roles,
                "suspended in WordPress but the cache write failed: {e}"
            );
        }
    }

    audit(
        &state,
        NewAdminLog::new(Some(user.id), "wordpress.users.suspend")
            .details(summary(&outcome, reason)),
    )
    .await;

    Ok(Json(outcome))
}

/// Give each account back the roles it had when suspended.
#[instrument(skip(user, state, body), fields(user_id = %user.id, count = body.user_ids.len()))]
pub async fn unsuspend(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    Json(body): Json<UnsuspendRequest>,
) -> Result<Json<SuspensionOutcome>, AppError> {
    require_integrations(&user)?;
    require_ids(&body.user_ids)?;

    let cache = WordPressUserRepository::new(state.pool());
    let remembered: HashMap<WpUserId, Vec<String>> = cache
        .get_many(&body.user_ids)
        .await?
        .into_iter()
        .map(|(id, s)| (id, s.previous_roles))
        .collect();

    let outcome = unsuspend_users(
        state.wordpress()?,
        &body.user_ids,
        &remembered,
        state.config().enrollment_batch_size,
    )
    .await;

    for result in outcome.succeeded() {
        if let Err(e) = cache.mark_unsuspended(result.wp_user_id).await {
            tracing::error!(
                wp_user_id = %result.wp_user_id,
                "unsuspended in WordPress but the cache write failed: {e}"
            );
        }
    }

    audit(
        &state,
        NewAdminLog::new(Some(user.id), "wordpress.users.unsuspend")
            .details(summary(&outcome, None)),
    )
    .await;

    Ok(Json(outcome))
}

fn require_ids(ids: &[WpUserId]) -> Result<(), AppError> {
    if ids.is_empty() {
        return Err(AppError::BadRequest("user_ids must not be empty".to_owned()));
    }
    Ok(())
}

fn summary(outcome: &SuspensionOutcome, reason: Option<&str>) -> serde_json::Value {
    json!({
        "reason": reason,
        "total": outcome.total,
        "succeeded": outcome.succeeded,
        "failed": outcome.failed,
        "results": outcome.results,
    })
}
