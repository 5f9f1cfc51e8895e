//! JSON API route handlers.
//!
//! # Route Structure
//!
//! ```text
//! # Auth
//! POST /api/auth/login                  - Password login
//! POST /api/auth/logout                 - End the session
//! GET  /api/auth/me                     - Current user
//!
//! # Overview (staff)
//! GET  /api/dashboard                   - Counts, my queue, upcoming events
//! GET  /api/reports/tickets             - Daily volume and resolutions (?from&to)
//!
//! # Tickets (customers see their own)
//! GET  /api/tickets                     - List with filters
//! POST /api/tickets                     - Create
//! GET  /api/tickets/{id}                - Detail
//! PATCH /api/tickets/{id}               - Update status/priority/category
//! DELETE /api/tickets/{id}              - Delete
//! POST /api/tickets/{id}/assign         - Assign or unassign
//! GET  /api/tickets/{id}/messages       - Conversation
//! POST /api/tickets/{id}/messages       - Reply or internal note
//! GET|POST /api/categories, DELETE /api/categories/{id}
//!
//! # Planning (staff)
//! GET|POST /api/agenda, PATCH|DELETE /api/agenda/{id}
//! GET|POST /api/results, PATCH|DELETE /api/results/{id}
//! GET|POST /api/events, PATCH|DELETE /api/events/{id}
//!
//! # Accounts
//! GET|POST /api/users, PATCH|DELETE /api/users/{id}   - Admin only
//! GET|POST /api/customers                             - Staff / writers
//! GET  /api/admin-logs                                - Admin only
//!
//! # WordPress, WooCommerce and Tutor LMS
//! GET|POST /api/wordpress/users, DELETE /api/wordpress/users/{id}
//! POST /api/wordpress/users/suspend | /api/wordpress/users/unsuspend
//! GET  /api/wordpress/courses
//! POST /api/wordpress/enroll            - Batch enrollment
//! GET  /api/wordpress/orders, GET|PUT /api/wordpress/orders/{id}
//!
//! # Google Workspace (admin only)
//! GET|POST /api/google/users, GET|DELETE /api/google/users/{email}
//! POST /api/google/users/{email}/suspend | /unsuspend | /reset-password
//! ```

pub mod admin_logs;
pub mod auth;
pub mod categories;
pub mod customers;
pub mod dashboard;
pub mod events;
pub mod google;
pub mod planning;
pub mod reports;
pub mod tickets;
pub mod users;
pub mod wordpress;

use axum::Router;
use serde::Deserialize;

use crate::db::{AdminLogRepository, NewAdminLog};
use crate::error::AppError;
use crate::state::AppState;

/// Page size when the client doesn't send one.
pub const DEFAULT_PAGE_SIZE: i64 = 50;

/// Largest page a client may ask for.
pub const MAX_PAGE_SIZE: i64 = 200;

/// Build the API router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .merge(dashboard::router())
        .merge(reports::router())
        .merge(tickets::router())
        .merge(categories::router())
        .merge(planning::router())
        .merge(events::router())
        .merge(users::router())
        .merge(customers::router())
        .merge(admin_logs::router())
        .merge(wordpress::router())
        .merge(google::router())
}

/// `?page=&per_page=` query parameters (1-based pages).
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PaginationQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl PaginationQuery {
    /// `(limit, offset)` with the page size clamped to `1..=MAX_PAGE_SIZE`.
    #[must_use]
    pub fn limit_offset(self) -> (i64, i64) {
        let limit = self
            .per_page
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);
        let page = self.page.unwrap_or(1).max(1);
        (limit, (page - 1).saturating_mul(limit))
    }
}

/// Append an audit entry.
///
/// The change it describes has already happened, so a failed write is logged
/// instead of failing the request.
pub(crate) async fn audit(state: &AppState, entry: NewAdminLog) {
    if let Err(e) = AdminLogRepository::new(state.pool()).append(&entry).await {
        tracing::error!(action = %entry.action, "failed to write admin log: {e}");
    }
}

/// Trim a required text field, rejecting blanks.
pub(crate) fn required(value: &str, field: &str) -> Result<String, AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::BadRequest(format!("{field} is required")));
    }
    Ok(value.to_owned())
}

/// Trim an optional text field; blank becomes `None`.
pub(crate) fn optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_offset_defaults() {
        assert_eq!(PaginationQuery::default().limit_offset(), (50, 0));
    }

    #[test]
    fn test_limit_offset_clamps() {
        let query = PaginationQuery {
            page: Some(3),
            per_page: Some(1000),
        };
        assert_eq!(query.limit_offset(), (200, 400));

        let query = PaginationQuery {
            page: Some(0),
            per_page: Some(0),
        };
        assert_eq!(query.limit_offset(), (1, 0));
    }

    #[test]
    fn test_required_and_optional() {
        assert_eq!(required("  hi ", "title").unwrap(), "hi");
        assert!(required("   ", "title").is_err());
        assert_eq!(optional(Some("  ")), None);
        assert_eq!(optional(Some(" x ")), Some("x".to_owned()));
        assert_eq!(optional(None), None);
    }
}
