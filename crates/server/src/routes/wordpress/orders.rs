//! WooCommerce orders and status reconciliation.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;

use deskops_core::{CourseId, OrderStatus, WcOrderId};

use super::require_integrations;
use crate::db::NewAdminLog;
use crate::error::AppError;
use crate::middleware::RequireStaff;
use crate::routes::audit;
use crate::services::{ReconcileOutcome, pending_enrollment, reconcile_order_status};
use crate::state::AppState;
use crate::wordpress::{Order, OrderQuery};

/// WooCommerce caps `per_page` at 100.
const MAX_PER_PAGE: u32 = 100;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/wordpress/orders", get(index))
        .route("/api/wordpress/orders/{id}", get(show).put(update_status))
}

#[derive(Debug, Default, Deserialize)]
pub struct OrderListQuery {
    pub status: Option<OrderStatus>,
    pub customer: Option<u64>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct OrderPage {
    pub orders: Vec<Order>,
    pub page: u32,
    pub total_pages: u32,
}

/// An order with its pending enrollment decoded.
#[derive(Debug, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub pending_courses: Option<Vec<CourseId>>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: OrderStatus,
}

#[instrument(skip(_user, state))]
pub async fn index(
    RequireStaff(_user): RequireStaff,
    State(state): State<AppState>,
    Query(query): Query<OrderListQuery>,
) -> Result<Json<OrderPage>, AppError> {
    let query = OrderQuery {
        status: query.status,
        customer: query.customer,
        page: query.page.unwrap_or(1).max(1),
        per_page: query.per_page.unwrap_or(20).clamp(1, MAX_PER_PAGE),
    };
    let (orders, total_pages) = state.woocommerce()?.list_orders(&query).await?;

    Ok(Json(OrderPage {
        orders,
        page: query.page,
        total_pages,
    }))
}

#[instrument(skip(_user, state))]
pub async fn show(
    RequireStaff(_user): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<WcOrderId>,
) -> Result<Json<OrderDetail>, AppError> {
    let order = state.woocommerce()?.get_order(id).await?;
    Ok(Json(OrderDetail {
        pending_courses: pending_enrollment(&order),
        order,
    }))
}

/// Change the status; completing an order with pending enrollment enrolls
/// its customer. Enrollment problems come back in `warning`.
#[instrument(skip(user, state), fields(user_id = %user.id))]
pub async fn update_status(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<WcOrderId>,
    Json(body): Json<StatusRequest>,
) -> Result<Json<ReconcileOutcome>, AppError> {
    require_integrations(&user)?;
    let orders = state.woocommerce()?;
    let tutor = state.tutor()?;

    let outcome = reconcile_order_status(orders, tutor, id, &body.status).await?;

    audit(
        &state,
        NewAdminLog::new(Some(user.id), "woocommerce.order.status")
            .target(id.to_string())
            .details(json!({
                "status": body.status,
                "enrolled": outcome.enrolled,
                "failed": outcome.failed,
                "warning": outcome.warning,
            })),
    )
    .await;

    Ok(Json(outcome))
}
