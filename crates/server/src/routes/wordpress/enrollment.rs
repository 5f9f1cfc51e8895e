//! Batch course enrollment.

use axum::{Json, Router, extract::State, routing::post};
use serde_json::json;
use tracing::instrument;

use super::require_integrations;
use crate::db::NewAdminLog;
use crate::error::AppError;
use crate::middleware::RequireStaff;
use crate::routes::audit;
use crate::services::{BatchEnrollRequest, BatchOutcome, batch_enroll};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/wordpress/enroll", post(enroll))
}

/// Enroll one user in many courses, or queue one pending order per user for
/// a single course. Per-item failures are reported, not raised.
#[instrument(skip(user, state, body), fields(user_id = %user.id))]
pub async fn enroll(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    Json(body): Json<BatchEnrollRequest>,
) -> Result<Json<BatchOutcome>, AppError> {
    require_integrations(&user)?;
    let orders = state.woocommerce()?;
    let tutor = state.tutor()?;

    let outcome = batch_enroll(
        orders,
        tutor,
        &body,
        state.config().enrollment_batch_size,
    )
    .await?;

    let failures: Vec<_> = outcome
        .items
        .iter()
        .filter(|i| !i.success)
        .map(|i| json!({ "user_id": i.user_id, "course_id": i.course_id, "error": i.error }))
        .collect();
    audit(
        &state,
        NewAdminLog::new(Some(user.id), "wordpress.enroll").details(json!({
            "user_id": body.user_id,
            "course_ids": body.course_ids,
            "user_ids": body.user_ids,
            "course_id": body.course_id,
            "total": outcome.total,
            "succeeded": outcome.succeeded,
            "failed": outcome.failed,
            "failures": failures,
        })),
    )
    .await;

    Ok(Json(outcome))
}
