//! Ticket reports.

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::instrument;

use crate::db::{ReportRepository, TicketReport, default_report_range};
use crate::error::AppError;
use crate::middleware::RequireStaff;
use crate::state::AppState;

/// Longest range a report may cover.
const MAX_REPORT_DAYS: i64 = 366;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/reports/tickets", get(tickets))
}

#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl ReportQuery {
    /// Fill in missing bounds: the last 30 days, or 29 days either side of
    /// the one bound given.
    fn range(&self) -> (NaiveDate, NaiveDate) {
        let (default_from, default_to) = default_report_range();
        let span = default_to - default_from;
        match (self.from, self.to) {
            (Some(from), Some(to)) => (from, to),
            (Some(from), None) => (from, from + span),
            (None, Some(to)) => (to - span, to),
            (None, None) => (default_from, default_to),
        }
    }
}

/// Daily opened/resolved counts and per-assignee resolutions.
#[instrument(skip(_user, state))]
pub async fn tickets(
    RequireStaff(_user): RequireStaff,
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<TicketReport>, AppError> {
    let (from, to) = query.range();
    if from > to {
        return Err(AppError::BadRequest("from must not be after to".to_owned()));
    }
    if (to - from).num_days() > MAX_REPORT_DAYS {
        return Err(AppError::BadRequest(format!(
            "report range may not exceed {MAX_REPORT_DAYS} days"
        )));
    }

    let report = ReportRepository::new(state.pool()).tickets(from, to).await?;
    Ok(Json(report))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_range_defaults_to_thirty_days() {
        let (from, to) = ReportQuery::default().range();
        assert_eq!((to - from).num_days(), 29);
    }

    #[test]
    fn test_range_from_single_bound() {
        let day = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let (from, to) = ReportQuery {
            from: Some(day),
            to: None,
        }
        .range();
        assert_eq!(from, day);
        assert_eq!(to, NaiveDate::from_ymd_opt(2026, 3, 30).unwrap());

        let (from, to) = ReportQuery {
            from: None,
            to: Some(day),
        }
        .range();
        assert_eq!(to, day);
        assert_eq!((to - from).num_days(), 29);
    }
}
