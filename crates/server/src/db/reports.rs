//! Ticket reports over a date range.

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use sqlx::PgPool;

use deskops_core::UserId;

use super::RepositoryError;

/// Tickets opened and resolved on one day (UTC).
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct DailyVolume {
    pub day: NaiveDate,
    pub opened: i64,
    pub resolved: i64,
}

/// Resolution count for one assignee.
#[derive(Debug, Clone, Serialize)]
pub struct AssigneeResolutions {
    pub assignee_id: UserId,
    pub assignee_name: String,
    pub resolved: i64,
    /// Mean hours from creation to resolution.
    pub avg_resolution_hours: Option<f64>,
}

#[derive(Debug, sqlx::FromRow)]
struct AssigneeRow {
    assignee_id: i32,
    assignee_name: String,
    resolved: i64,
    avg_resolution_hours: Option<f64>,
}

/// Report for `[from, to]`, both days inclusive.
#[derive(Debug, Clone, Serialize)]
pub struct TicketReport {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub daily: Vec<DailyVolume>,
    pub by_assignee: Vec<AssigneeResolutions>,
    pub total_opened: i64,
    pub total_resolved: i64,
}

pub struct ReportRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ReportRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Build the ticket report. Every day in the range gets a row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Invalid` if `to` is before `from`.
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn tickets(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<TicketReport, RepositoryError> {
        if to < from {
            return Err(RepositoryError::Invalid(
                "report end date is before its start date".to_owned(),
            ));
        }

        let daily = sqlx::query_as::<_, DailyVolume>(
            r"
            SELECT d::date AS day,
                   (SELECT COUNT(*) FROM deskops.ticket t
                    WHERE (t.created_at AT TIME ZONE 'UTC')::date = d::date) AS opened,
                   (SELECT COUNT(*) FROM deskops.ticket t
                    WHERE (t.resolved_at AT TIME ZONE 'UTC')::date = d::date) AS resolved
            FROM generate_series($1::date, $2::date, INTERVAL '1 day') AS d
            ORDER BY day
            ",
        )
        .bind(from)
        .bind(to)
        .fetch_all(self.pool)
        .await?;

        let by_assignee = sqlx::query_as::<_, AssigneeRow>(
            r"
            SELECT t.assignee_id, u.name AS assignee_name,
                   COUNT(*) AS resolved,
                   AVG(EXTRACT(EPOCH FROM (t.resolved_at - t.created_at)) / 3600.0)::float8
                       AS avg_resolution_hours
            FROM deskops.ticket t
            JOIN deskops.app_user u ON u.id = t.assignee_id
            WHERE t.resolved_at IS NOT NULL
              AND (t.resolved_at AT TIME ZONE 'UTC')::date BETWEEN $1 AND $2
            GROUP BY t.assignee_id, u.name
            ORDER BY resolved DESC, u.name
            ",
        )
        .bind(from)
        .bind(to)
        .fetch_all(self.pool)
        .await?
        .into_iter()
        .map(|row| AssigneeResolutions {
            assignee_id: UserId::new(row.assignee_id),
            assignee_name: row.assignee_name,
            resolved: row.resolved,
            avg_resolution_hours: row.avg_resolution_hours,
        })
        .collect();

        let total_opened = daily.iter().map(|d| d.opened).sum();
        let total_resolved = daily.iter().map(|d| d.resolved).sum();

        Ok(TicketReport {
            from,
            to,
            daily,
            by_assignee,
            total_opened,
            total_resolved,
        })
    }
}

/// Default report window: the last 30 days including today.
#[must_use]
pub fn default_range() -> (NaiveDate, NaiveDate) {
    let to = Utc::now().date_naive();
    (to - chrono::Duration::days(29), to)
}
