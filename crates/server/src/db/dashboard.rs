//! Dashboard aggregates.

use std::collections::BTreeMap;

use chrono::{Duration, Utc};
use serde::Serialize;
use sqlx::PgPool;

use deskops_core::{TicketPriority, TicketStatus, UserId};

use super::tickets::TicketFilter;
use super::{EventRepository, RepositoryError, TicketRepository};
use crate::models::{Event, Ticket};

/// How many tickets each dashboard list shows.
const LIST_LIMIT: i64 = 10;

/// What the staff dashboard shows.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    pub by_status: BTreeMap<String, i64>,
    pub by_priority: BTreeMap<String, i64>,
    pub my_open_tickets: Vec<Ticket>,
    pub unassigned_open_tickets: Vec<Ticket>,
    pub upcoming_events: Vec<Event>,
}

#[derive(Debug, sqlx::FromRow)]
struct StatusCount {
    status: TicketStatus,
    count: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct PriorityCount {
    priority: TicketPriority,
    count: i64,
}

pub struct DashboardRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> DashboardRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Build the dashboard for `user`.
    ///
    /// Every status and priority appears in the counts, zero included.
    /// Priority counts only cover unfinished tickets.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any query fails.
    pub async fn summary(&self, user: UserId) -> Result<DashboardSummary, RepositoryError> {
        let statuses = sqlx::query_as::<_, StatusCount>(
            "SELECT status, COUNT(*) AS count FROM deskops.ticket GROUP BY status",
        )
        .fetch_all(self.pool)
        .await?;

        let priorities = sqlx::query_as::<_, PriorityCount>(
            r"
            SELECT priority, COUNT(*) AS count
            FROM deskops.ticket
            WHERE status NOT IN ('resolved', 'closed')
            GROUP BY priority
            ",
        )
        .fetch_all(self.pool)
        .await?;

        let tickets = TicketRepository::new(self.pool);
        let mine = tickets
            .list(
                &TicketFilter {
                    assignee_id: Some(user),
                    open_only: true,
                    limit: LIST_LIMIT,
                    ..TicketFilter::default()
                },
                true,
            )
            .await?;
        let unassigned = tickets
            .list(
                &TicketFilter {
                    unassigned: true,
                    open_only: true,
                    limit: LIST_LIMIT,
                    ..TicketFilter::default()
                },
                true,
            )
            .await?;

        let now = Utc::now();
        let upcoming_events = EventRepository::new(self.pool)
            .list_range(now, now + Duration::days(7))
            .await?;

        Ok(DashboardSummary {
            by_status: status_counts(&statuses),
            by_priority: priority_counts(&priorities),
            my_open_tickets: mine,
            unassigned_open_tickets: unassigned,
            upcoming_events,
        })
    }
}

fn status_counts(rows: &[StatusCount]) -> BTreeMap<String, i64> {
    let mut counts = TicketStatus::ALL
        .iter()
        .map(|s| (s.as_str().to_owned(), 0))
        .collect::<BTreeMap<_, _>>();
    for row in rows {
        counts.insert(row.status.as_str().to_owned(), row.count);
    }
    counts
}

fn priority_counts(rows: &[PriorityCount]) -> BTreeMap<String, i64> {
    let mut counts = TicketPriority::ALL
        .iter()
        .map(|p| (p.as_str().to_owned(), 0))
        .collect::<BTreeMap<_, _>>();
    for row in rows {
        counts.insert(row.priority.as_str().to_owned(), row.count);
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_counts_include_zeroes() {
        let counts = status_counts(&[StatusCount {
            status: TicketStatus::Waiting,
            count: 4,
        }]);
        assert_eq!(counts.len(), TicketStatus::ALL.len());
        assert_eq!(counts["waiting"], 4);
        assert_eq!(counts["open"], 0);
    }

    #[test]
    fn test_priority_counts_include_zeroes() {
        let counts = priority_counts(&[PriorityCount {
            priority: TicketPriority::Urgent,
            count: 2,
        }]);
        assert_eq!(counts["urgent"], 2);
        assert_eq!(counts["low"], 0);
    }
}
