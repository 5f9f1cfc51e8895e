//! Agenda and result rows: per-user project tracking.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use deskops_core::{AgendaItemId, ResultItemId, UserId};

#[derive(Debug, Clone, Serialize)]
pub struct AgendaItem {
    pub id: AgendaItemId,
    pub owner_id: UserId,
    pub project: String,
    pub title: String,
    pub notes: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub done: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResultItem {
    pub id: ResultItemId,
    pub owner_id: UserId,
    pub project: String,
    pub title: String,
    pub outcome: Option<String>,
    /// Free-form reporting period, e.g. `2026-Q3`.
    pub period: Option<String>,
    pub done: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
