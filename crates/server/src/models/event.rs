//! Calendar events.

use chrono::{DateTime, Utc};
use serde::Serialize;

use deskops_core::{EventId, TicketId, UserId};

/// A calendar entry, optionally linked to a ticket.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    pub id: EventId,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub ticket_id: Option<TicketId>,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
