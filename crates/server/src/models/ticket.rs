//! Ticket, message and category domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use deskops_core::{CategoryId, TicketId, TicketMessageId, TicketPriority, TicketStatus, UserId};

/// A support ticket with its relations resolved for display.
#[derive(Debug, Clone, Serialize)]
pub struct Ticket {
    pub id: TicketId,
    pub subject: String,
    pub description: String,
    pub status: TicketStatus,
    pub priority: TicketPriority,
    pub category_id: Option<CategoryId>,
    pub category_name: Option<String>,
    pub customer_id: UserId,
    pub customer_name: String,
    pub assignee_id: Option<UserId>,
    pub assignee_name: Option<String>,
    pub created_by: UserId,
    /// Messages visible to the caller (customers do not count internal notes).
    pub message_count: i64,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A reply or internal note on a ticket.
#[derive(Debug, Clone, Serialize)]
pub struct TicketMessage {
    pub id: TicketMessageId,
    pub ticket_id: TicketId,
    pub author_id: UserId,
    pub author_name: String,
    pub body: String,
    /// Staff-only note, hidden from customers.
    pub internal: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}
