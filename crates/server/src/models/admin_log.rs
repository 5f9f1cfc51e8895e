//! Audit trail entries.

use chrono::{DateTime, Utc};
use serde::Serialize;

use deskops_core::{AdminLogId, UserId};

/// One append-only audit record.
#[derive(Debug, Clone, Serialize)]
pub struct AdminLogEntry {
    pub id: AdminLogId,
    pub actor_id: Option<UserId>,
    pub actor_name: Option<String>,
    pub action: String,
    pub target: Option<String>,
    pub details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}
