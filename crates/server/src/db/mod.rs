//! Database operations for DeskOps `PostgreSQL`.
//!
//! # Schema: `deskops`
//!
//! ## Tables
//!
//! - `app_user` - Staff accounts and customers (soft-deleted via tombstone email)
//! - `session` - tower-sessions storage
//! - `category`, `ticket`, `ticket_message` - Ticketing
//! - `agenda_item`, `result_item` - Per-user project tracking
//! - `event` - Calendar entries, optionally linked to a ticket
//! - `admin_log` - Append-only audit trail (JSONB details)
//! - `wordpress_user` - Cached WordPress suspension state
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p deskops-cli -- migrate
//! ```

pub mod admin_log;
pub mod agenda;
pub mod categories;
pub mod dashboard;
pub mod events;
pub mod messages;
pub mod reports;
pub mod results;
pub mod tickets;
pub mod users;
pub mod wordpress_users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use admin_log::{AdminLogFilter, AdminLogRepository, NewAdminLog};
pub use agenda::{AgendaRepository, AgendaUpdate, NewAgendaItem};
pub use categories::CategoryRepository;
pub use dashboard::{DashboardRepository, DashboardSummary};
pub use events::{EventRepository, EventUpdate, NewEvent};
pub use messages::{MessageRepository, NewMessage};
pub use reports::{ReportRepository, TicketReport, default_range as default_report_range};
pub use results::{NewResultItem, ResultRepository, ResultUpdate};
pub use tickets::{NewTicket, TicketFilter, TicketRepository, TicketUpdate};
pub use users::{NewUser, UserFilter, UserRepository, UserUpdate};
pub use wordpress_users::WordPressUserRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// Input rejected before reaching the database.
    #[error("invalid input: {0}")]
    Invalid(String),
}

/// Map unique violations to `Conflict`, everything else to `Database`.
pub(crate) fn conflict_on_unique(e: sqlx::Error, message: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(message.to_owned());
    }
    RepositoryError::Database(e)
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
