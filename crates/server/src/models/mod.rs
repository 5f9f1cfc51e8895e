//! Domain models for the DeskOps server.
//!
//! Repositories convert their internal row types into these; handlers
//! serialize them straight to JSON.

pub mod admin_log;
pub mod event;
pub mod planning;
pub mod session;
pub mod ticket;
pub mod user;
pub mod wordpress_user;

pub use admin_log::AdminLogEntry;
pub use event::Event;
pub use planning::{AgendaItem, ResultItem};
pub use session::{CurrentUser, keys as session_keys};
pub use ticket::{Category, Ticket, TicketMessage};
pub use user::User;
pub use wordpress_user::WordPressUserState;
