//! HTTP middleware and extractors.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request span with status and latency)
//! 3. Session layer (tower-sessions with `PostgreSQL` store)
//!
//! Authorization is done per handler with the extractors in [`auth`].

pub mod auth;
pub mod session;

pub use auth::{
    AuthRejection, RequireAdmin, RequireAuth, RequireStaff, RequireWriter, clear_current_user,
    set_current_user,
};
pub use session::{
    SESSION_COOKIE_NAME, SessionLayer, SessionLayerError, create_session_layer, session_key,
};
