//! Session layer configuration.
//!
//! `PostgreSQL`-backed sessions in `deskops.session`, `SameSite=Strict`,
//! HTTP-only, expiring after 24 hours of inactivity. The cookie is signed with
//! a key derived from `DESKOPS_SESSION_SECRET`.

use argon2::Argon2;
use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use thiserror::Error;
use tower_sessions::cookie::Key;
use tower_sessions::service::SignedCookie;
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::ServerConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "deskops_session";

/// Session expiry time in seconds (24 hours).
const SESSION_EXPIRY_SECONDS: i64 = 24 * 60 * 60;

/// Salt for stretching the session secret into a cookie key.
const SESSION_KEY_SALT: &[u8] = b"deskops.session.cookie-key";

/// Signing keys must be 64 bytes.
const SESSION_KEY_LENGTH: usize = 64;

/// The session layer the application is built with.
pub type SessionLayer = SessionManagerLayer<PostgresStore, SignedCookie>;

/// Errors building the session layer.
#[derive(Debug, Error)]
pub enum SessionLayerError {
    /// The store rejected the schema or table name.
    #[error("invalid session store name: {0}")]
    Store(String),

    /// The secret could not be stretched into a key.
    #[error("session key derivation failed: {0}")]
    KeyDerivation(argon2::Error),
}

/// Derive the cookie signing key from the configured secret.
///
/// The same secret always yields the same key, so sessions survive restarts
/// and work across instances sharing the secret.
///
/// # Errors
///
/// Returns `SessionLayerError::KeyDerivation` if Argon2 rejects the input.
pub fn session_key(secret: &SecretString) -> Result<Key, SessionLayerError> {
    let mut key = [0u8; SESSION_KEY_LENGTH];
    Argon2::default()
        .hash_password_into(secret.expose_secret().as_bytes(), SESSION_KEY_SALT, &mut key)
        .map_err(SessionLayerError::KeyDerivation)?;
    Ok(Key::from(&key))
}

/// Create the session layer with `PostgreSQL` store.
///
/// # Errors
///
/// Returns `SessionLayerError` if the store names are rejected or the signing
/// key can't be derived.
pub fn create_session_layer(
    pool: &PgPool,
    config: &ServerConfig,
) -> Result<SessionLayer, SessionLayerError> {
    // The session table is created by migration in the deskops schema
    let store = PostgresStore::new(pool.clone())
        .with_schema_name("deskops")
        .and_then(|store| store.with_table_name("session"))
        .map_err(SessionLayerError::Store)?;

    Ok(SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.is_https())
        .with_same_site(tower_sessions::cookie::SameSite::Strict)
        .with_http_only(true)
        .with_path("/")
        .with_signed(session_key(&config.session_secret)?))
}
