//! CLI command implementations.

pub mod migrate;
pub mod user;
pub mod wordpress;

use secrecy::ExposeSecret;
use sqlx::PgPool;

use deskops_server::config::{ConfigError, get_database_url};

/// Connect using `DATABASE_URL` (or `DESKOPS_DATABASE_URL`), loading `.env`
/// first.
async fn connect() -> Result<PgPool, ConnectError> {
    dotenvy::dotenv().ok();
    let database_url = get_database_url()?;

    tracing::info!("Connecting to database...");
    Ok(PgPool::connect(database_url.expose_secret()).await?)
}

#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),
}
