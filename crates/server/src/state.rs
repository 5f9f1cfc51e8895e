//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::ServerConfig;
use crate::error::AppError;
use crate::google::{DirectoryClient, GoogleError};
use crate::wordpress::{TutorClient, WooCommerceClient, WordPressClient, WordPressError};

/// Error building the vendor clients.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("WordPress client: {0}")]
    WordPress(#[from] WordPressError),
    #[error("Google client: {0}")]
    Google(#[from] GoogleError),
}

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. Integrations that are not configured are
/// `None`; their accessors answer with [`AppError::NotConfigured`].
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    pool: PgPool,
    wordpress: Option<WordPressClient>,
    tutor: Option<TutorClient>,
    woocommerce: Option<WooCommerceClient>,
    directory: Option<DirectoryClient>,
}

impl AppState {
    /// Create a new application state, building a client for every configured
    /// integration.
    ///
    /// # Errors
    ///
    /// Returns an error if a configured client can't be built (e.g. an
    /// unparseable service account key).
    pub fn new(config: ServerConfig, pool: PgPool) -> Result<Self, StateError> {
        let wordpress = config
            .wordpress
            .as_ref()
            .map(WordPressClient::new)
            .transpose()?;
        let tutor = config
            .wordpress
            .as_ref()
            .map(TutorClient::new)
            .transpose()?;
        let woocommerce = config
            .woocommerce
            .as_ref()
            .map(WooCommerceClient::new)
            .transpose()?;
        let directory = config
            .google
            .as_ref()
            .map(DirectoryClient::new)
            .transpose()?;

        Ok(Self::from_parts(
            config,
            pool,
            wordpress,
            tutor,
            woocommerce,
            directory,
        ))
    }

    /// Assemble state from prebuilt clients (tests point these at mock servers).
    #[must_use]
    pub fn from_parts(
        config: ServerConfig,
        pool: PgPool,
        wordpress: Option<WordPressClient>,
        tutor: Option<TutorClient>,
        woocommerce: Option<WooCommerceClient>,
        directory: Option<DirectoryClient>,
    ) -> Self {
        tracing::info!(
            wordpress = wordpress.is_some(),
            woocommerce = woocommerce.is_some(),
            google = directory.is_some(),
            "integrations"
        );

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                wordpress,
                tutor,
                woocommerce,
                directory,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// # Errors
    ///
    /// Returns `AppError::NotConfigured` when WordPress isn't configured.
    pub fn wordpress(&self) -> Result<&WordPressClient, AppError> {
        self.inner
            .wordpress
            .as_ref()
            .ok_or(AppError::NotConfigured("WordPress"))
    }

    /// # Errors
    ///
    /// Returns `AppError::NotConfigured` when WordPress isn't configured.
    pub fn tutor(&self) -> Result<&TutorClient, AppError> {
        self.inner
            .tutor
            .as_ref()
            .ok_or(AppError::NotConfigured("WordPress"))
    }

    /// # Errors
    ///
    /// Returns `AppError::NotConfigured` when WooCommerce isn't configured.
    pub fn woocommerce(&self) -> Result<&WooCommerceClient, AppError> {
        self.inner
            .woocommerce
            .as_ref()
            .ok_or(AppError::NotConfigured("WooCommerce"))
    }

    /// # Errors
    ///
    /// Returns `AppError::NotConfigured` when Google isn't configured.
    pub fn directory(&self) -> Result<&DirectoryClient, AppError> {
        self.inner
            .directory
            .as_ref()
            .ok_or(AppError::NotConfigured("Google"))
    }
}
