//! Google Workspace Admin SDK (Directory API) client.
//!
//! Authenticates as a service account with domain-wide delegation: a signed
//! RS256 assertion impersonating `GOOGLE_ADMIN_SUBJECT` is exchanged for an
//! access token, which is cached until shortly before it expires.
//!
//! # API Reference
//!
//! - Token endpoint: `https://oauth2.googleapis.com/token`
//! - Base URL: `https://admin.googleapis.com/admin/directory/v1/`
//! - Scope: `https://www.googleapis.com/auth/admin.directory.user`

mod auth;
mod directory;
mod types;

pub use auth::{AccessToken, ServiceAccountAuth};
pub use directory::DirectoryClient;
pub use directory::temporary_password;
pub use types::*;

use thiserror::Error;

use crate::error::UPSTREAM_UNAVAILABLE;

/// Default OAuth token endpoint.
pub const TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Default Directory API root.
pub const DIRECTORY_API_BASE: &str = "https://admin.googleapis.com/admin/directory/v1/";

/// Scope for user management.
pub const DIRECTORY_USER_SCOPE: &str = "https://www.googleapis.com/auth/admin.directory.user";

/// Errors that can occur when interacting with Google.
#[derive(Debug, Error)]
pub enum GoogleError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Token exchange was refused.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The service account key could not sign the assertion.
    #[error("Signing error: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),
}

impl GoogleError {
    /// Text for API clients. Only Google's own API answers pass through.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Api { .. } | Self::NotFound(_) => self.to_string(),
            Self::Http(_) | Self::Auth(_) | Self::Signing(_) | Self::Parse(_) => {
                UPSTREAM_UNAVAILABLE.to_owned()
            }
        }
    }
}
