//! WordPress, WooCommerce and Tutor LMS REST clients.
//!
//! All three APIs live under the same site's `wp-json/` root and share one
//! transport ([`RestClient`]); each client owns its namespace and credentials.
//!
//! # API Reference
//!
//! - WordPress: `wp-json/wp/v2`, Basic auth with an application password
//! - WooCommerce: `wp-json/wc/v3`, Basic auth with consumer key/secret
//! - Tutor LMS: `wp-json/tutor/v1`, same credentials as WordPress
//!
//! The [`OrderGateway`], [`EnrollmentGateway`] and [`UserGateway`] traits are
//! what the services depend on, so workflows can run against in-memory fakes.

mod gateway;
mod rest;
mod tutor;
mod types;
mod users;
mod woocommerce;

pub use gateway::{EnrollmentGateway, OrderGateway, UserGateway};
pub use rest::RestClient;
pub use tutor::TutorClient;
pub use types::*;
pub use users::WordPressClient;
pub use woocommerce::WooCommerceClient;

use thiserror::Error;

use crate::error::UPSTREAM_UNAVAILABLE;

/// Errors that can occur when talking to the WordPress site.
#[derive(Debug, Error)]
pub enum WordPressError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} {code} - {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Credentials rejected.
    #[error("Unauthorized: credentials rejected by WordPress")]
    Unauthorized,

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),
}

impl WordPressError {
    /// Text for API clients. Transport and decoding failures carry internal
    /// URLs, so they collapse to [`UPSTREAM_UNAVAILABLE`].
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Http(_) | Self::Parse(_) => UPSTREAM_UNAVAILABLE.to_owned(),
            _ => self.to_string(),
        }
    }

    /// Whether Tutor reported the user as already enrolled.
    #[must_use]
    pub fn is_already_enrolled(&self) -> bool {
        match self {
            Self::Api { code, message, .. } => {
                code.contains("already") || message.to_lowercase().contains("already enrolled")
            }
            _ => false,
        }
    }
}
