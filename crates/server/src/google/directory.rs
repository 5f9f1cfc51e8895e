//! Directory API users.

use std::sync::Arc;

use rand::Rng;
use rand::distr::Alphanumeric;
use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::instrument;
use url::Url;

use super::types::GoogleErrorBody;
use super::{
    DIRECTORY_API_BASE, DIRECTORY_USER_SCOPE, DirectoryQuery, DirectoryUser, DirectoryUserPage,
    GoogleError, NewDirectoryUser, ServiceAccountAuth, TOKEN_URI,
};
use crate::config::GoogleConfig;

/// Length of generated temporary passwords.
const TEMP_PASSWORD_LEN: usize = 16;

/// Directory API client for one Workspace customer.
#[derive(Clone)]
pub struct DirectoryClient {
    inner: Arc<DirectoryClientInner>,
}

struct DirectoryClientInner {
    client: reqwest::Client,
    auth: ServiceAccountAuth,
    api_base: Url,
    customer_id: String,
    domain: String,
}

impl DirectoryClient {
    /// Create a client against Google's production endpoints.
    ///
    /// # Errors
    ///
    /// Returns `GoogleError::Signing` if the private key is invalid.
    pub fn new(config: &GoogleConfig) -> Result<Self, GoogleError> {
        let api_base = Url::parse(DIRECTORY_API_BASE)
            .map_err(|e| GoogleError::Parse(format!("invalid API base: {e}")))?;
        Self::with_endpoints(config, TOKEN_URI, api_base)
    }

    /// Create a client with custom token and API endpoints.
    ///
    /// # Errors
    ///
    /// Returns `GoogleError::Signing` if the private key is invalid.
    pub fn with_endpoints(
        config: &GoogleConfig,
        token_uri: &str,
        api_base: Url,
    ) -> Result<Self, GoogleError> {
        let auth = ServiceAccountAuth::new(
            &config.service_account_email,
            &config.private_key,
            &config.admin_subject,
            DIRECTORY_USER_SCOPE,
            token_uri,
        )?;

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            inner: Arc::new(DirectoryClientInner {
                client,
                auth,
                api_base,
                customer_id: config.customer_id.clone(),
                domain: config.domain.to_lowercase(),
            }),
        })
    }

    /// The Workspace primary domain.
    #[must_use]
    pub fn domain(&self) -> &str {
        &self.inner.domain
    }

    /// Whether `email` belongs to the Workspace domain.
    #[must_use]
    pub fn owns_email(&self, email: &str) -> bool {
        email
            .rsplit_once('@')
            .is_some_and(|(_, domain)| domain.eq_ignore_ascii_case(&self.inner.domain))
    }

    /// List users, ordered by email.
    ///
    /// # Errors
    ///
    /// Returns `GoogleError` if the request fails.
    #[instrument(skip(self))]
    pub async fn list_users(&self, query: &DirectoryQuery) -> Result<DirectoryUserPage, GoogleError> {
        let mut params = vec![
            ("customer", self.inner.customer_id.clone()),
            ("orderBy", "email".to_owned()),
            (
                "maxResults",
                query.max_results.unwrap_or(100).clamp(1, 500).to_string(),
            ),
        ];
        if let Some(token) = query.page_token.as_deref().filter(|t| !t.is_empty()) {
            params.push(("pageToken", token.to_owned()));
        }
        if let Some(q) = query.query.as_deref().filter(|q| !q.is_empty()) {
            params.push(("query", q.to_owned()));
        }

        let request = self.request(reqwest::Method::GET, "users").await?.query(&params);
        self.send(request).await
    }

    /// Get a user by primary email or ID.
    ///
    /// # Errors
    ///
    /// Returns `GoogleError::NotFound` if the user doesn't exist.
    #[instrument(skip(self))]
    pub async fn get_user(&self, user_key: &str) -> Result<DirectoryUser, GoogleError> {
        let request = self
            .request(reqwest::Method::GET, &user_path(user_key))
            .await?;
        self.send(request).await
    }

    /// Create a user.
    ///
    /// # Errors
    ///
    /// Returns `GoogleError::Api` if Google rejects the user (e.g. it exists).
    #[instrument(skip(self, user), fields(email = %user.primary_email))]
    pub async fn create_user(&self, user: &NewDirectoryUser) -> Result<DirectoryUser, GoogleError> {
        let request = self.request(reqwest::Method::POST, "users").await?.json(user);
        self.send(request).await
    }

    /// Suspend or restore a user.
    ///
    /// # Errors
    ///
    /// Returns `GoogleError` if the request fails.
    #[instrument(skip(self))]
    pub async fn set_suspended(
        &self,
        user_key: &str,
        suspended: bool,
    ) -> Result<DirectoryUser, GoogleError> {
        self.patch(user_key, &json!({ "suspended": suspended })).await
    }

    /// Set a random temporary password that must be changed at next login.
    ///
    /// Returns the temporary password.
    ///
    /// # Errors
    ///
    /// Returns `GoogleError` if the request fails.
    #[instrument(skip(self))]
    pub async fn reset_password(&self, user_key: &str) -> Result<String, GoogleError> {
        let password = temporary_password();
        let _: DirectoryUser = self
            .patch(
                user_key,
                &json!({ "password": password, "changePasswordAtNextLogin": true }),
            )
            .await?;
        Ok(password)
    }

    /// Delete a user.
    ///
    /// # Errors
    ///
    /// Returns `GoogleError::NotFound` if the user doesn't exist.
    #[instrument(skip(self))]
    pub async fn delete_user(&self, user_key: &str) -> Result<(), GoogleError> {
        let response = self
            .request(reqwest::Method::DELETE, &user_path(user_key))
            .await?
            .send()
            .await?;

        if response.status().is_success() {
            return Ok(());
        }

        Err(self.parse_error(response).await)
    }

    async fn patch<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        user_key: &str,
        body: &B,
    ) -> Result<T, GoogleError> {
        let request = self
            .request(reqwest::Method::PATCH, &user_path(user_key))
            .await?
            .json(body);
        self.send(request).await
    }

    /// Start an authenticated request to `path` under the API base.
    async fn request(
        &self,
        method: reqwest::Method,
        path: &str,
    ) -> Result<reqwest::RequestBuilder, GoogleError> {
        let url = self
            .inner
            .api_base
            .join(path)
            .map_err(|e| GoogleError::Parse(format!("invalid path {path}: {e}")))?;
        let token = self.inner.auth.access_token(&self.inner.client).await?;

        Ok(self
            .inner
            .client
            .request(method, url)
            .bearer_auth(token.expose_secret()))
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, GoogleError> {
        let response = request.send().await?;

        if response.status().is_success() {
            return response
                .json()
                .await
                .map_err(|e| GoogleError::Parse(format!("Failed to parse response: {e}")));
        }

        Err(self.parse_error(response).await)
    }

    async fn parse_error(&self, response: reqwest::Response) -> GoogleError {
        let status = response.status().as_u16();

        if status == 401 {
            // Token revoked or delegation changed; next call re-authenticates
            self.inner.auth.clear().await;
        }

        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        let message = serde_json::from_str::<GoogleErrorBody>(&text)
            .map(|b| b.error.message)
            .unwrap_or(text);

        if status == 404 {
            return GoogleError::NotFound(message);
        }

        GoogleError::Api { status, message }
    }
}

impl std::fmt::Debug for DirectoryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryClient")
            .field("api_base", &self.inner.api_base.as_str())
            .field("customer_id", &self.inner.customer_id)
            .field("domain", &self.inner.domain)
            .finish_non_exhaustive()
    }
}

/// `users/<key>` with the key percent-encoded as a single path segment.
fn user_path(user_key: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(user_key.as_bytes()).collect();
    format!("users/{encoded}")
}

/// Random alphanumeric password for accounts that must change it on first login.
#[must_use]
pub fn temporary_password() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(TEMP_PASSWORD_LEN)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_path_encodes_key() {
        assert_eq!(user_path("jane@example.com"), "users/jane%40example.com");
        assert_eq!(user_path("a/b"), "users/a%2Fb");
    }

    #[test]
    fn test_temporary_password() {
        let a = temporary_password();
        let b = temporary_password();
        assert_eq!(a.len(), TEMP_PASSWORD_LEN);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }
}
