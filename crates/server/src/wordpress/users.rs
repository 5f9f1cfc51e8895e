//! WordPress users (`wp/v2/users`).

use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use deskops_core::WpUserId;

use super::{NewWpUser, RestClient, WordPressError, WpUser, WpUserPage, WpUserQuery};
use crate::config::WordPressConfig;

/// WordPress core REST client.
#[derive(Clone, Debug)]
pub struct WordPressClient {
    rest: RestClient,
}

#[derive(Debug, Deserialize)]
struct DeletedUser {
    #[serde(default)]
    deleted: bool,
}

impl WordPressClient {
    /// Create a new WordPress client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &WordPressConfig) -> Result<Self, WordPressError> {
        let rest = RestClient::new(&config.url, "wp/v2", &config.username, &config.app_password)?;
        Ok(Self { rest })
    }

    /// List one page of users.
    ///
    /// # Errors
    ///
    /// Returns `WordPressError` if the request fails.
    #[instrument(skip(self), fields(page = query.page))]
    pub async fn list_users(&self, query: &WpUserQuery) -> Result<WpUserPage, WordPressError> {
        let (users, total_pages) = self.rest.get_paged::<Vec<WpUser>, _>("users", query).await?;

        Ok(WpUserPage {
            users,
            page: query.page,
            total_pages,
        })
    }

    /// Get a single user.
    ///
    /// # Errors
    ///
    /// Returns `WordPressError::NotFound` if the user doesn't exist.
    #[instrument(skip(self))]
    pub async fn get_user(&self, id: WpUserId) -> Result<WpUser, WordPressError> {
        self.rest
            .get(&format!("users/{id}"), &[("context", "edit")])
            .await
    }

    /// Create a user.
    ///
    /// # Errors
    ///
    /// Returns `WordPressError::Api` if WordPress rejects the user (e.g. the
    /// username or email is taken).
    #[instrument(skip(self, user), fields(username = %user.username))]
    pub async fn create_user(&self, user: &NewWpUser) -> Result<WpUser, WordPressError> {
        self.rest.post("users?context=edit", user).await
    }

    /// Replace a user's roles. An empty list leaves the account without any
    /// capabilities.
    ///
    /// # Errors
    ///
    /// Returns `WordPressError` if the request fails.
    #[instrument(skip(self))]
    pub async fn update_roles(
        &self,
        id: WpUserId,
        roles: &[String],
    ) -> Result<WpUser, WordPressError> {
        self.rest
            .post(
                &format!("users/{id}?context=edit"),
                &json!({ "roles": roles }),
            )
            .await
    }

    /// Permanently delete a user, reassigning their content to `reassign`.
    ///
    /// # Errors
    ///
    /// Returns `WordPressError` if the request fails or WordPress refuses.
    #[instrument(skip(self))]
    pub async fn delete_user(
        &self,
        id: WpUserId,
        reassign: Option<WpUserId>,
    ) -> Result<(), WordPressError> {
        let mut query = vec![("force", "true".to_owned())];
        if let Some(reassign) = reassign {
            query.push(("reassign", reassign.to_string()));
        }

        let deleted: DeletedUser = self.rest.delete(&format!("users/{id}"), &query).await?;

        if !deleted.deleted {
            return Err(WordPressError::Api {
                status: 200,
                code: "not_deleted".to_owned(),
                message: format!("WordPress did not delete user {id}"),
            });
        }

        Ok(())
    }
}
