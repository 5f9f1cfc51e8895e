//! WordPress maintenance commands.
//!
//! # Usage
//!
//! ```bash
//! deskops-cli wordpress sync-suspended
//! ```
//!
//! # Environment Variables
//!
//! - `DATABASE_URL` - `PostgreSQL` connection string
//! - `WORDPRESS_URL`, `WORDPRESS_USERNAME`, `WORDPRESS_APP_PASSWORD`

use serde_json::json;
use thiserror::Error;

use deskops_server::config::{ConfigError, WordPressConfig};
use deskops_server::db::{AdminLogRepository, NewAdminLog, RepositoryError, WordPressUserRepository};
use deskops_server::wordpress::{WordPressClient, WordPressError, WpUser, WpUserQuery};

use super::{ConnectError, connect};

/// WordPress maximum page size.
const PAGE_SIZE: u32 = 100;

const IMPORT_REASON: &str = "imported: no roles in WordPress";

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("WordPress is not configured (set WORDPRESS_URL, WORDPRESS_USERNAME, WORDPRESS_APP_PASSWORD)")]
    NotConfigured,

    #[error(transparent)]
    WordPress(#[from] WordPressError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Walk every WordPress user and mark the ones with no roles as suspended.
///
/// Rows already marked keep their remembered roles.
///
/// # Errors
///
/// Returns `SyncError` if WordPress or the database can't be reached.
pub async fn sync_suspended() -> Result<(), SyncError> {
    let pool = connect().await?;
    let config = WordPressConfig::from_env()?.ok_or(SyncError::NotConfigured)?;
    let client = WordPressClient::new(&config)?;
    let cache = WordPressUserRepository::new(&pool);

    let mut query = WpUserQuery {
        per_page: PAGE_SIZE,
        ..WpUserQuery::default()
    };
    let mut scanned = 0usize;
    let mut marked = Vec::new();

    loop {
        let page = client.list_users(&query).await?;
        scanned += page.users.len();

        let ids: Vec<_> = page.users.iter().filter(|u| without_roles(u)).map(|u| u.id).collect();
        let known = cache.get_many(&ids).await?;

        for id in ids {
            if known.get(&id).is_some_and(|s| s.suspended) {
                continue;
            }
            cache.mark_suspended(id, &[], Some(IMPORT_REASON)).await?;
            marked.push(id);
        }

        tracing::info!(page = query.page, total_pages = page.total_pages, "page synced");
        if query.page >= page.total_pages {
            break;
        }
        query.page += 1;
    }

    AdminLogRepository::new(&pool)
        .append(
            &NewAdminLog::new(None, "wordpress.users.sync_suspended")
                .details(json!({ "scanned": scanned, "marked": marked })),
        )
        .await?;

    tracing::info!(scanned, marked = marked.len(), "WordPress suspension sync complete");
    Ok(())
}

fn without_roles(user: &WpUser) -> bool {
    user.roles.iter().all(|r| r.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use deskops_core::WpUserId;

    use super::*;

    fn user(roles: &[&str]) -> WpUser {
        WpUser {
            id: WpUserId::new(1),
            username: None,
            name: String::new(),
            email: None,
            roles: roles.iter().map(|r| (*r).to_owned()).collect(),
            registered_date: None,
        }
    }

    #[test]
    fn test_without_roles() {
        assert!(without_roles(&user(&[])));
        assert!(without_roles(&user(&[""])));
        assert!(!without_roles(&user(&["subscriber"])));
    }
}
