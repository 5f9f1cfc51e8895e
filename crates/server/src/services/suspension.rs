//! WordPress account suspension.
//!
//! WordPress has no suspended state, so suspending strips every role from the
//! account and unsuspending puts the remembered roles back. Remembering is the
//! caller's job (`deskops.wordpress_user`); this module only talks to
//! WordPress.

use std::collections::HashMap;

use serde::Serialize;
use tracing::instrument;

use deskops_core::WpUserId;

use super::run_in_chunks;
use crate::wordpress::{UserGateway, WordPressError};

/// Role restored when nothing was remembered.
pub const DEFAULT_ROLE: &str = "subscriber";

/// Outcome for one account.
#[derive(Debug, Clone, Serialize)]
pub struct SuspensionResult {
    pub wp_user_id: WpUserId,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Roles removed (suspend) or restored (unsuspend).
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SuspensionOutcome {
    pub results: Vec<SuspensionResult>,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl SuspensionOutcome {
    fn from_results(results: Vec<SuspensionResult>) -> Self {
        let succeeded = results.iter().filter(|r| r.success).count();
        Self {
            total: results.len(),
            failed: results.len() - succeeded,
            succeeded,
            results,
        }
    }

    /// Successful results only.
    pub fn succeeded(&self) -> impl Iterator<Item = &SuspensionResult> {
        self.results.iter().filter(|r| r.success)
    }
}

/// Strip all roles from each account, returning the roles each one had.
#[instrument(skip_all, fields(count = ids.len()))]
pub async fn suspend_users(
    users: &dyn UserGateway,
    ids: &[WpUserId],
    chunk_size: usize,
) -> SuspensionOutcome {
    let results = run_in_chunks(ids, chunk_size, |id| {
        let id = *id;
        async move { result(id, suspend_one(users, id).await) }
    })
    .await;

    let outcome = SuspensionOutcome::from_results(results);
    tracing::info!(
        succeeded = outcome.succeeded,
        failed = outcome.failed,
        "suspension finished"
    );
    outcome
}

async fn suspend_one(users: &dyn UserGateway, id: WpUserId) -> Result<Vec<String>, WordPressError> {
    let user = users.get_user(id).await?;
    users.set_roles(id, &[]).await?;
    Ok(user.roles)
}

/// Restore roles. `remembered` maps each account to the roles it had when it
/// was suspended; accounts missing from it (or with an empty list) get
/// [`DEFAULT_ROLE`].
#[instrument(skip_all, fields(count = ids.len()))]
pub async fn unsuspend_users(
    users: &dyn UserGateway,
    ids: &[WpUserId],
    remembered: &HashMap<WpUserId, Vec<String>>,
    chunk_size: usize,
) -> SuspensionOutcome {
    let results = run_in_chunks(ids, chunk_size, |id| {
        let id = *id;
        let roles = roles_to_restore(remembered.get(&id));
        async move {
            let restored = users.set_roles(id, &roles).await.map(|_| roles);
            result(id, restored)
        }
    })
    .await;

    let outcome = SuspensionOutcome::from_results(results);
    tracing::info!(
        succeeded = outcome.succeeded,
        failed = outcome.failed,
        "unsuspension finished"
    );
    outcome
}

fn roles_to_restore(remembered: Option<&Vec<String>>) -> Vec<String> {
    match remembered {
        Some(roles) if !roles.is_empty() => roles.clone(),
        _ => vec![DEFAULT_ROLE.to_owned()],
    }
}

fn result(wp_user_id: WpUserId, outcome: Result<Vec<String>, WordPressError>) -> SuspensionResult {
    match outcome {
        Ok(roles) => SuspensionResult {
            wp_user_id,
            success: true,
            error: None,
            roles,
        },
        Err(e) => {
            tracing::warn!(%wp_user_id, error = %e, "suspension change failed");
            SuspensionResult {
                wp_user_id,
                success: false,
                error: Some(e.public_message()),
                roles: Vec::new(),
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::wordpress::WpUser;

    /// Accounts keyed by ID; ID 404 doesn't exist.
    #[derive(Default)]
    struct FakeUsers {
        roles: Mutex<HashMap<WpUserId, Vec<String>>>,
    }

    impl FakeUsers {
        fn with(entries: &[(u64, &[&str])]) -> Self {
            let roles = entries
                .iter()
                .map(|(id, roles)| {
                    (
                        WpUserId::new(*id),
                        roles.iter().map(|r| (*r).to_owned()).collect(),
                    )
                })
                .collect();
            Self {
                roles: Mutex::new(roles),
            }
        }

        fn roles_of(&self, id: u64) -> Vec<String> {
            self.roles.lock().unwrap()[&WpUserId::new(id)].clone()
        }
    }

    #[async_trait]
    impl UserGateway for FakeUsers {
        async fn get_user(&self, id: WpUserId) -> Result<WpUser, WordPressError> {
            let roles = self
                .roles
                .lock()
                .unwrap()
                .get(&id)
                .cloned()
                .ok_or_else(|| WordPressError::NotFound(format!("user {id}")))?;
            Ok(WpUser {
                id,
                username: None,
                name: format!("user {id}"),
                email: None,
                roles,
                registered_date: None,
            })
        }

        async fn set_roles(&self, id: WpUserId, roles: &[String]) -> Result<WpUser, WordPressError> {
            {
                let mut map = self.roles.lock().unwrap();
                let entry = map
                    .get_mut(&id)
                    .ok_or_else(|| WordPressError::NotFound(format!("user {id}")))?;
                *entry = roles.to_vec();
            }
            self.get_user(id).await
        }
    }

    #[tokio::test]
    async fn test_suspend_strips_roles_and_reports_previous() {
        let users = FakeUsers::with(&[(1, &["editor"]), (2, &["subscriber", "student"])]);
        let ids = [WpUserId::new(1), WpUserId::new(2)];

        let outcome = suspend_users(&users, &ids, 10).await;

        assert_eq!(outcome.total, 2);
        assert_eq!(outcome.succeeded, 2);
        assert_eq!(outcome.results[1].roles, vec!["subscriber", "student"]);
        assert!(users.roles_of(1).is_empty());
        assert!(users.roles_of(2).is_empty());
    }

    #[tokio::test]
    async fn test_suspend_failure_does_not_stop_batch() {
        let users = FakeUsers::with(&[(1, &["editor"]), (3, &["author"])]);
        let ids = [WpUserId::new(1), WpUserId::new(404), WpUserId::new(3)];

        let outcome = suspend_users(&users, &ids, 2).await;

        assert_eq!(outcome.total, 3);
        assert_eq!(outcome.failed, 1);
        assert!(!outcome.results[1].success);
        assert!(outcome.results[1].error.is_some());
        assert!(outcome.results[2].success);
        assert_eq!(outcome.succeeded().count(), 2);
    }

    #[tokio::test]
    async fn test_unsuspend_restores_remembered_or_default() {
        let users = FakeUsers::with(&[(1, &[]), (2, &[])]);
        let ids = [WpUserId::new(1), WpUserId::new(2)];
        let remembered = HashMap::from([(WpUserId::new(1), vec!["editor".to_owned()])]);

        let outcome = unsuspend_users(&users, &ids, &remembered, 10).await;

        assert_eq!(outcome.succeeded, 2);
        assert_eq!(users.roles_of(1), vec!["editor"]);
        assert_eq!(users.roles_of(2), vec![DEFAULT_ROLE]);
    }

    #[test]
    fn test_roles_to_restore_empty_list_uses_default() {
        assert_eq!(roles_to_restore(Some(&Vec::new())), vec![DEFAULT_ROLE]);
        assert_eq!(roles_to_restore(None), vec![DEFAULT_ROLE]);
    }
}
