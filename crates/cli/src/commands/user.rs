//! Account management commands.
//!
//! # Usage
//!
//! ```bash
//! # Generated password, printed once
//! deskops-cli user create -e admin@example.com -n "Admin Name" -r admin
//!
//! # Explicit password
//! deskops-cli user create -e sam@example.com -n "Sam" -r editor -p 'long enough'
//! ```

use serde_json::json;
use thiserror::Error;

use deskops_core::{Email, Role, UserId};
use deskops_server::db::{AdminLogRepository, NewAdminLog, NewUser, RepositoryError, UserRepository};
use deskops_server::google::temporary_password;
use deskops_server::services::{AuthError, hash_new_password};

use super::{ConnectError, connect};

#[derive(Debug, Error)]
pub enum UserError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("{0}")]
    InvalidRole(String),

    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    #[error("An account already uses {0}")]
    EmailTaken(String),

    #[error(transparent)]
    Password(#[from] AuthError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Create an account. Without `password`, one is generated and printed.
///
/// # Errors
///
/// Returns `UserError` if the input is invalid, the email is taken, or the
/// database is unreachable.
pub async fn create(
    email: &str,
    name: &str,
    role: &str,
    password: Option<String>,
) -> Result<UserId, UserError> {
    let role: Role = role.parse().map_err(UserError::InvalidRole)?;
    let email =
        Email::parse_normalized(email).map_err(|e| UserError::InvalidEmail(e.to_string()))?;

    let pool = connect().await?;
    let users = UserRepository::new(&pool);
    if users.get_by_email(&email).await?.is_some() {
        return Err(UserError::EmailTaken(email.into_inner()));
    }

    let generated = password.is_none();
    let password = password.unwrap_or_else(temporary_password);
    let password_hash = hash_new_password(&password)?;

    tracing::info!("Creating user: {} ({})", email, role);
    let user = users
        .create(&NewUser {
            email,
            name: name.trim().to_owned(),
            role,
            password_hash: Some(password_hash),
            phone: None,
            company: None,
        })
        .await?;

    AdminLogRepository::new(&pool)
        .append(
            &NewAdminLog::new(None, "user.create")
                .target(user.id.to_string())
                .details(json!({ "email": user.email, "role": user.role, "source": "cli" })),
        )
        .await?;

    tracing::info!(
        "User created successfully! ID: {}, Email: {}, Role: {}",
        user.id,
        user.email,
        user.role
    );

    if generated {
        #[allow(clippy::print_stdout)]
        {
            println!("Generated password (shown once): {password}");
        }
    }

    Ok(user.id)
}
