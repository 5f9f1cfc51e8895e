//! Authentication service.
//!
//! Password login. Staff always have a password; customers only when one was
//! set for them, so most customers never log in.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sqlx::PgPool;

use deskops_core::Email;

use crate::db::UserRepository;
use crate::models::User;

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Authentication service.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: UserRepository::new(pool),
        }
    }

    /// Check an email/password pair.
    ///
    /// Unknown users, soft-deleted users and accounts without a password all
    /// produce the same `InvalidCredentials` error.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::InvalidCredentials` if the pair doesn't match.
    /// Returns `AuthError::Repository` if the lookup fails.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse_normalized(email)?;

        let Some((user, hash)) = self.users.get_login(&email).await? else {
            // Burn comparable time so unknown emails aren't distinguishable
            let _ = hash_password(password);
            return Err(AuthError::InvalidCredentials);
        };

        let hash = hash.ok_or(AuthError::InvalidCredentials)?;
        if user.is_deleted() {
            return Err(AuthError::InvalidCredentials);
        }

        verify_password(password, &hash)?;

        tracing::info!(user_id = %user.id, "user logged in");
        Ok(user)
    }
}

/// Validate and hash a new password.
///
/// # Errors
///
/// Returns `AuthError::WeakPassword` if the password is too short.
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_new_password(password: &str) -> Result<String, AuthError> {
    validate_password(password)?;
    hash_password(password)
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_password_length() {
        assert!(matches!(
            validate_password("short"),
            Err(AuthError::WeakPassword(_))
        ));
        assert!(validate_password("long enough").is_ok());
    }

    #[test]
    fn test_hash_then_verify() {
        let hash = hash_new_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong horse", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_hash_new_password_rejects_weak() {
        assert!(matches!(
            hash_new_password("1234567"),
            Err(AuthError::WeakPassword(_))
        ));
    }

    #[test]
    fn test_verify_garbage_hash() {
        assert!(matches!(
            verify_password("anything", "not-a-hash"),
            Err(AuthError::InvalidCredentials)
        ));
    }
}
