//! Authentication service.
//!
//! Email and password accounts hashed with Argon2id, plus the
//! [`CredentialVerifier`] that gates payment-vault mutations.

mod error;

pub use error::AuthError;

use std::sync::Arc;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use async_trait::async_trait;
use tracing::instrument;

use cartwright_core::{Email, UserId};

use crate::db::{RepositoryError, Store};
use crate::models::User;

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Checks a freshly supplied password against the stored hash.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    /// Whether `password` is the account password of `user_id`.
    ///
    /// Unknown users and malformed stored hashes verify as `false`.
    async fn verify(&self, user_id: UserId, password: &str) -> Result<bool, RepositoryError>;
}

/// Authentication service.
///
/// Handles user registration and login.
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn Store>,
}

impl AuthService {
    /// Create a new authentication service.
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Register a new user with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    #[instrument(skip(self, password))]
    pub async fn register(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email)?;
        validate_password(password)?;
        let password_hash = hash_password(password)?;

        let user = self
            .store
            .create_user(&email, &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let user = self
            .store
            .get_user_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        let password_hash = self
            .store
            .get_password_hash(user.id)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        Ok(user)
    }
}

/// [`CredentialVerifier`] over the stored Argon2 hashes.
#[derive(Clone)]
pub struct PasswordCredentialVerifier {
    store: Arc<dyn Store>,
}

impl PasswordCredentialVerifier {
    /// Create a verifier reading hashes from `store`.
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl CredentialVerifier for PasswordCredentialVerifier {
    async fn verify(&self, user_id: UserId, password: &str) -> Result<bool, RepositoryError> {
        let Some(hash) = self.store.get_password_hash(user_id).await? else {
            return Ok(false);
        };
        Ok(verify_password(password, &hash).is_ok())
    }
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
