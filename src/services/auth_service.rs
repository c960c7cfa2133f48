//! Domain service for registration and credential verification.

use thiserror::Error;

use crate::db::User;

/// Errors specific to authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Username '{0}' is already taken")]
    DuplicateUsername(String),

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Too many failed login attempts, retry in {retry_after_secs}s")]
    TooManyAttempts { retry_after_secs: u64 },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for AuthError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<tower_sessions::session::Error> for AuthError {
    fn from(err: tower_sessions::session::Error) -> Self {
        Self::Session(err.to_string())
    }
}

/// Credential store: owns user records and their password hashes.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Hashes the password and persists a new user.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::DuplicateUsername`] if the name is taken; the
    /// existing record is left untouched.
    async fn register(&self, username: &str, password: &str) -> Result<User, AuthError>;

    /// Exact-match lookup.
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AuthError>;

    async fn find_by_id(&self, id: i32) -> Result<Option<User>, AuthError>;

    /// Checks a raw password against the user's stored hash. A wrong password
    /// or a corrupted hash yields `Ok(false)`.
    async fn verify(&self, user: &User, password: &str) -> Result<bool, AuthError>;

    /// Looks up the user and verifies the password in one step, applying the
    /// failed-login throttle.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] for an unknown user or a wrong
    /// password, and [`AuthError::TooManyAttempts`] while locked out.
    async fn authenticate(&self, username: &str, password: &str) -> Result<User, AuthError>;
}
