//! Domain service for signing in and per-account preferences.

use thiserror::Error;

use crate::domain::{SessionUser, UserId};

/// Errors specific to account operations.
#[derive(Debug, Error)]
pub enum AccountError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Please verify your account before signing in")]
    NotVerified,

    #[error("User not found")]
    AccountNotFound,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for AccountError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AccountError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(format!("{err:#}"))
    }
}

/// Domain service trait for accounts.
#[async_trait::async_trait]
pub trait AccountService: Send + Sync {
    /// Checks credentials and returns the identity to store in the session.
    ///
    /// `identifier` is either the email or the username.
    ///
    /// # Errors
    ///
    /// Returns [`AccountError::InvalidCredentials`] for an unknown identifier
    /// or wrong password, and [`AccountError::NotVerified`] for a pending account.
    async fn authenticate(
        &self,
        identifier: &str,
        password: &str,
    ) -> Result<SessionUser, AccountError>;

    /// Reloads the identity of a signed-in account.
    async fn current_identity(&self, user_id: UserId) -> Result<SessionUser, AccountError>;

    /// Stores the flag verbatim and returns the persisted value.
    async fn set_accepting_messages(
        &self,
        user_id: UserId,
        accept: bool,
    ) -> Result<bool, AccountError>;

    async fn is_accepting_messages(&self, user_id: UserId) -> Result<bool, AccountError>;
}
