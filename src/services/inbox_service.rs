//! Domain service for an account's inbox.

use thiserror::Error;

use crate::db::InboxMessage;
use crate::domain::UserId;

/// Errors specific to inbox operations.
#[derive(Debug, Error)]
pub enum InboxError {
    #[error("User not found")]
    AccountNotFound,

    #[error("User is not accepting messages")]
    NotAcceptingMessages,

    #[error("Message not found or already deleted")]
    MessageNotFound,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for InboxError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for InboxError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(format!("{err:#}"))
    }
}

/// Domain service trait for inboxes.
#[async_trait::async_trait]
pub trait InboxService: Send + Sync {
    /// All messages of the account, newest first. Empty when there are none.
    async fn list(&self, user_id: UserId) -> Result<Vec<InboxMessage>, InboxError>;

    /// Removes one message from the caller's own inbox.
    ///
    /// # Errors
    ///
    /// Returns [`InboxError::MessageNotFound`] if the id is not in this inbox.
    async fn delete(&self, user_id: UserId, message_id: &str) -> Result<(), InboxError>;

    /// Delivers an anonymous message to a verified, accepting account.
    async fn send(&self, username: &str, content: &str) -> Result<InboxMessage, InboxError>;
}
