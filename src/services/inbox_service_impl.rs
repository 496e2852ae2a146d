//! `SeaORM` implementation of the `InboxService` trait.

use async_trait::async_trait;
use tracing::info;

use crate::db::{InboxMessage, Store};
use crate::domain::UserId;
use crate::services::inbox_service::{InboxError, InboxService};

pub struct SeaOrmInboxService {
    store: Store,
}

impl SeaOrmInboxService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }
}

#[async_trait]
impl InboxService for SeaOrmInboxService {
    async fn list(&self, user_id: UserId) -> Result<Vec<InboxMessage>, InboxError> {
        if self.store.get_user(user_id).await?.is_none() {
            return Err(InboxError::AccountNotFound);
        }

        Ok(self.store.list_messages(user_id).await?)
    }

    async fn delete(&self, user_id: UserId, message_id: &str) -> Result<(), InboxError> {
        if self.store.remove_message(user_id, message_id).await? {
            info!(user_id = %user_id, message_id, "Message deleted");
            Ok(())
        } else {
            Err(InboxError::MessageNotFound)
        }
    }

    async fn send(&self, username: &str, content: &str) -> Result<InboxMessage, InboxError> {
        let recipient = self
            .store
            .get_verified_user_by_username(username)
            .await?
            .ok_or(InboxError::AccountNotFound)?;

        if !recipient.is_accepting_messages {
            return Err(InboxError::NotAcceptingMessages);
        }

        let message = self.store.add_message(recipient.id, content).await?;
        metrics::counter!("messages_sent_total").increment(1);
        Ok(message)
    }
}
