use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::Serialize;
use tracing::debug;

use crate::domain::UserId;
use crate::entities::{messages, prelude::*};

/// Repository for inbox messages
pub struct MessageRepository {
    conn: DatabaseConnection,
}

impl MessageRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Newest first; ties fall back to id so the order is stable.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<InboxMessage>> {
        let rows = Messages::find()
            .filter(messages::Column::UserId.eq(user_id.value()))
            .order_by_desc(messages::Column::CreatedAt)
            .order_by_desc(messages::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list messages")?;

        Ok(rows.into_iter().map(InboxMessage::from).collect())
    }

    pub async fn add(&self, user_id: UserId, content: &str) -> Result<InboxMessage> {
        let active = messages::ActiveModel {
            id: Set(uuid::Uuid::new_v4().to_string()),
            user_id: Set(user_id.value()),
            content: Set(content.to_string()),
            created_at: Set(Utc::now()),
        };

        let model = active
            .insert(&self.conn)
            .await
            .context("Failed to insert message")?;

        debug!("Stored message {} for user {}", model.id, user_id);
        Ok(InboxMessage::from(model))
    }

    /// Deletes one message, scoped to its owner. Returns false if nothing matched.
    pub async fn remove_for_user(&self, user_id: UserId, message_id: &str) -> Result<bool> {
        let result = Messages::delete_many()
            .filter(messages::Column::Id.eq(message_id))
            .filter(messages::Column::UserId.eq(user_id.value()))
            .exec(&self.conn)
            .await
            .context("Failed to delete message")?;

        Ok(result.rows_affected > 0)
    }
}

// ============================================================================
// Data Types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InboxMessage {
    pub id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl From<messages::Model> for InboxMessage {
    fn from(model: messages::Model) -> Self {
        Self {
            id: model.id,
            content: model.content,
            created_at: model.created_at,
        }
    }
}
