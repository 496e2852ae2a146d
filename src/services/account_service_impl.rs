//! `SeaORM` implementation of the `AccountService` trait.

use async_trait::async_trait;
use tracing::{debug, info};

use crate::db::Store;
use crate::db::repositories::user::verify_password_blocking;
use crate::domain::{SessionUser, UserId};
use crate::services::account_service::{AccountError, AccountService};

pub struct SeaOrmAccountService {
    store: Store,
}

impl SeaOrmAccountService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }
}

#[async_trait]
impl AccountService for SeaOrmAccountService {
    async fn authenticate(
        &self,
        identifier: &str,
        password: &str,
    ) -> Result<SessionUser, AccountError> {
        let Some((account, password_hash)) = self.store.get_user_with_password(identifier).await?
        else {
            debug!("Sign-in for unknown identifier");
            return Err(AccountError::InvalidCredentials);
        };

        if !account.is_verified {
            return Err(AccountError::NotVerified);
        }

        if !verify_password_blocking(password, password_hash).await? {
            return Err(AccountError::InvalidCredentials);
        }

        info!(user_id = %account.id, "User signed in");
        Ok(account.session_user())
    }

    async fn current_identity(&self, user_id: UserId) -> Result<SessionUser, AccountError> {
        self.store
            .get_user(user_id)
            .await?
            .map(|a| a.session_user())
            .ok_or(AccountError::AccountNotFound)
    }

    async fn set_accepting_messages(
        &self,
        user_id: UserId,
        accept: bool,
    ) -> Result<bool, AccountError> {
        let stored = self
            .store
            .set_accepting_messages(user_id, accept)
            .await?
            .ok_or(AccountError::AccountNotFound)?;

        info!(user_id = %user_id, accepting = stored, "Updated message acceptance");
        Ok(stored)
    }

    async fn is_accepting_messages(&self, user_id: UserId) -> Result<bool, AccountError> {
        self.store
            .get_user(user_id)
            .await?
            .map(|a| a.is_accepting_messages)
            .ok_or(AccountError::AccountNotFound)
    }
}
