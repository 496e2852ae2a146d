use anyhow::{Context, Result};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, sea_query::Query,
};
use tokio::task;

use crate::config::SecurityConfig;
use crate::domain::{SessionUser, UserId};
use crate::entities::{prelude::*, users};

/// Account data returned from the repository (without the password hash)
#[derive(Debug, Clone)]
pub struct Account {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub is_verified: bool,
    pub verify_code: String,
    pub verify_code_expiry: DateTime<Utc>,
    pub is_accepting_messages: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<users::Model> for Account {
    fn from(model: users::Model) -> Self {
        Self {
            id: UserId::new(model.id),
            username: model.username,
            email: model.email,
            is_verified: model.is_verified,
            verify_code: model.verify_code,
            verify_code_expiry: model.verify_code_expiry,
            is_accepting_messages: model.is_accepting_messages,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

impl Account {
    #[must_use]
    pub fn session_user(&self) -> SessionUser {
        SessionUser {
            id: self.id,
            username: self.username.clone(),
            is_verified: self.is_verified,
            is_accepting_messages: self.is_accepting_messages,
        }
    }
}

/// Fields written when a verification code is (re)issued.
#[derive(Debug, Clone)]
pub struct PendingRegistration {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub verify_code: String,
    pub verify_code_expiry: DateTime<Utc>,
}

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get_by_id(&self, id: UserId) -> Result<Option<Account>> {
        let user = Users::find_by_id(id.value())
            .one(&self.conn)
            .await
            .context("Failed to query user by ID")?;

        Ok(user.map(Account::from))
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<Account>> {
        let user = Users::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.conn)
            .await
            .context("Failed to query user by email")?;

        Ok(user.map(Account::from))
    }

    /// Only verified accounts own a username.
    pub async fn get_verified_by_username(&self, username: &str) -> Result<Option<Account>> {
        let user = Users::find()
            .filter(users::Column::Username.eq(username))
            .filter(users::Column::IsVerified.eq(true))
            .one(&self.conn)
            .await
            .context("Failed to query verified user by username")?;

        Ok(user.map(Account::from))
    }

    /// Every account holding `username`: the verified holder first, then
    /// pending rows newest first.
    pub async fn list_by_username(&self, username: &str) -> Result<Vec<Account>> {
        let users = Users::find()
            .filter(users::Column::Username.eq(username))
            .order_by_desc(users::Column::IsVerified)
            .order_by_desc(users::Column::UpdatedAt)
            .all(&self.conn)
            .await
            .context("Failed to query users by username")?;

        Ok(users.into_iter().map(Account::from).collect())
    }

    /// Looks up an account by email or username, returning its password hash.
    /// Emails are stored lower-cased, so only that side is folded.
    pub async fn get_by_identifier_with_password(
        &self,
        identifier: &str,
    ) -> Result<Option<(Account, String)>> {
        let user = Users::find()
            .filter(
                Condition::any()
                    .add(users::Column::Email.eq(identifier.to_lowercase()))
                    .add(users::Column::Username.eq(identifier)),
            )
            .order_by_desc(users::Column::IsVerified)
            .order_by_desc(users::Column::UpdatedAt)
            .one(&self.conn)
            .await
            .context("Failed to query user by identifier")?;

        Ok(user.map(|u| {
            let password_hash = u.password_hash.clone();
            (Account::from(u), password_hash)
        }))
    }

    /// Inserts a new pending account that accepts messages.
    pub async fn create_pending(&self, registration: PendingRegistration) -> Result<Account> {
        let now = Utc::now();

        let active = users::ActiveModel {
            username: Set(registration.username),
            email: Set(registration.email),
            password_hash: Set(registration.password_hash),
            is_verified: Set(false),
            verify_code: Set(registration.verify_code),
            verify_code_expiry: Set(registration.verify_code_expiry),
            is_accepting_messages: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let model = active
            .insert(&self.conn)
            .await
            .context("Failed to insert pending user")?;

        Ok(Account::from(model))
    }

    /// Overwrites username, password and code of an existing pending account.
    pub async fn reissue_pending(
        &self,
        id: UserId,
        registration: PendingRegistration,
    ) -> Result<Account> {
        let user = Users::find_by_id(id.value())
            .one(&self.conn)
            .await
            .context("Failed to query user for re-registration")?
            .ok_or_else(|| anyhow::anyhow!("User not found: {id}"))?;

        let mut active: users::ActiveModel = user.into();
        active.username = Set(registration.username);
        active.password_hash = Set(registration.password_hash);
        active.verify_code = Set(registration.verify_code);
        active.verify_code_expiry = Set(registration.verify_code_expiry);
        active.updated_at = Set(Utc::now());

        let model = active
            .update(&self.conn)
            .await
            .context("Failed to update pending user")?;

        Ok(Account::from(model))
    }

    /// Returns false when the account is not pending or another verified
    /// account already holds its username.
    pub async fn mark_verified(&self, id: UserId) -> Result<bool> {
        let verified_usernames = Query::select()
            .column(users::Column::Username)
            .from(Users)
            .and_where(users::Column::IsVerified.eq(true))
            .to_owned();

        let result = Users::update_many()
            .col_expr(
                users::Column::IsVerified,
                sea_orm::sea_query::Expr::value(true),
            )
            .col_expr(
                users::Column::UpdatedAt,
                sea_orm::sea_query::Expr::value(Utc::now()),
            )
            .filter(users::Column::Id.eq(id.value()))
            .filter(users::Column::IsVerified.eq(false))
            .filter(users::Column::Username.not_in_subquery(verified_usernames))
            .exec(&self.conn)
            .await
            .context("Failed to mark user verified")?;

        Ok(result.rows_affected > 0)
    }

    /// Returns the stored value, or `None` if the account no longer exists.
    pub async fn set_accepting_messages(&self, id: UserId, accept: bool) -> Result<Option<bool>> {
        let result = Users::update_many()
            .col_expr(
                users::Column::IsAcceptingMessages,
                sea_orm::sea_query::Expr::value(accept),
            )
            .col_expr(
                users::Column::UpdatedAt,
                sea_orm::sea_query::Expr::value(Utc::now()),
            )
            .filter(users::Column::Id.eq(id.value()))
            .exec(&self.conn)
            .await
            .context("Failed to update message acceptance")?;

        Ok((result.rows_affected > 0).then_some(accept))
    }
}

/// Hash a password using Argon2id with optional custom params.
/// If config is None, uses the crate's default params.
pub fn hash_password(password: &str, config: Option<&SecurityConfig>) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let argon2 = if let Some(cfg) = config {
        let params = Params::new(
            cfg.argon2_memory_cost_kib,
            cfg.argon2_time_cost,
            cfg.argon2_parallelism,
            None,
        )
        .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;
        Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
    } else {
        Argon2::default()
    };

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;

    Ok(hash.to_string())
}

/// Hashes on a blocking thread; Argon2 would otherwise stall the runtime.
pub async fn hash_password_blocking(password: &str, config: &SecurityConfig) -> Result<String> {
    let password = password.to_string();
    let config = config.clone();
    task::spawn_blocking(move || hash_password(&password, Some(&config)))
        .await
        .context("Password hashing task panicked")?
}

/// Verifies a password against a PHC hash string on a blocking thread.
pub async fn verify_password_blocking(password: &str, password_hash: String) -> Result<bool> {
    let password = password.to_string();

    task::spawn_blocking(move || {
        let parsed_hash = PasswordHash::new(&password_hash)
            .map_err(|e| anyhow::anyhow!("Invalid password hash format: {e}"))?;

        Ok::<bool, anyhow::Error>(
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed_hash)
                .is_ok(),
        )
    })
    .await
    .context("Password verification task panicked")?
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap_params() -> SecurityConfig {
        SecurityConfig {
            argon2_memory_cost_kib: 1024,
            argon2_time_cost: 1,
            argon2_parallelism: 1,
        }
    }

    #[test]
    fn hash_is_salted_phc_string() {
        let a = hash_password("hunter22", Some(&cheap_params())).unwrap();
        let b = hash_password("hunter22", Some(&cheap_params())).unwrap();
        assert!(a.starts_with("$argon2id$"));
        assert_ne!(a, b);
        assert!(!a.contains("hunter22"));
    }

    #[tokio::test]
    async fn verify_accepts_only_the_original_password() {
        let hash = hash_password_blocking("hunter22", &cheap_params()).await.unwrap();
        assert!(verify_password_blocking("hunter22", hash.clone()).await.unwrap());
        assert!(!verify_password_blocking("hunter23", hash).await.unwrap());
    }

    #[tokio::test]
    async fn verify_rejects_garbage_hash() {
        assert!(verify_password_blocking("x", "not-a-hash".to_string()).await.is_err());
    }
}
