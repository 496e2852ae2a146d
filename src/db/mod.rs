use anyhow::{Context, Result};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::info;

use crate::domain::UserId;

pub mod migrator;
pub mod repositories;

pub use repositories::message::InboxMessage;
pub use repositories::user::{Account, PendingRegistration};

/// Handle to the account database.
///
/// The connection pool is opened and migrated on the first [`Store::acquire`]
/// and then shared by every clone for the life of the process.
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    db_url: String,
    max_connections: u32,
    min_connections: u32,
    conn: OnceCell<DatabaseConnection>,
}

impl Store {
    /// Creates a lazy handle; nothing is opened until first use.
    #[must_use]
    pub fn new(db_url: &str) -> Self {
        Self::with_pool_options(db_url, 5, 1)
    }

    #[must_use]
    pub fn with_pool_options(db_url: &str, max_connections: u32, min_connections: u32) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                db_url: db_url.to_string(),
                max_connections,
                min_connections,
                conn: OnceCell::new(),
            }),
        }
    }

    /// Returns the shared connection, opening and migrating it on first call.
    ///
    /// Concurrent first callers wait on the same initialisation; a failed
    /// attempt leaves the cell empty so the next call retries.
    pub async fn acquire(&self) -> Result<&DatabaseConnection> {
        self.inner
            .conn
            .get_or_try_init(|| {
                open_pool(
                    &self.inner.db_url,
                    self.inner.max_connections,
                    self.inner.min_connections,
                )
            })
            .await
    }

    pub async fn ping(&self) -> Result<()> {
        let conn = self.acquire().await?;
        let backend = conn.get_database_backend();
        conn.query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    async fn user_repo(&self) -> Result<repositories::user::UserRepository> {
        Ok(repositories::user::UserRepository::new(
            self.acquire().await?.clone(),
        ))
    }

    async fn message_repo(&self) -> Result<repositories::message::MessageRepository> {
        Ok(repositories::message::MessageRepository::new(
            self.acquire().await?.clone(),
        ))
    }

    pub async fn get_user(&self, id: UserId) -> Result<Option<Account>> {
        self.user_repo().await?.get_by_id(id).await
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<Account>> {
        self.user_repo().await?.get_by_email(email).await
    }

    pub async fn get_verified_user_by_username(&self, username: &str) -> Result<Option<Account>> {
        self.user_repo()
            .await?
            .get_verified_by_username(username)
            .await
    }

    pub async fn get_users_by_username(&self, username: &str) -> Result<Vec<Account>> {
        self.user_repo().await?.list_by_username(username).await
    }

    pub async fn get_user_with_password(
        &self,
        identifier: &str,
    ) -> Result<Option<(Account, String)>> {
        self.user_repo()
            .await?
            .get_by_identifier_with_password(identifier)
            .await
    }

    pub async fn create_pending_user(&self, registration: PendingRegistration) -> Result<Account> {
        self.user_repo().await?.create_pending(registration).await
    }

    pub async fn reissue_pending_user(
        &self,
        id: UserId,
        registration: PendingRegistration,
    ) -> Result<Account> {
        self.user_repo()
            .await?
            .reissue_pending(id, registration)
            .await
    }

    pub async fn mark_user_verified(&self, id: UserId) -> Result<bool> {
        self.user_repo().await?.mark_verified(id).await
    }

    pub async fn set_accepting_messages(&self, id: UserId, accept: bool) -> Result<Option<bool>> {
        self.user_repo()
            .await?
            .set_accepting_messages(id, accept)
            .await
    }

    pub async fn list_messages(&self, user_id: UserId) -> Result<Vec<InboxMessage>> {
        self.message_repo().await?.list_for_user(user_id).await
    }

    pub async fn add_message(&self, user_id: UserId, content: &str) -> Result<InboxMessage> {
        self.message_repo().await?.add(user_id, content).await
    }

    pub async fn remove_message(&self, user_id: UserId, message_id: &str) -> Result<bool> {
        self.message_repo()
            .await?
            .remove_for_user(user_id, message_id)
            .await
    }
}

async fn open_pool(
    db_url: &str,
    max_connections: u32,
    min_connections: u32,
) -> Result<DatabaseConnection> {
    use sea_orm_migration::MigratorTrait;

    if !db_url.contains(":memory:") {
        let path_str = db_url
            .trim_start_matches("sqlite://")
            .trim_start_matches("sqlite:");
        let path_str = path_str.split('?').next().unwrap_or(path_str);
        if let Some(parent) = Path::new(path_str).parent() {
            tokio::fs::create_dir_all(parent).await.ok();
        }
        if !Path::new(path_str).exists() {
            std::fs::File::create(path_str)
                .with_context(|| format!("Failed to create database file: {path_str}"))?;
        }
    }

    let mut opt = ConnectOptions::new(db_url.to_string());
    opt.max_connections(max_connections)
        .min_connections(min_connections)
        .connect_timeout(Duration::from_secs(10))
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(300))
        .max_lifetime(Duration::from_secs(600))
        .sqlx_logging(false);

    let conn = Database::connect(opt)
        .await
        .context("Failed to connect to database")?;

    migrator::Migrator::up(&conn, None)
        .await
        .context("Failed to apply migrations")?;

    info!(
        "Database connected & migrations applied (pool: {}-{})",
        min_connections, max_connections
    );

    Ok(conn)
}
