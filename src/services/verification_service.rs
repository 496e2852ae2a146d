//! Domain service for registration and email verification.
//!
//! Issuance stores a pending account with a fresh code and then notifies the
//! user. The two steps are independent: a failed notification leaves the
//! account in place and is reported as [`VerificationError::DeliveryFailed`].

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::domain::UserId;

/// Errors specific to the verification workflow.
#[derive(Debug, Error)]
pub enum VerificationError {
    #[error("Username is already taken")]
    UsernameTaken,

    #[error("Email already registered")]
    EmailTaken,

    #[error("User not found")]
    AccountNotFound,

    #[error("Verification code has expired. Please sign up again to get a new code.")]
    CodeExpired,

    #[error("Incorrect verification code")]
    CodeMismatch,

    /// The account was stored but the code could not be delivered.
    #[error(
        "Account created but email delivery failed: {reason}. Please contact support with your email: {email}"
    )]
    DeliveryFailed { email: String, reason: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for VerificationError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for VerificationError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(format!("{err:#}"))
    }
}

/// Input to [`VerificationService::register`].
#[derive(Debug, Clone)]
pub struct RegistrationRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Outcome of a successful registration.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub user_id: UserId,
    pub username: String,
    pub email: String,
    pub code_expires_at: DateTime<Utc>,
    /// True when an existing pending account was overwritten.
    pub reissued: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyOutcome {
    Verified,
    /// The account was already verified; nothing changed.
    AlreadyVerified,
}

/// Domain service trait for the verification workflow.
#[async_trait::async_trait]
pub trait VerificationService: Send + Sync {
    /// Registers or re-registers a pending account and sends it a code.
    ///
    /// # Errors
    ///
    /// Returns [`VerificationError::UsernameTaken`] or
    /// [`VerificationError::EmailTaken`] when a verified account owns either,
    /// and [`VerificationError::DeliveryFailed`] when the account was stored
    /// but the email could not be sent.
    async fn register(
        &self,
        request: RegistrationRequest,
    ) -> Result<Registration, VerificationError>;

    /// Checks a submitted code and verifies the account.
    ///
    /// `username` may be percent-encoded. Several pending accounts may share
    /// it; the one holding the submitted code is the one checked.
    ///
    /// # Errors
    ///
    /// Returns [`VerificationError::CodeExpired`] once the expiry has passed,
    /// whether or not the code matches,
    /// [`VerificationError::CodeMismatch`] for a wrong code before it, and
    /// [`VerificationError::UsernameTaken`] when another account verified the
    /// username first.
    async fn verify(&self, username: &str, code: &str)
    -> Result<VerifyOutcome, VerificationError>;
}
