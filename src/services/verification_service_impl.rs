//! `SeaORM` implementation of the `VerificationService` trait.

use async_trait::async_trait;
use chrono::Utc;
use std::borrow::Cow;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::{SecurityConfig, VerificationConfig};
use crate::db::repositories::user::hash_password_blocking;
use crate::db::{Account, PendingRegistration, Store};
use crate::domain::verification::{self, CodeRejection, VerifyCode};
use crate::services::notification::Mailer;
use crate::services::verification_service::{
    Registration, RegistrationRequest, VerificationError, VerificationService, VerifyOutcome,
};

pub struct SeaOrmVerificationService {
    store: Store,
    mailer: Arc<dyn Mailer>,
    security: SecurityConfig,
    code_ttl: chrono::Duration,
}

impl SeaOrmVerificationService {
    #[must_use]
    pub fn new(
        store: Store,
        mailer: Arc<dyn Mailer>,
        security: SecurityConfig,
        verification: &VerificationConfig,
    ) -> Self {
        Self {
            store,
            mailer,
            security,
            code_ttl: verification.code_ttl(),
        }
    }
}

/// Undoes percent-encoding from path-derived usernames; invalid UTF-8 is left as is.
fn decode_username(raw: &str) -> Cow<'_, str> {
    urlencoding::decode(raw).unwrap_or(Cow::Borrowed(raw))
}

#[async_trait]
impl VerificationService for SeaOrmVerificationService {
    async fn register(
        &self,
        request: RegistrationRequest,
    ) -> Result<Registration, VerificationError> {
        let RegistrationRequest {
            username,
            email,
            password,
        } = request;

        if self
            .store
            .get_verified_user_by_username(&username)
            .await?
            .is_some()
        {
            return Err(VerificationError::UsernameTaken);
        }

        let existing = self.store.get_user_by_email(&email).await?;
        if existing.as_ref().is_some_and(|a| a.is_verified) {
            return Err(VerificationError::EmailTaken);
        }

        let code = VerifyCode::generate();
        let expiry = verification::expiry_from(Utc::now(), self.code_ttl);
        let password_hash = hash_password_blocking(&password, &self.security).await?;

        let pending = PendingRegistration {
            username,
            email,
            password_hash,
            verify_code: code.as_str().to_string(),
            verify_code_expiry: expiry,
        };

        let (account, reissued) = match existing {
            Some(account) => {
                let account = self.store.reissue_pending_user(account.id, pending).await?;
                info!(user_id = %account.id, "Re-issued verification code for pending account");
                (account, true)
            }
            None => {
                let account = self.store.create_pending_user(pending).await?;
                info!(user_id = %account.id, "Created pending account");
                (account, false)
            }
        };

        metrics::counter!("registrations_total", "reissued" => reissued.to_string()).increment(1);

        // Storage is committed at this point; a failed send is reported, not rolled back.
        if let Err(e) = self
            .mailer
            .send_verification_code(&account.email, &account.username, &code)
            .await
        {
            warn!(user_id = %account.id, "Verification email failed: {e}");
            metrics::counter!("verification_emails_failed_total").increment(1);
            return Err(VerificationError::DeliveryFailed {
                email: account.email,
                reason: e.to_string(),
            });
        }

        Ok(Registration {
            user_id: account.id,
            username: account.username,
            email: account.email,
            code_expires_at: account.verify_code_expiry,
            reissued,
        })
    }

    async fn verify(
        &self,
        username: &str,
        code: &str,
    ) -> Result<VerifyOutcome, VerificationError> {
        let username = decode_username(username);

        let candidates = self.store.get_users_by_username(&username).await?;
        let account = select_candidate(&candidates, code).ok_or(VerificationError::AccountNotFound)?;

        let outcome = verification::check_code(
            &account.verify_code,
            account.verify_code_expiry,
            code,
            Utc::now(),
        );

        let label = match outcome {
            Ok(()) if account.is_verified => "already_verified",
            Ok(()) => "verified",
            Err(CodeRejection::Expired) => "expired",
            Err(CodeRejection::Mismatch) => "mismatch",
        };
        metrics::counter!("verifications_total", "outcome" => label).increment(1);

        match outcome {
            Ok(()) if account.is_verified => Ok(VerifyOutcome::AlreadyVerified),
            Ok(()) => {
                if self.store.mark_user_verified(account.id).await? {
                    info!(user_id = %account.id, "Account verified");
                    return Ok(VerifyOutcome::Verified);
                }
                // Either a concurrent submission verified this account, or
                // another account claimed the username first.
                match self.store.get_user(account.id).await? {
                    Some(current) if current.is_verified => Ok(VerifyOutcome::Verified),
                    Some(_) => {
                        info!(user_id = %account.id, "Username claimed by another account");
                        Err(VerificationError::UsernameTaken)
                    }
                    None => Err(VerificationError::AccountNotFound),
                }
            }
            Err(CodeRejection::Expired) => Err(VerificationError::CodeExpired),
            Err(CodeRejection::Mismatch) => Err(VerificationError::CodeMismatch),
        }
    }
}

/// Picks the account a code submission refers to.
///
/// `candidates` all share one username, verified holder first and then
/// pending rows newest first. The row holding the submitted code wins so
/// pending registrations can race; otherwise the first row is checked.
fn select_candidate<'a>(candidates: &'a [Account], code: &str) -> Option<&'a Account> {
    candidates
        .iter()
        .find(|account| account.verify_code == code)
        .or_else(|| candidates.first())
}
