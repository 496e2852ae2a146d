use axum::{
    Json,
    extract::{FromRequestParts, State, rejection::JsonRejection},
    http::request::Parts,
};
use std::sync::Arc;
use tower_sessions::Session;

use super::{ApiError, ApiResponse, AppState, SignInRequest, UserPayload, validation};
use crate::domain::SessionUser;
use crate::services::AccountError;

/// Session key holding the serialized [`SessionUser`].
const SESSION_USER_KEY: &str = "user";

impl From<AccountError> for ApiError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::InvalidCredentials | AccountError::NotVerified => {
                ApiError::Unauthorized(err.to_string())
            }
            AccountError::AccountNotFound => ApiError::user_not_found(),
            AccountError::Database(msg) => ApiError::DatabaseError(msg),
            AccountError::Internal(msg) => ApiError::InternalError(msg),
        }
    }
}

// ============================================================================
// Extractor
// ============================================================================

/// The signed-in account, read once from the session.
///
/// Rejects with 401 when there is no session identity and with 400 when the
/// stored identity cannot be decoded.
pub struct CurrentUser(pub SessionUser);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|(_, msg)| ApiError::internal(format!("Session layer missing: {msg}")))?;

        let user = session_user(&session)
            .await?
            .ok_or_else(ApiError::not_authenticated)?;

        tracing::Span::current().record("user_id", user.id.value());
        Ok(Self(user))
    }
}

async fn session_user(session: &Session) -> Result<Option<SessionUser>, ApiError> {
    match session.get::<SessionUser>(SESSION_USER_KEY).await {
        Ok(user) => Ok(user),
        Err(tower_sessions::session::Error::SerdeJson(e)) => {
            tracing::warn!("Discarding undecodable session identity: {e}");
            Err(ApiError::validation("Invalid session"))
        }
        Err(e) => Err(ApiError::internal(format!("Session error: {e}"))),
    }
}

/// Replaces the identity stored in the session.
pub async fn store_session_user(session: &Session, user: &SessionUser) -> Result<(), ApiError> {
    session
        .insert(SESSION_USER_KEY, user)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to store session: {e}")))
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /sign-in
/// Authenticate with email or username and password
pub async fn sign_in(
    State(state): State<Arc<AppState>>,
    session: Session,
    payload: Result<Json<SignInRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<UserPayload>>, ApiError> {
    let Json(payload) = payload?;

    let identifier = validation::validate_required(&payload.identifier, "Email or username")?;
    if payload.password.is_empty() {
        return Err(ApiError::validation("Password is required"));
    }

    let user = state
        .account_service()
        .authenticate(identifier, &payload.password)
        .await?;

    // New id on privilege change.
    session
        .cycle_id()
        .await
        .map_err(|e| ApiError::internal(format!("Failed to rotate session: {e}")))?;
    store_session_user(&session, &user).await?;

    Ok(Json(ApiResponse::with_message(
        UserPayload { user },
        "Signed in successfully",
    )))
}

/// POST /sign-out
pub async fn sign_out(session: Session) -> Result<Json<ApiResponse<()>>, ApiError> {
    session
        .flush()
        .await
        .map_err(|e| ApiError::internal(format!("Failed to clear session: {e}")))?;

    Ok(Json(ApiResponse::ok("Signed out")))
}

/// GET /me
/// Fresh identity of the signed-in account
pub async fn me(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<ApiResponse<UserPayload>>, ApiError> {
    let user = state.account_service().current_identity(user.id).await?;
    Ok(Json(ApiResponse::success(UserPayload { user })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn credential_failures_are_unauthorized() {
        assert_eq!(
            ApiError::from(AccountError::InvalidCredentials).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::from(AccountError::NotVerified).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::from(AccountError::AccountNotFound).status(),
            StatusCode::NOT_FOUND
        );
    }
}
