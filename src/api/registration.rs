use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, SignUpRequest, VerifyCodeRequest, validation};
use crate::services::{RegistrationRequest, VerificationError, VerifyOutcome};

impl From<VerificationError> for ApiError {
    fn from(err: VerificationError) -> Self {
        match err {
            VerificationError::UsernameTaken | VerificationError::EmailTaken => {
                ApiError::Conflict(err.to_string())
            }
            VerificationError::AccountNotFound => ApiError::user_not_found(),
            VerificationError::CodeExpired => ApiError::CodeExpired(err.to_string()),
            VerificationError::CodeMismatch => ApiError::CodeMismatch(err.to_string()),
            VerificationError::DeliveryFailed { .. } => ApiError::email_error(err.to_string()),
            VerificationError::Database(msg) => ApiError::DatabaseError(msg),
            VerificationError::Internal(msg) => ApiError::InternalError(msg),
        }
    }
}

/// POST /sign-up
/// Create or refresh a pending account and email it a verification code
pub async fn sign_up(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SignUpRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<()>>), ApiError> {
    let Json(payload) = payload?;

    let username = validation::validate_username(&payload.username)?.to_string();
    let email = validation::validate_email(&payload.email)?;
    let password = validation::validate_password(&payload.password)?.to_string();

    let registration = state
        .verification_service()
        .register(RegistrationRequest {
            username,
            email,
            password,
        })
        .await?;

    tracing::info!(
        user_id = %registration.user_id,
        reissued = registration.reissued,
        "Verification code issued"
    );

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            "User registered successfully. Please verify your email",
        )),
    ))
}

/// POST /verify-code
pub async fn verify_code(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<VerifyCodeRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let Json(payload) = payload?;

    let username = validation::validate_required(&payload.username, "Username")?;
    let code = validation::validate_code(&payload.code)?;

    let message = match state.verification_service().verify(username, code).await? {
        VerifyOutcome::Verified => "Account verified successfully",
        VerifyOutcome::AlreadyVerified => "Account is already verified",
    };

    Ok(Json(ApiResponse::ok(message)))
}
