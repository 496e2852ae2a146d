use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use std::sync::Arc;

use super::auth::CurrentUser;
use super::{ApiError, ApiResponse, AppState, MessagesPayload, SendMessageRequest, validation};
use crate::services::InboxError;

impl From<InboxError> for ApiError {
    fn from(err: InboxError) -> Self {
        match err {
            InboxError::AccountNotFound | InboxError::MessageNotFound => {
                ApiError::NotFound(err.to_string())
            }
            InboxError::NotAcceptingMessages => ApiError::Forbidden(err.to_string()),
            InboxError::Database(msg) => ApiError::DatabaseError(msg),
            InboxError::Internal(msg) => ApiError::InternalError(msg),
        }
    }
}

/// GET /get-messages
/// Messages of the signed-in account, newest first
pub async fn get_messages(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<ApiResponse<MessagesPayload>>, ApiError> {
    let messages = state.inbox_service().list(user.id).await?;
    Ok(Json(ApiResponse::success(MessagesPayload { messages })))
}

/// DELETE /delete-message/{id}
pub async fn delete_message(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(message_id): Path<String>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state.inbox_service().delete(user.id, &message_id).await?;
    Ok(Json(ApiResponse::ok("Message deleted")))
}

/// POST /send-message
/// Anonymous delivery; no session required
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SendMessageRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<()>>), ApiError> {
    let Json(payload) = payload?;

    let username = validation::validate_required(&payload.username, "Username")?;
    let content = validation::validate_message_content(&payload.content)?;

    state.inbox_service().send(username, content).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok("Message sent successfully")),
    ))
}
