use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use std::sync::Arc;
use tower_sessions::Session;

use super::auth::{CurrentUser, store_session_user};
use super::{AcceptMessagesRequest, AcceptStatusPayload, ApiError, ApiResponse, AppState};

/// POST /accept-messages
/// Persist the flag and refresh the session claim. A bad body is rejected
/// before the session is checked.
pub async fn set_accept_messages(
    State(state): State<Arc<AppState>>,
    session: Session,
    user: Result<CurrentUser, ApiError>,
    payload: Result<Json<AcceptMessagesRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<AcceptStatusPayload>>, ApiError> {
    let Json(payload) = payload?;
    let CurrentUser(mut user) = user?;

    let stored = state
        .account_service()
        .set_accepting_messages(user.id, payload.accept_messages)
        .await?;

    user.is_accepting_messages = stored;
    store_session_user(&session, &user).await?;

    Ok(Json(ApiResponse::with_message(
        AcceptStatusPayload {
            is_accepting_messages: stored,
        },
        "Message acceptance status updated successfully",
    )))
}

/// GET /accept-messages
pub async fn get_accept_messages(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<ApiResponse<AcceptStatusPayload>>, ApiError> {
    let accepting = state
        .account_service()
        .is_accepting_messages(user.id)
        .await?;

    Ok(Json(ApiResponse::success(AcceptStatusPayload {
        is_accepting_messages: accepting,
    })))
}
