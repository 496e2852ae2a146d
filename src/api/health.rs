use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use super::{ApiResponse, AppState, HealthPayload};

/// GET /health
/// 200 when the database answers, 503 otherwise
pub async fn get_health(State(state): State<Arc<AppState>>) -> Response {
    let uptime_seconds = state.start_time.elapsed().as_secs();

    match state.store().ping().await {
        Ok(()) => Json(ApiResponse::success(HealthPayload {
            status: "ok".to_string(),
            database: "connected".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds,
        }))
        .into_response(),
        Err(e) => {
            tracing::error!("Health check failed: {e:#}");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse::<()>::error("Database unavailable")),
            )
                .into_response()
        }
    }
}
