use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{delete, get, post},
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tower_sessions::cookie::{Key, SameSite};
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use crate::config::{Config, ServerConfig};
use crate::state::SharedState;

pub mod auth;
mod error;
mod health;
mod messages;
mod observability;
mod preferences;
mod registration;
mod suggestions;
mod types;
pub mod validation;

pub use error::ApiError;
pub use types::*;

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,

    pub start_time: std::time::Instant,

    pub prometheus_handle: Option<PrometheusHandle>,
}

impl AppState {
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    #[must_use]
    pub fn store(&self) -> &crate::db::Store {
        &self.shared.store
    }

    #[must_use]
    pub fn verification_service(&self) -> &Arc<dyn crate::services::VerificationService> {
        &self.shared.verification_service
    }

    #[must_use]
    pub fn account_service(&self) -> &Arc<dyn crate::services::AccountService> {
        &self.shared.account_service
    }

    #[must_use]
    pub fn inbox_service(&self) -> &Arc<dyn crate::services::InboxService> {
        &self.shared.inbox_service
    }

    #[must_use]
    pub fn suggestion_service(&self) -> &Arc<crate::services::SuggestionService> {
        &self.shared.suggestion_service
    }
}

#[must_use]
pub fn create_app_state(
    shared: Arc<SharedState>,
    prometheus_handle: Option<PrometheusHandle>,
) -> Arc<AppState> {
    Arc::new(AppState {
        shared,
        start_time: std::time::Instant::now(),
        prometheus_handle,
    })
}

pub fn create_app_state_from_config(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let shared = Arc::new(SharedState::new(config)?);
    Ok(create_app_state(shared, prometheus_handle))
}

/// Signing key for session cookies. Without a configured secret a random key
/// is used and sessions end with the process.
fn session_key(server: &ServerConfig) -> anyhow::Result<Key> {
    match server.session_secret.as_deref() {
        Some(secret) => Key::try_from(secret.as_bytes())
            .map_err(|e| anyhow::anyhow!("Invalid session secret: {e}")),
        None => {
            tracing::warn!("No session secret configured; sessions will not survive a restart");
            Ok(Key::generate())
        }
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let methods = [Method::GET, Method::POST, Method::DELETE];

    if origins.iter().any(|o| o == "*") {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = origins.iter().filter_map(|s| s.parse().ok()).collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(methods)
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true)
}

pub fn router(state: Arc<AppState>) -> anyhow::Result<Router> {
    let server = &state.config().server;

    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_secure(server.secure_cookies)
        .with_http_only(true)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(
            server.session_inactivity_minutes,
        )))
        .with_signed(session_key(server)?);

    let cors = cors_layer(&server.cors_allowed_origins);

    let api_router = Router::new()
        .route("/sign-up", post(registration::sign_up))
        .route("/verify-code", post(registration::verify_code))
        .route("/sign-in", post(auth::sign_in))
        .route("/sign-out", post(auth::sign_out))
        .route("/me", get(auth::me))
        .route(
            "/accept-messages",
            get(preferences::get_accept_messages).post(preferences::set_accept_messages),
        )
        .route("/get-messages", get(messages::get_messages))
        .route("/delete-message/{id}", delete(messages::delete_message))
        .route("/send-message", post(messages::send_message))
        .route("/suggest-messages", post(suggestions::suggest_messages))
        .route("/health", get(health::get_health))
        .layer(session_layer);

    Ok(Router::new()
        .nest("/api", api_router)
        .route("/metrics", get(observability::get_metrics))
        .layer(middleware::from_fn(observability::security_headers_middleware))
        .layer(middleware::from_fn(observability::logging_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}
