#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use echobox::api::{AppState, create_app_state, router};
use echobox::config::{Config, SecurityConfig};
use echobox::domain::VerifyCode;
use echobox::services::{Mailer, NotificationError, TextGenerator};
use echobox::state::SharedState;
use http_body_util::BodyExt;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

/// Captures codes instead of sending them.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<(String, String, String)>>,
    fail: AtomicBool,
}

impl RecordingMailer {
    pub fn fail_deliveries(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn last_code_for(&self, email: &str) -> Option<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(to, _, _)| to == email)
            .map(|(_, _, code)| code.clone())
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl Mailer for RecordingMailer {
    async fn send_verification_code(
        &self,
        email: &str,
        username: &str,
        code: &VerifyCode,
    ) -> Result<(), NotificationError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(NotificationError::Rejected {
                status: 503,
                body: "provider unavailable".to_string(),
            });
        }
        self.sent.lock().unwrap().push((
            email.to_string(),
            username.to_string(),
            code.as_str().to_string(),
        ));
        Ok(())
    }
}

pub struct FakeGenerator {
    pub configured: bool,
    pub models: Vec<String>,
    pub reply: String,
    pub prompts: Mutex<Vec<String>>,
}

impl FakeGenerator {
    pub fn unconfigured() -> Self {
        Self::with_models(&[]).configured(false)
    }

    pub fn with_models(models: &[&str]) -> Self {
        Self {
            configured: true,
            models: models.iter().map(|m| (*m).to_string()).collect(),
            reply: "What's your favorite book?||Where would you travel?||Best advice?"
                .to_string(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn configured(mut self, configured: bool) -> Self {
        self.configured = configured;
        self
    }
}

#[async_trait::async_trait]
impl TextGenerator for FakeGenerator {
    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn list_models(&self) -> anyhow::Result<Vec<String>> {
        Ok(self.models.clone())
    }

    async fn generate(&self, _model: &str, prompt: &str) -> anyhow::Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.reply.clone())
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub mailer: Arc<RecordingMailer>,
    pub generator: Arc<FakeGenerator>,
    db_path: PathBuf,
}

impl Drop for TestApp {
    fn drop(&mut self) {
        for suffix in ["", "-wal", "-shm", "-journal"] {
            let mut path = self.db_path.clone().into_os_string();
            path.push(suffix);
            let _ = std::fs::remove_file(path);
        }
    }
}

pub fn temp_db_path() -> PathBuf {
    std::env::temp_dir().join(format!("echobox-test-{}.db", uuid::Uuid::new_v4()))
}

pub fn test_config(db_path: &std::path::Path) -> Config {
    let mut config = Config::default();
    config.general.database_path = format!("sqlite://{}", db_path.display());
    config.server.secure_cookies = false;
    config.observability.metrics_enabled = false;
    config.security = SecurityConfig {
        argon2_memory_cost_kib: 1024,
        argon2_time_cost: 1,
        argon2_parallelism: 1,
    };
    config
}

pub fn spawn_app() -> TestApp {
    spawn_app_with(FakeGenerator::unconfigured())
}

pub fn spawn_app_with(generator: FakeGenerator) -> TestApp {
    let db_path = temp_db_path();
    spawn_app_from(test_config(&db_path), db_path, generator)
}

pub fn spawn_app_from(config: Config, db_path: PathBuf, generator: FakeGenerator) -> TestApp {
    let mailer = Arc::new(RecordingMailer::default());
    let generator = Arc::new(generator);

    let shared = Arc::new(SharedState::with_collaborators(
        config,
        mailer.clone() as Arc<dyn Mailer>,
        generator.clone() as Arc<dyn TextGenerator>,
    ));
    let state = create_app_state(shared, None);
    let router = router(state.clone()).expect("Failed to build router");

    TestApp {
        router,
        state,
        mailer,
        generator,
        db_path,
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub cookie: Option<String>,
    pub headers: axum::http::HeaderMap,
    pub json: Value,
}

impl TestApp {
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        cookie: Option<&str>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }

        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();

        let status = response.status();
        let headers = response.headers().clone();
        let cookie = headers
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(str::to_string);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        TestResponse {
            status,
            cookie,
            headers,
            json,
        }
    }

    pub async fn post(&self, uri: &str, body: Value) -> TestResponse {
        self.request(Method::POST, uri, Some(body), None).await
    }

    pub async fn sign_up(&self, username: &str, email: &str, password: &str) -> TestResponse {
        self.post(
            "/api/sign-up",
            serde_json::json!({"username": username, "email": email, "password": password}),
        )
        .await
    }

    pub async fn verify(&self, username: &str, code: &str) -> TestResponse {
        self.post(
            "/api/verify-code",
            serde_json::json!({"username": username, "code": code}),
        )
        .await
    }

    /// Moves the code expiry of the account registered under `email`.
    pub async fn set_code_expiry(&self, email: &str, expiry: chrono::DateTime<chrono::Utc>) {
        use echobox::entities::{prelude::Users, users};
        use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, sea_query::Expr};

        let conn = self.state.store().acquire().await.unwrap();
        let result = Users::update_many()
            .col_expr(users::Column::VerifyCodeExpiry, Expr::value(expiry))
            .filter(users::Column::Email.eq(email))
            .exec(conn)
            .await
            .unwrap();
        assert_eq!(result.rows_affected, 1, "no account for {email}");
    }

    pub async fn is_verified(&self, email: &str) -> bool {
        self.state
            .store()
            .get_user_by_email(email)
            .await
            .unwrap()
            .expect("account exists")
            .is_verified
    }

    /// Registers, verifies and signs in; returns the session cookie.
    pub async fn signed_in_user(&self, username: &str, email: &str) -> String {
        let response = self.sign_up(username, email, "hunter22").await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.json);

        let code = self.mailer.last_code_for(email).expect("code was sent");
        let response = self.verify(username, &code).await;
        assert_eq!(response.status, StatusCode::OK, "{}", response.json);

        let response = self
            .post(
                "/api/sign-in",
                serde_json::json!({"identifier": username, "password": "hunter22"}),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{}", response.json);
        response.cookie.expect("sign-in sets a session cookie")
    }
}

/// A valid code that differs from `code`.
pub fn other_code(code: &str) -> &'static str {
    if code == "123456" { "654321" } else { "123456" }
}
