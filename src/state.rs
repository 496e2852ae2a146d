use std::sync::Arc;

use crate::clients::gemini::GeminiClient;
use crate::clients::resend::ResendClient;
use crate::config::Config;
use crate::db::Store;
use crate::services::{
    AccountService, InboxService, Mailer, SeaOrmAccountService, SeaOrmInboxService,
    SeaOrmVerificationService, SuggestionService, TextGenerator, VerificationService,
};

/// Build a shared HTTP client for the email and suggestion providers.
/// Reused across clients so connections are pooled.
fn build_shared_http_client(timeout_seconds: u64) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_seconds))
        .user_agent(concat!("EchoBox/", env!("CARGO_PKG_VERSION")))
        .pool_max_idle_per_host(10)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build shared HTTP client: {e}"))
}

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<Config>,

    pub store: Store,

    pub verification_service: Arc<dyn VerificationService>,

    pub account_service: Arc<dyn AccountService>,

    pub inbox_service: Arc<dyn InboxService>,

    pub suggestion_service: Arc<SuggestionService>,
}

impl SharedState {
    /// Wires the production collaborators. The database is opened lazily.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let http_client = build_shared_http_client(config.server.http_timeout_seconds)?;

        let mailer = Arc::new(ResendClient::with_shared_client(
            http_client.clone(),
            config.email.clone(),
        ));
        let generator = Arc::new(GeminiClient::with_shared_client(
            http_client,
            &config.suggestions,
        ));

        Ok(Self::with_collaborators(config, mailer, generator))
    }

    /// Wires the services around caller-provided email and text backends.
    #[must_use]
    pub fn with_collaborators(
        config: Config,
        mailer: Arc<dyn Mailer>,
        generator: Arc<dyn TextGenerator>,
    ) -> Self {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        );

        let verification_service = Arc::new(SeaOrmVerificationService::new(
            store.clone(),
            mailer,
            config.security.clone(),
            &config.verification,
        )) as Arc<dyn VerificationService>;

        let account_service =
            Arc::new(SeaOrmAccountService::new(store.clone())) as Arc<dyn AccountService>;

        let inbox_service =
            Arc::new(SeaOrmInboxService::new(store.clone())) as Arc<dyn InboxService>;

        let suggestion_service = Arc::new(SuggestionService::new(generator, &config.suggestions));

        Self {
            config: Arc::new(config),
            store,
            verification_service,
            account_service,
            inbox_service,
            suggestion_service,
        }
    }
}
