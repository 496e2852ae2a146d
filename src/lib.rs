pub mod api;
pub mod cli;
pub mod clients;
pub mod config;
pub mod db;
pub mod domain;
pub mod entities;
pub mod services;
pub mod state;

use std::sync::Arc;
use tokio::signal;

use anyhow::Context;
use cli::{Cli, Commands};
pub use config::Config;
use state::SharedState;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

pub async fn run(cli: Cli, config: Config) -> anyhow::Result<()> {
    match cli.command.unwrap_or_default() {
        Commands::Serve => {
            config.validate()?;
            let prometheus_handle = init_observability(&config)?;
            run_server(config, prometheus_handle).await
        }
        Commands::InitConfig { force } => {
            let path = cli.config.unwrap_or_else(Config::default_config_path);
            if force {
                Config::default().save_to_path(&path)?;
            } else if !Config::create_default_if_missing(&path)? {
                println!("Config already exists at {}", path.display());
                println!("Use --force to overwrite it");
                return Ok(());
            }
            println!("Wrote default config to {}", path.display());
            Ok(())
        }
        Commands::Check => {
            config.validate()?;
            init_observability(&config)?;
            run_check(config).await
        }
    }
}

/// Installs the metrics recorder and the tracing subscriber. Must run inside
/// the runtime because the Loki exporter is a background task.
fn init_observability(
    config: &Config,
) -> anyhow::Result<Option<metrics_exporter_prometheus::PrometheusHandle>> {
    let prometheus_handle = if config.observability.metrics_enabled {
        use metrics_exporter_prometheus::PrometheusBuilder;
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("Failed to install Prometheus recorder")?;
        Some(handle)
    } else {
        None
    };

    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));

    let json = config.general.json_logs;
    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(|| tracing_subscriber::fmt::layer()));

    if config.observability.loki_enabled {
        let url = url::Url::parse(&config.observability.loki_url).context("Invalid Loki URL")?;

        let mut builder = tracing_loki::builder();
        for (key, value) in &config.observability.loki_labels {
            builder = builder.label(key.as_str(), value.as_str())?;
        }
        let (layer, task) = builder
            .extra_field("version", env!("CARGO_PKG_VERSION"))?
            .build_url(url)?;

        tokio::spawn(task);

        registry.with(layer).init();
        info!(
            "Loki logging initialized at {}",
            config.observability.loki_url
        );
    } else {
        registry.init();
    }

    if prometheus_handle.is_some() {
        info!("Prometheus metrics recorder initialized");
    }

    Ok(prometheus_handle)
}

async fn run_server(
    config: Config,
    prometheus_handle: Option<metrics_exporter_prometheus::PrometheusHandle>,
) -> anyhow::Result<()> {
    info!("EchoBox v{} starting...", env!("CARGO_PKG_VERSION"));

    let port = config.server.port;
    let state = api::create_app_state_from_config(config, prometheus_handle)?;

    // The pool is opened lazily; a failure here is retried on first use.
    if let Err(e) = state.store().acquire().await {
        warn!("Database not reachable at startup: {e:#}");
    }

    let app = api::router(Arc::clone(&state))?;
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!("Web server running at http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Web server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => error!("Error listening for shutdown: {}", e),
    }
}

async fn run_check(config: Config) -> anyhow::Result<()> {
    let shared = SharedState::new(config)?;

    shared
        .store
        .ping()
        .await
        .context("Database check failed")?;
    println!("  Database:    ok ({})", shared.config.general.database_path);

    let email = if shared.config.email.is_configured() {
        "configured"
    } else {
        "missing RESEND_API_KEY"
    };
    println!("  Email:       {email}");

    let suggestions = if shared.config.suggestions.api_key.is_some() {
        "configured"
    } else {
        "missing GOOGLE_API_KEY"
    };
    println!("  Suggestions: {suggestions}");

    if shared.config.server.session_secret.is_none() {
        println!("  Sessions:    no SESSION_SECRET, sessions end on restart");
    }

    Ok(())
}
