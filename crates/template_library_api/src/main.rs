//! Template Library REST API Server
//!
//! Main binary for running the API server.
//!
//! # Environment Variables
//!
//! - `TEMPLATE_LIBRARY_CONFIG`: Configuration file (default: template-library.toml)
//! - `API_PORT`: Port to listen on (default: 8080)
//! - `API_HOST`: Host to bind to (default: 0.0.0.0)
//! - `RUST_LOG`: Log filter (default: info)
//! - `TEMPLATE_LIBRARY_JWT_SECRET`: Token signing secret, unless `[auth]` names another variable

use std::sync::Arc;

use anyhow::Context;
use prometheus::Registry;
use template_library_api::{AppConfig, ApiServer, AppState, LogFormat, TokenVerifier, API_VERSION};
use template_library_core::{
    InMemoryDocumentStore, LoggingNotificationSender, NotificationSender,
    PrometheusWorkflowMetrics, StaticRoleDirectory, TemplateLibrary, TemplateUrls,
    WebhookNotificationSender,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("Failed to load configuration")?;

    init_tracing(&config);

    let registry = Registry::new();
    let library = build_library(&config, &registry)?;
    let tokens = TokenVerifier::new(
        &config
            .auth
            .jwt_secret()
            .context("Token signing secret is required")?,
    );

    let state = AppState::new(Arc::new(library), registry, tokens);
    let server = ApiServer::new(config.api_config(), state);

    tracing::info!("Starting Template Library API server");
    tracing::info!("API version: {}", API_VERSION);
    tracing::info!(
        project_id = %config.store.project_id,
        admins = config.library.admins.len(),
        "Template library configured"
    );

    // Start server with graceful shutdown
    server.serve().await
}

fn init_tracing(config: &AppConfig) {
    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));

    match config.logging.format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

fn build_library(config: &AppConfig, registry: &Registry) -> anyhow::Result<TemplateLibrary> {
    let store = Arc::new(InMemoryDocumentStore::new(&config.store.project_id));
    let oracle = Arc::new(StaticRoleDirectory::new(config.library.admins.iter()));
    let urls = TemplateUrls::new(&config.library.console_base_url)
        .context("Invalid console_base_url")?;
    let metrics = PrometheusWorkflowMetrics::new(registry)
        .context("Failed to register workflow metrics")?;

    let notifier: Arc<dyn NotificationSender> = match &config.notifications.webhook_url {
        Some(webhook_url) => {
            let url: url::Url = webhook_url.parse().context("Invalid webhook_url")?;
            let secret = config
                .notifications
                .webhook_secret()
                .context("Webhook signing secret is required")?;
            tracing::info!(webhook = %webhook_url, "Delivering notifications by webhook");
            Arc::new(WebhookNotificationSender::new(
                url,
                secret,
                config.notifications.timeout(),
            )?)
        }
        None => {
            tracing::info!("No webhook configured, notifications are only logged");
            Arc::new(LoggingNotificationSender)
        }
    };

    Ok(
        TemplateLibrary::new(store.clone(), store, oracle, notifier, urls)
            .with_metrics(Arc::new(metrics))
            .with_settings(config.workflow_settings()),
    )
}
