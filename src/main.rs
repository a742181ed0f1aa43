use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::Router;
use migration::MigratorTrait;
use ngo_ledger::auth::{AuthService, SessionStore};
use ngo_ledger::config::ApiConfig;
use ngo_ledger::http;
use ngo_ledger::ledger::Ledger;
use ngo_ledger::payments::{CommerceClient, PaymentGateway, WebhookVerifier};
use ngo_ledger::state::AppState;
use sea_orm::ConnectOptions;
use sea_orm::Database;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let config = ApiConfig::load().context("Failed to load configuration")?;
    info!(?config, "Configuration loaded");
    let database = connect_database(&config).await?;
    run_migrations(&database).await?;

    let commerce =
        CommerceClient::new(&config.payments).context("Failed to initialize payment client")?;
    info!(timeout_ms = commerce.timeout().as_millis() as u64, "Payment client ready");
    let gateway: Arc<dyn PaymentGateway> = Arc::new(commerce);
    let webhooks = Arc::new(WebhookVerifier::new(&config.payments.webhook_secret));

    let ledger = Ledger::new(database);
    let sessions = Arc::new(SessionStore::new(
        config.auth.session_ttl(),
        config.auth.session_max_capacity,
    ));
    let auth = AuthService::new(ledger.clone(), sessions, config.auth.password_pepper.clone());
    let app_state = AppState::new(ledger, auth, gateway, webhooks, config.withdrawals.clone());

    let listener = TcpListener::bind(config.server.address())
        .await
        .context("Failed to bind HTTP listener")?;
    let local_addr = listener
        .local_addr()
        .context("Failed to obtain listener address")?;
    info!("NGO ledger API listening on {local_addr}");

    let router: Router = http::router(app_state);
    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server exited with error")?;

    info!("Server stopped");
    Ok(())
}

fn init_tracing() {
    let default_filter = "info";
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.to_string());
    assert!(!filter.is_empty(), "Tracing filter must not be empty");
    assert!(filter.len() < 256, "Tracing filter length exceeds bounds");

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .compact()
        .init();
}

async fn connect_database(config: &ApiConfig) -> Result<sea_orm::DatabaseConnection> {
    let mut options = ConnectOptions::new(config.database.url.clone());
    options
        .max_connections(config.database.max_connections)
        .sqlx_logging(true)
        .sqlx_logging_level(tracing::log::LevelFilter::Debug)
        .acquire_timeout(Duration::from_secs(10));

    if let Some(min) = config.database.min_connections {
        options.min_connections(min);
    }

    assert!(
        config.database.max_connections >= config.database.min_connections.unwrap_or(1),
        "Max connections must be >= min connections"
    );
    assert!(
        config.database.max_connections <= 128,
        "Connection pool oversized"
    );

    Database::connect(options)
        .await
        .context("Failed to connect to the ledger database")
}

async fn run_migrations(database: &sea_orm::DatabaseConnection) -> Result<()> {
    migration::Migrator::up(database, None)
        .await
        .context("Database migrations failed")
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {err}");
        return;
    }
    info!("Shutdown signal received");
}
