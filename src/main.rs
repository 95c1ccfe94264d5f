use anyhow::{Context, Result};
use pr_review_service::api;
use pr_review_service::config::Config;
use pr_review_service::service::ReviewService;
use pr_review_service::store::{MemoryStore, SqliteStore, Store};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize logging; RUST_LOG wins over LOG_LEVEL
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .try_init()
        .context("Failed to initialize logging")?;

    log::info!(
        "Starting PR review service (reviewers per PR: {})",
        config.policy.reviewers_per_pr
    );

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for shutdown signal: {}", e);
            return;
        }
        log::info!("Shutdown signal received");
        signal_token.cancel();
    });

    if config.uses_memory_store() {
        log::warn!("Using in-memory store; state is lost on exit");
        run(MemoryStore::new(), &config, shutdown).await
    } else {
        let store = SqliteStore::open(&config.database_path)
            .await
            .with_context(|| {
                format!(
                    "Failed to open database at {}",
                    config.database_path.display()
                )
            })?;
        log::info!("Database ready at {}", config.database_path.display());
        run(store, &config, shutdown).await
    }
}

async fn run<S: Store>(store: S, config: &Config, shutdown: CancellationToken) -> Result<()> {
    let service = Arc::new(ReviewService::new(store, config.policy));
    let app = api::router(service, config.request_timeout);

    api::serve(config.bind_addr(), app, shutdown)
        .await
        .context("HTTP server failed")
}
