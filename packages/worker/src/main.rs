// Main entry point for the scrape worker

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use apify_client::ApifyClient;
use worker_core::scrape::cloud::CloudScraper;
use worker_core::scrape::mock::MockScraper;
use worker_core::scrape::profile::ProfileScraper;
use worker_core::scrape::social::SocialProbeScraper;
use worker_core::{Config, Dispatcher, JobStore, Platform, ScrapeWorker, Scraper, ScraperSet};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,worker_core=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting OSINT scrape worker");

    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!("Configuration loaded");

    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connected");

    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;
    tracing::info!("Migrations complete");

    let store = JobStore::new(pool);
    for (status, count) in store.counts_by_status().await? {
        tracing::info!(status = ?status, count, "Queue depth at startup");
    }

    let dispatcher = build_dispatcher(&config)?;
    let worker = ScrapeWorker::new(store, dispatcher, config.worker_config());
    let handle = worker.start();

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    tracing::info!("Shutdown signal received; finishing in-flight jobs");

    handle.shutdown();
    handle.wait_for_shutdown().await;
    tracing::info!("Worker shut down cleanly");

    Ok(())
}

/// Wire up the adapter set from configuration. Mock mode swaps the whole
/// resolver so no business logic ever checks a flag.
fn build_dispatcher(config: &Config) -> Result<Dispatcher> {
    if config.mock_mode {
        tracing::warn!("MOCK_MODE enabled; all jobs will be served canned data");
        return Ok(Dispatcher::fixed(Arc::new(MockScraper::new())));
    }

    let timeout = config.scrape_timeout();
    let profile = Arc::new(ProfileScraper::new(timeout)?);
    let social = Arc::new(SocialProbeScraper::new(ProfileScraper::new(timeout)?));

    let cloud: Option<Arc<dyn Scraper>> = match &config.apify_api_token {
        Some(token) => {
            tracing::info!("Cloud-delegated scraping enabled");
            Some(Arc::new(CloudScraper::new(ApifyClient::new(token.clone()))))
        }
        None => None,
    };

    let cloud_platforms: Vec<Platform> = Platform::ALL
        .iter()
        .copied()
        .filter(|p| CloudScraper::supports(*p))
        .collect();

    Ok(Dispatcher::standard(ScraperSet {
        profile,
        social,
        cloud,
        cloud_platforms,
    }))
}
