use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::time::Duration;

use crate::runner::WorkerConfig;

/// Worker configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub mock_mode: bool,
    pub poll_interval_ms: u64,
    pub max_concurrent_jobs: usize,
    pub scrape_timeout_secs: u64,
    pub job_deadline_secs: Option<u64>,
    pub stale_after_secs: u64,
    pub apify_api_token: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            mock_mode: env::var("MOCK_MODE")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            poll_interval_ms: env::var("POLL_INTERVAL_MS")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()
                .context("POLL_INTERVAL_MS must be a valid number")?,
            max_concurrent_jobs: env::var("MAX_CONCURRENT_JOBS")
                .unwrap_or_else(|_| "1".to_string())
                .parse()
                .context("MAX_CONCURRENT_JOBS must be a valid number")?,
            scrape_timeout_secs: env::var("SCRAPE_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .context("SCRAPE_TIMEOUT_SECS must be a valid number")?,
            job_deadline_secs: match env::var("JOB_DEADLINE_SECS") {
                Ok(v) => Some(v.parse().context("JOB_DEADLINE_SECS must be a valid number")?),
                Err(_) => None,
            },
            stale_after_secs: env::var("STALE_AFTER_SECS")
                .unwrap_or_else(|_| "120".to_string())
                .parse()
                .context("STALE_AFTER_SECS must be a valid number")?,
            apify_api_token: env::var("APIFY_API_TOKEN").ok(),
        })
    }

    /// Runner settings derived from this configuration.
    pub fn worker_config(&self) -> WorkerConfig {
        WorkerConfig {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            max_concurrent_jobs: self.max_concurrent_jobs.max(1),
            job_deadline: self.job_deadline_secs.map(Duration::from_secs),
            stale_after: Duration::from_secs(self.stale_after_secs),
            ..WorkerConfig::default()
        }
    }

    pub fn scrape_timeout(&self) -> Duration {
        Duration::from_secs(self.scrape_timeout_secs)
    }
}
