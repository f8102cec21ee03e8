//! Pure Apify REST API client.
//!
//! A minimal client for the Apify platform API. Supports starting actor runs,
//! polling for completion, and fetching dataset results. Used by the scrape
//! worker to delegate profile collection to managed actors instead of
//! scraping locally.
//!
//! # Example
//!
//! ```rust,ignore
//! use apify_client::ApifyClient;
//!
//! let client = ApifyClient::new("your-api-token".into());
//!
//! let profiles = client.scrape_profile("instagram", "natgeo", 1).await?;
//! for profile in &profiles {
//!     println!("{}", profile.username.as_deref().unwrap_or("(unknown)"));
//! }
//! ```

pub mod error;
pub mod types;

pub use error::{ApifyError, Result};
pub use types::{ProfileItem, ProfileScraperInput, RunData};

use serde::de::DeserializeOwned;
use std::time::Duration;
use types::ApiResponse;

const BASE_URL: &str = "https://api.apify.com/v2";

/// Overall deadline for a single actor run, in seconds.
const RUN_DEADLINE_SECS: u64 = 300;

/// Actor IDs for the profile scrapers, keyed by platform name.
const PROFILE_SCRAPER_ACTORS: &[(&str, &str)] = &[
    ("instagram", "dSCLg0C3YEZ83HzYX"),
    ("twitter", "V38PZzpEgOfeeWvZY"),
    ("tiktok", "GdWCkxBtKWOsKjdch"),
];

pub struct ApifyClient {
    client: reqwest::Client,
    token: String,
}

impl ApifyClient {
    pub fn new(token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            token,
        }
    }

    /// Look up the actor that scrapes profiles for `platform`.
    pub fn actor_for_platform(platform: &str) -> Result<&'static str> {
        PROFILE_SCRAPER_ACTORS
            .iter()
            .find(|(name, _)| *name == platform)
            .map(|(_, actor)| *actor)
            .ok_or_else(|| ApifyError::UnsupportedPlatform(platform.to_string()))
    }

    /// Whether a managed actor exists for `platform`.
    pub fn supports_platform(platform: &str) -> bool {
        Self::actor_for_platform(platform).is_ok()
    }

    /// Start an actor run. Returns immediately with run metadata.
    pub async fn start_actor_run<I: serde::Serialize>(
        &self,
        actor_id: &str,
        input: &I,
    ) -> Result<RunData> {
        let url = format!("{}/acts/{}/runs", BASE_URL, actor_id);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(input)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApifyError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let api_resp: ApiResponse<RunData> = resp.json().await?;
        Ok(api_resp.data)
    }

    /// Poll until a run completes. Uses `waitForFinish=60` for efficient
    /// long-polling, bounded by an overall deadline.
    pub async fn wait_for_run(&self, run_id: &str) -> Result<RunData> {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(RUN_DEADLINE_SECS);

        loop {
            if tokio::time::Instant::now() >= deadline {
                return Err(ApifyError::Timeout(RUN_DEADLINE_SECS));
            }

            let url = format!("{}/actor-runs/{}?waitForFinish=60", BASE_URL, run_id);
            let resp = self
                .client
                .get(&url)
                .bearer_auth(&self.token)
                .send()
                .await?;

            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(ApifyError::Api {
                    status: status.as_u16(),
                    message: body,
                });
            }

            let api_resp: ApiResponse<RunData> = resp.json().await?;
            match api_resp.data.status.as_str() {
                "SUCCEEDED" => return Ok(api_resp.data),
                "FAILED" | "ABORTED" | "TIMED-OUT" => {
                    return Err(ApifyError::RunFailed(api_resp.data.status));
                }
                _ => {
                    tracing::debug!(run_id, status = %api_resp.data.status, "Run still in progress");
                    continue;
                }
            }
        }
    }

    /// Fetch dataset items from a completed run.
    pub async fn get_dataset_items<T: DeserializeOwned>(
        &self,
        dataset_id: &str,
    ) -> Result<Vec<T>> {
        let url = format!("{}/datasets/{}/items?format=json", BASE_URL, dataset_id);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApifyError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let items: Vec<T> = resp.json().await?;
        Ok(items)
    }

    /// Scrape a profile end-to-end: start run, poll, fetch results.
    pub async fn scrape_profile(
        &self,
        platform: &str,
        username: &str,
        limit: u32,
    ) -> Result<Vec<ProfileItem>> {
        let actor_id = Self::actor_for_platform(platform)?;

        tracing::info!(platform, username, limit, "Starting managed profile scrape");

        let input = ProfileScraperInput {
            usernames: vec![username.to_string()],
            results_limit: limit,
        };

        let run = self.start_actor_run(actor_id, &input).await?;
        tracing::info!(run_id = %run.id, "Apify run started, polling for completion");

        let completed = self.wait_for_run(&run.id).await?;
        tracing::info!(
            run_id = %completed.id,
            dataset_id = %completed.default_dataset_id,
            "Run completed, fetching results"
        );

        let items: Vec<ProfileItem> = self
            .get_dataset_items(&completed.default_dataset_id)
            .await?;
        tracing::info!(count = items.len(), "Fetched profile items");

        Ok(items)
    }
}
