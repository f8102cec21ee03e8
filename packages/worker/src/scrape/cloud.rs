//! Cloud-delegated adapter: hand the job to a managed scraping actor
//! instead of fetching locally. Drop-in under the same `Scraper` contract,
//! so the dispatcher stays agnostic to where execution happens.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;
use url::Url;

use apify_client::{ApifyClient, ApifyError, ProfileItem};

use super::payload::{ProfileInfo, ScrapedPayload};
use super::{FailureKind, Platform, ScrapeOutcome, Scraper};
use crate::jobs::ScrapeJob;

pub struct CloudScraper {
    client: Arc<ApifyClient>,
}

impl CloudScraper {
    pub fn new(client: ApifyClient) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    /// Whether the managed service has an actor for this platform.
    pub fn supports(platform: Platform) -> bool {
        ApifyClient::supports_platform(platform.as_str())
    }
}

#[async_trait]
impl Scraper for CloudScraper {
    async fn scrape(&self, job: &ScrapeJob) -> Result<ScrapeOutcome> {
        let platform = job
            .platform
            .as_deref()
            .and_then(Platform::parse)
            .or_else(|| {
                Url::parse(&job.target_url)
                    .ok()
                    .as_ref()
                    .and_then(Platform::from_url)
            })
            .context("cloud scrape requires a recognized platform")?;

        let username = job
            .username_hint()
            .context("cloud scrape requires a username")?;

        info!(
            job_id = %job.id,
            platform = platform.as_str(),
            username = %username,
            "Delegating scrape to managed actor"
        );

        match self.client.scrape_profile(platform.as_str(), &username, 1).await {
            Ok(items) => Ok(outcome_from_items(platform, &username, items)),
            Err(e) => outcome_from_error(e),
        }
    }
}

fn outcome_from_items(
    platform: Platform,
    username: &str,
    items: Vec<ProfileItem>,
) -> ScrapeOutcome {
    let Some(item) = items.into_iter().next() else {
        return ScrapeOutcome::failure(
            FailureKind::NotFound,
            format!("actor returned no profile for {username} on {}", platform.as_str()),
        );
    };

    let mut payload = ScrapedPayload {
        profile: Some(ProfileInfo {
            username: item.username.or_else(|| Some(username.to_string())),
            display_name: item.full_name,
            bio: item.bio,
            avatar_url: item.avatar_url,
            website: item.external_url,
            verified: item.verified,
            ..Default::default()
        }),
        ..Default::default()
    };

    if let Some(n) = item.followers_count {
        payload.stats.insert("followers".to_string(), n);
    }
    if let Some(n) = item.follows_count {
        payload.stats.insert("following".to_string(), n);
    }
    if let Some(n) = item.posts_count {
        payload.stats.insert("posts".to_string(), n);
    }

    payload
        .metadata
        .insert("source".to_string(), "apify".into());
    if let Some(private) = item.is_private {
        payload.metadata.insert("is_private".to_string(), private.into());
    }

    ScrapeOutcome::Success(payload)
}

/// Classify a service error: transient conditions become `Failure` outcomes
/// for the retry policy, credential and actor misconfiguration propagates as
/// a hard error.
fn outcome_from_error(e: ApifyError) -> Result<ScrapeOutcome> {
    let classified = match &e {
        ApifyError::Timeout(secs) => Some((
            FailureKind::Timeout,
            format!("actor run did not finish within {secs}s"),
        )),
        ApifyError::Http(inner) if inner.is_timeout() || inner.is_connect() => {
            Some((FailureKind::Timeout, format!("service unreachable: {e}")))
        }
        ApifyError::Api { status: 429, .. } => {
            Some((FailureKind::Blocked, format!("service rate limited: {e}")))
        }
        ApifyError::Api { status, .. } if *status >= 500 => {
            Some((FailureKind::Unexpected, format!("service error: {e}")))
        }
        ApifyError::RunFailed(status) => Some((
            FailureKind::Unexpected,
            format!("actor run ended as {status}"),
        )),
        // 401/403/404, bad input, unsupported platform: misconfiguration.
        _ => None,
    };

    match classified {
        Some((kind, message)) => Ok(ScrapeOutcome::failure(kind, message)),
        None => Err(e).context("managed scraping service rejected the request"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(username: &str, followers: i64) -> ProfileItem {
        serde_json::from_value(serde_json::json!({
            "username": username,
            "followersCount": followers,
        }))
        .unwrap()
    }

    #[test]
    fn maps_actor_items_into_the_normalized_payload() {
        let outcome = outcome_from_items(Platform::Instagram, "natgeo", vec![item("natgeo", 1200)]);

        let ScrapeOutcome::Success(payload) = outcome else {
            panic!("expected success");
        };
        assert_eq!(
            payload.profile.unwrap().username.as_deref(),
            Some("natgeo")
        );
        assert_eq!(payload.stats.get("followers"), Some(&1200));
        assert_eq!(
            payload.metadata.get("source").and_then(|v| v.as_str()),
            Some("apify")
        );
    }

    #[test]
    fn empty_dataset_is_not_found() {
        let outcome = outcome_from_items(Platform::Twitter, "ghost", vec![]);
        assert!(matches!(
            outcome,
            ScrapeOutcome::Failure {
                kind: FailureKind::NotFound,
                ..
            }
        ));
    }

    #[test]
    fn transient_service_errors_become_failures() {
        let outcome = outcome_from_error(ApifyError::Timeout(300)).unwrap();
        assert!(matches!(
            outcome,
            ScrapeOutcome::Failure {
                kind: FailureKind::Timeout,
                ..
            }
        ));

        let outcome = outcome_from_error(ApifyError::Api {
            status: 429,
            message: "slow down".into(),
        })
        .unwrap();
        assert!(matches!(
            outcome,
            ScrapeOutcome::Failure {
                kind: FailureKind::Blocked,
                ..
            }
        ));
    }

    #[test]
    fn credential_errors_are_hard_errors() {
        assert!(outcome_from_error(ApifyError::Api {
            status: 401,
            message: "bad token".into(),
        })
        .is_err());
        assert!(
            outcome_from_error(ApifyError::UnsupportedPlatform("myspace".into())).is_err()
        );
    }
}
