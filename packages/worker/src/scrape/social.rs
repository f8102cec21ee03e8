//! Multi-probe adapter for email/phone/domain searches.
//!
//! Derives candidate usernames from the search term, probes the known
//! platforms' profile URLs concurrently, and merges whatever succeeded.
//! One bad probe never fails the job; the job only fails when every probe
//! comes back empty-handed.

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::future::join_all;
use tracing::{debug, info};
use url::Url;

use super::profile::ProfileScraper;
use super::payload::ScrapedPayload;
use super::{FailureKind, Platform, ScrapeOutcome, Scraper};
use crate::jobs::{ScrapeJob, SearchType};

/// Platforms worth probing blind. The long tail is left to explicit
/// platform jobs.
const PROBE_PLATFORMS: &[Platform] = &[
    Platform::GitHub,
    Platform::Twitter,
    Platform::Instagram,
    Platform::Reddit,
    Platform::TikTok,
    Platform::Mastodon,
];

/// Cap on concurrent probes per job.
const MAX_PROBES: usize = 12;

pub struct SocialProbeScraper {
    prober: ProfileScraper,
}

impl SocialProbeScraper {
    pub fn new(prober: ProfileScraper) -> Self {
        Self { prober }
    }

    /// The profile URLs this job would probe. Pure, for tests.
    pub(crate) fn probe_targets(job: &ScrapeJob) -> Result<Vec<(Platform, String)>> {
        let kind = job.search_type();
        let term = match kind {
            SearchType::Domain => job
                .target_username
                .clone()
                .or_else(|| {
                    Url::parse(&job.target_url)
                        .ok()
                        .and_then(|u| u.host_str().map(str::to_string))
                })
                .context("domain search requires a username or a parseable target URL")?,
            SearchType::Username => job
                .username_hint()
                .context("username search requires a username hint")?,
            SearchType::Email | SearchType::Phone => job
                .target_username
                .clone()
                .with_context(|| format!("{} search requires target_username", kind.as_str()))?,
        };

        let candidates = candidate_usernames(kind, &term);
        if candidates.is_empty() {
            anyhow::bail!("could not derive any usernames from {term:?}");
        }

        let mut targets = Vec::new();
        'outer: for candidate in &candidates {
            for platform in PROBE_PLATFORMS {
                if targets.len() >= MAX_PROBES {
                    break 'outer;
                }
                targets.push((*platform, candidate.clone()));
            }
        }

        Ok(targets)
    }
}

#[async_trait]
impl Scraper for SocialProbeScraper {
    async fn scrape(&self, job: &ScrapeJob) -> Result<ScrapeOutcome> {
        let targets = Self::probe_targets(job)?;
        info!(
            job_id = %job.id,
            probes = targets.len(),
            "Probing platforms for related profiles"
        );

        let probes = targets.into_iter().map(|(platform, username)| {
            let url = platform.profile_url(&username);
            async move {
                let outcome = self.prober.probe(&url, Some(&username)).await;
                debug!(url = %url, success = outcome.is_success(), "Probe finished");
                (url, outcome)
            }
        });

        Ok(aggregate(join_all(probes).await))
    }
}

/// Username spellings worth trying for a search term.
pub(crate) fn candidate_usernames(kind: SearchType, term: &str) -> Vec<String> {
    let term = term.trim();
    if term.is_empty() {
        return Vec::new();
    }

    let mut candidates: Vec<String> = Vec::new();
    let mut push = |c: String| {
        if !c.is_empty() && !candidates.contains(&c) {
            candidates.push(c);
        }
    };

    match kind {
        SearchType::Username => push(term.trim_start_matches('@').to_string()),
        SearchType::Email => {
            if let Some(local) = term.split('@').next() {
                let local = local.to_lowercase();
                push(local.clone());
                push(local.replace('.', ""));
                push(local.replace('.', "_"));
            }
        }
        SearchType::Phone => {
            push(term.chars().filter(|c| c.is_ascii_digit()).collect());
        }
        SearchType::Domain => {
            let host = term
                .trim_start_matches("https://")
                .trim_start_matches("http://");
            let host = host.split('/').next().unwrap_or(host);
            let host = host.strip_prefix("www.").unwrap_or(host);
            if let Some(label) = host.split('.').next() {
                push(label.to_lowercase());
            }
        }
    }

    candidates
}

/// Merge probe outcomes: any success wins, with the successful fragments
/// unioned; otherwise report the dominant failure kind.
pub(crate) fn aggregate(outcomes: Vec<(String, ScrapeOutcome)>) -> ScrapeOutcome {
    let total = outcomes.len();
    let mut merged: Option<ScrapedPayload> = None;
    let mut matched_urls = Vec::new();
    let mut timeouts = 0usize;
    let mut not_found = 0usize;
    let mut blocked = 0usize;
    let mut unexpected = 0usize;

    for (url, outcome) in outcomes {
        match outcome {
            ScrapeOutcome::Success(payload) => {
                matched_urls.push(url);
                merged = Some(match merged.take() {
                    Some(acc) => acc.merge(payload),
                    None => payload,
                });
            }
            ScrapeOutcome::Failure { kind, .. } => match kind {
                FailureKind::Timeout => timeouts += 1,
                FailureKind::NotFound => not_found += 1,
                FailureKind::Blocked => blocked += 1,
                FailureKind::Unexpected => unexpected += 1,
            },
        }
    }

    if let Some(mut payload) = merged {
        payload.metadata.insert(
            "matched_profiles".to_string(),
            serde_json::Value::Array(
                matched_urls
                    .into_iter()
                    .map(serde_json::Value::String)
                    .collect(),
            ),
        );
        return ScrapeOutcome::Success(payload);
    }

    // No probe succeeded. Blocked outranks timeout outranks unexpected, so
    // the retry policy backs off for the condition most likely to persist.
    let kind = if blocked > 0 {
        FailureKind::Blocked
    } else if timeouts > 0 {
        FailureKind::Timeout
    } else if unexpected > 0 {
        FailureKind::Unexpected
    } else {
        FailureKind::NotFound
    };

    ScrapeOutcome::failure(
        kind,
        format!(
            "all {total} probes failed ({timeouts} timeout, {not_found} not found, {blocked} blocked, {unexpected} unexpected)"
        ),
    )
}
