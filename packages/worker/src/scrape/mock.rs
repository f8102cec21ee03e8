//! Canned adapter for integration tests and `MOCK_MODE`.
//!
//! Returns deterministic outcomes with zero network I/O, so the claim loop
//! and state machine can be exercised without live targets. Scripted
//! outcomes are consumed in order; once the script runs dry every further
//! call yields the default outcome.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use uuid::Uuid;

use super::payload::{ProfileInfo, ScrapedPayload};
use super::{FailureKind, ScrapeOutcome, Scraper};
use crate::jobs::ScrapeJob;

pub struct MockScraper {
    script: Mutex<VecDeque<ScrapeOutcome>>,
    default_outcome: Option<ScrapeOutcome>,
    calls: Mutex<Vec<Uuid>>,
}

impl MockScraper {
    /// Always succeeds with a canned payload derived from the job.
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            default_outcome: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Play back `outcomes` in order, then fall back to canned successes.
    pub fn with_script(outcomes: impl IntoIterator<Item = ScrapeOutcome>) -> Self {
        Self {
            script: Mutex::new(outcomes.into_iter().collect()),
            default_outcome: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every call fails the same way.
    pub fn always_failing(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            default_outcome: Some(ScrapeOutcome::failure(kind, message)),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// How many times `scrape` was invoked.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// The job ids seen, in invocation order.
    pub fn calls(&self) -> Vec<Uuid> {
        self.calls.lock().unwrap().clone()
    }

    /// The deterministic payload for a job, keyed off its username hint.
    pub fn canned_payload(job: &ScrapeJob) -> ScrapedPayload {
        let username = job
            .username_hint()
            .unwrap_or_else(|| "unknown".to_string());

        let mut payload = ScrapedPayload {
            profile: Some(ProfileInfo {
                username: Some(username.clone()),
                display_name: Some(format!("Mock {username}")),
                bio: Some("Deterministic mock profile".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        payload.stats.insert("followers".to_string(), 42);
        payload.stats.insert("posts".to_string(), 7);
        payload
            .metadata
            .insert("mock".to_string(), true.into());
        payload
    }
}

impl Default for MockScraper {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Scraper for MockScraper {
    async fn scrape(&self, job: &ScrapeJob) -> Result<ScrapeOutcome> {
        self.calls.lock().unwrap().push(job.id);

        if let Some(outcome) = self.script.lock().unwrap().pop_front() {
            return Ok(outcome);
        }

        if let Some(outcome) = &self.default_outcome {
            return Ok(outcome.clone());
        }

        Ok(ScrapeOutcome::Success(Self::canned_payload(job)))
    }
}
