//! Scraper adapters and their shared contract.
//!
//! One capability — `Scraper::scrape(job) -> ScrapeOutcome` — with a closed
//! set of implementations: the generic profile scraper, the multi-probe
//! social scraper, the cloud-delegated scraper, and the mock. Ordinary
//! collection failures (missing profile, timeout, blocked) are `Failure`
//! outcomes, never errors; `Err` is reserved for misconfiguration and makes
//! the runner fail the job immediately without consuming a retry.

pub mod cloud;
pub mod dispatch;
pub mod mock;
mod payload;
mod platform;
pub mod profile;
pub mod social;

pub use dispatch::{Dispatcher, ScraperSet};
pub use payload::{ActivitySignals, ContactInfo, ProfileInfo, ScrapedPayload};
pub use platform::Platform;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::jobs::ScrapeJob;

/// Why a collection attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The target did not answer in time (includes connect failures).
    Timeout,
    /// The target has no discoverable presence, as far as we can tell.
    NotFound,
    /// Anti-bot measures or rate limiting got in the way.
    Blocked,
    /// Anything else; loud in the logs because it usually means an adapter
    /// needs maintenance.
    Unexpected,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::Timeout => "timeout",
            FailureKind::NotFound => "not found",
            FailureKind::Blocked => "blocked",
            FailureKind::Unexpected => "unexpected",
        };
        f.write_str(s)
    }
}

/// The adapter's verdict on one job: data or a classified failure, never both.
#[derive(Debug, Clone, PartialEq)]
pub enum ScrapeOutcome {
    Success(ScrapedPayload),
    Failure { kind: FailureKind, message: String },
}

impl ScrapeOutcome {
    pub fn failure(kind: FailureKind, message: impl Into<String>) -> Self {
        ScrapeOutcome::Failure {
            kind,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ScrapeOutcome::Success(_))
    }
}

/// The one contract every adapter implements.
#[async_trait]
pub trait Scraper: Send + Sync {
    async fn scrape(&self, job: &ScrapeJob) -> anyhow::Result<ScrapeOutcome>;
}
