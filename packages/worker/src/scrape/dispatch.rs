//! Maps a job to the adapter that will run it.
//!
//! Resolution is a pure function of the job: explicit platform hint first,
//! then the URL host against the known-domain table, then the generic
//! profile adapter. Mock mode and tests swap the whole resolver instead of
//! branching inside business logic.

use std::sync::Arc;
use tracing::debug;
use url::Url;

use super::{Platform, Scraper};
use crate::jobs::{ScrapeJob, SearchType};

/// The real adapter set: one generic profile scraper, one multi-probe
/// scraper for email/phone/domain searches, and optionally the
/// cloud-delegated scraper for platforms the managed service covers.
pub struct ScraperSet {
    pub profile: Arc<dyn Scraper>,
    pub social: Arc<dyn Scraper>,
    pub cloud: Option<Arc<dyn Scraper>>,
    /// Which platforms the cloud scraper should take over.
    pub cloud_platforms: Vec<Platform>,
}

impl ScraperSet {
    fn resolve(&self, job: &ScrapeJob) -> Arc<dyn Scraper> {
        match job.search_type() {
            SearchType::Email | SearchType::Phone | SearchType::Domain => {
                return self.social.clone();
            }
            SearchType::Username => {}
        }

        let platform = detect_platform(job);

        if let (Some(platform), Some(cloud)) = (platform, &self.cloud) {
            if self.cloud_platforms.contains(&platform) {
                debug!(job_id = %job.id, platform = platform.as_str(), "Routing to cloud scraper");
                return cloud.clone();
            }
        }

        self.profile.clone()
    }
}

/// Explicit hint if recognized, else inferred from the URL host.
pub fn detect_platform(job: &ScrapeJob) -> Option<Platform> {
    job.platform
        .as_deref()
        .and_then(Platform::parse)
        .or_else(|| {
            Url::parse(&job.target_url)
                .ok()
                .as_ref()
                .and_then(Platform::from_url)
        })
}

/// The adapter-resolution function the claim loop consumes. Constructed
/// once at startup and shared across job tasks.
pub struct Dispatcher {
    resolve: Box<dyn Fn(&ScrapeJob) -> Arc<dyn Scraper> + Send + Sync>,
}

impl Dispatcher {
    /// Standard resolution over a real adapter set.
    pub fn standard(set: ScraperSet) -> Self {
        Self {
            resolve: Box::new(move |job| set.resolve(job)),
        }
    }

    /// Every job goes to the same adapter. Used for mock mode and tests.
    pub fn fixed(scraper: Arc<dyn Scraper>) -> Self {
        Self {
            resolve: Box::new(move |_| scraper.clone()),
        }
    }

    /// Custom resolution function.
    pub fn new(resolve: impl Fn(&ScrapeJob) -> Arc<dyn Scraper> + Send + Sync + 'static) -> Self {
        Self {
            resolve: Box::new(resolve),
        }
    }

    pub fn resolve(&self, job: &ScrapeJob) -> Arc<dyn Scraper> {
        (self.resolve)(job)
    }
}
