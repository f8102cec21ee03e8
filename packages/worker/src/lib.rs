//! Background scrape worker for the OSINT dashboard.
//!
//! The dashboard inserts scrape jobs into the `scrape_jobs` table; this
//! process turns that table into a work queue without a broker. Jobs are
//! claimed atomically (`FOR UPDATE SKIP LOCKED`), dispatched to a
//! platform-specific scraper adapter, and driven through a retry state
//! machine to a terminal status the dashboard can read back by id.
//!
//! # Architecture
//!
//! ```text
//! ScrapeWorker (poll every 5s)
//!     │
//!     ├─► JobStore::claim_batch() ── queued → processing
//!     │
//!     └─► For each claimed job → Dispatcher::resolve → Scraper::scrape
//!             │
//!             ├─ Success ────────────► completed (scraped_data stored)
//!             ├─ Failure, retries left ► queued (retry_count + 1, backoff)
//!             └─ Failure, exhausted ──► failed
//! ```
//!
//! Multiple worker processes may run against the same database; correctness
//! rests on the conditional claim update, not on in-process locking.

pub mod config;
pub mod jobs;
pub mod retry;
pub mod runner;
pub mod scrape;

pub use config::Config;
pub use jobs::{JobStatus, JobStore, NewScrapeJob, ScrapeJob, SearchType};
pub use retry::{RetryDecision, RetryPolicy};
pub use runner::{ScrapeWorker, WorkerConfig, WorkerHandle};
pub use scrape::{
    Dispatcher, FailureKind, Platform, ScrapeOutcome, ScrapedPayload, Scraper, ScraperSet,
};
