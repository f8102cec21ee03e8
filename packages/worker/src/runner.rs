//! The claim loop: polls the store, claims eligible jobs, and drives each
//! one through the retry state machine.
//!
//! One `ScrapeWorker` owns its configuration and store handle and is
//! constructed once at process entry. `start()` spawns the loop;
//! `WorkerHandle::shutdown()` stops new claims while in-flight jobs finish.
//! Store connectivity failures never kill the loop, and a poisoned job is
//! isolated to its own task.

use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, error, info, trace, warn};

use crate::jobs::{JobStore, ScrapeJob};
use crate::retry::{RetryDecision, RetryPolicy};
use crate::scrape::{Dispatcher, FailureKind, ScrapeOutcome};

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// How often to poll for eligible jobs.
    pub poll_interval: Duration,
    /// Maximum random addition to each poll sleep, against thundering herds
    /// when several workers share one store.
    pub jitter: Duration,
    /// Upper bound on jobs in flight at once.
    pub max_concurrent_jobs: usize,
    /// Optional hard deadline per job; on expiry the job is abandoned and
    /// requeued like a transient failure.
    pub job_deadline: Option<Duration>,
    /// A `processing` row untouched for this long is presumed orphaned by a
    /// dead worker.
    pub stale_after: Duration,
    /// How often to run the stale-claim reconciliation after startup.
    pub stale_check_interval: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(5000),
            jitter: Duration::from_millis(100),
            max_concurrent_jobs: 1,
            job_deadline: None,
            stale_after: Duration::from_secs(120),
            stale_check_interval: Duration::from_secs(60),
        }
    }
}

pub struct ScrapeWorker {
    store: JobStore,
    dispatcher: Arc<Dispatcher>,
    retry: RetryPolicy,
    config: WorkerConfig,
}

impl ScrapeWorker {
    pub fn new(store: JobStore, dispatcher: Dispatcher, config: WorkerConfig) -> Self {
        Self {
            store,
            dispatcher: Arc::new(dispatcher),
            retry: RetryPolicy::new(config.poll_interval),
            config,
        }
    }

    /// Spawn the claim loop. The returned handle controls shutdown.
    pub fn start(self) -> WorkerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(self.run(shutdown_rx));

        WorkerHandle {
            shutdown: shutdown_tx,
            handle,
        }
    }

    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            poll_interval = ?self.config.poll_interval,
            max_concurrent_jobs = self.config.max_concurrent_jobs,
            "Scrape worker started"
        );

        self.reconcile_stale().await;
        let mut last_reconcile = Instant::now();

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_jobs));
        let mut tasks: JoinSet<()> = JoinSet::new();

        while !*shutdown.borrow() {
            if last_reconcile.elapsed() >= self.config.stale_check_interval {
                self.reconcile_stale().await;
                last_reconcile = Instant::now();
            }

            // Reap finished job tasks without blocking the tick.
            while let Some(result) = tasks.try_join_next() {
                if let Err(e) = result {
                    error!(error = %e, "Job task panicked");
                }
            }

            let free_slots = semaphore.available_permits();
            let claimed = if free_slots == 0 {
                Vec::new()
            } else {
                match self.store.claim_batch(free_slots as i64).await {
                    Ok(jobs) => jobs,
                    Err(e) => {
                        // Store connectivity trouble: log and try again next
                        // tick rather than terminating the process.
                        error!(error = %e, "Failed to poll for jobs");
                        Vec::new()
                    }
                }
            };

            let claimed_any = !claimed.is_empty();
            for job in claimed {
                let Ok(permit) = semaphore.clone().acquire_owned().await else {
                    break;
                };

                let store = self.store.clone();
                let dispatcher = self.dispatcher.clone();
                let retry = self.retry;
                let deadline = self.config.job_deadline;

                tasks.spawn(async move {
                    let _permit = permit;
                    process_job(&store, &dispatcher, retry, deadline, job).await;
                });
            }

            if claimed_any {
                // Queue may hold more eligible work; claim again right away.
                continue;
            }

            trace!("No eligible jobs; sleeping until next poll");
            let sleep_duration = self.sleep_duration_with_jitter();
            tokio::select! {
                _ = sleep(sleep_duration) => {}
                _ = shutdown.changed() => {}
            }
        }

        info!(in_flight = tasks.len(), "Shutdown requested; draining in-flight jobs");
        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                error!(error = %e, "Job task panicked during drain");
            }
        }
        info!("Scrape worker stopped");
    }

    /// Requeue claims orphaned by workers that died without cleanup.
    async fn reconcile_stale(&self) {
        match self.store.requeue_stale(self.config.stale_after).await {
            Ok((0, 0)) => {}
            Ok((requeued, failed)) => {
                warn!(requeued, failed, "Reconciled stale processing claims");
            }
            Err(e) => {
                error!(error = %e, "Stale-claim reconciliation failed");
            }
        }
    }

    /// Poll sleep with random jitter applied.
    fn sleep_duration_with_jitter(&self) -> Duration {
        if self.config.jitter.is_zero() {
            return self.config.poll_interval;
        }

        let jitter_millis = u64::try_from(self.config.jitter.as_millis()).unwrap_or(u64::MAX);
        let random_jitter = rand::thread_rng().gen_range(0..=jitter_millis);
        self.config.poll_interval + Duration::from_millis(random_jitter)
    }
}

/// Run one claimed job to its next state. Every error path ends here; the
/// claim loop never sees a failure from a single job.
async fn process_job(
    store: &JobStore,
    dispatcher: &Dispatcher,
    retry: RetryPolicy,
    deadline: Option<Duration>,
    job: ScrapeJob,
) {
    debug!(job_id = %job.id, target_url = %job.target_url, "Running scrape job");

    let scraper = dispatcher.resolve(&job);
    let result = match deadline {
        Some(limit) => match timeout(limit, scraper.scrape(&job)).await {
            Ok(result) => result,
            Err(_) => Ok(ScrapeOutcome::failure(
                FailureKind::Timeout,
                format!("job exceeded the hard deadline of {limit:?}"),
            )),
        },
        None => scraper.scrape(&job).await,
    };

    let applied = match result {
        Ok(ScrapeOutcome::Success(payload)) => {
            info!(job_id = %job.id, "Scrape job completed");
            store.mark_completed(job.id, &payload).await
        }
        Ok(ScrapeOutcome::Failure { kind, message }) => {
            if kind == FailureKind::Unexpected {
                error!(job_id = %job.id, %message, "Adapter reported an unexpected failure");
            }

            match retry.decide(job.retry_count, job.max_retries, kind) {
                RetryDecision::Requeue { delay } => {
                    warn!(
                        job_id = %job.id,
                        retry_count = job.retry_count + 1,
                        max_retries = job.max_retries,
                        delay = ?delay,
                        %message,
                        "Scrape failed; requeueing"
                    );
                    store.requeue_for_retry(job.id, &message, delay).await
                }
                RetryDecision::Fail => {
                    warn!(job_id = %job.id, %message, "Scrape failed; retries exhausted");
                    store.mark_failed(job.id, &message).await
                }
            }
        }
        Err(e) => {
            // Misconfiguration or malformed input: not transient, so no
            // retry is consumed.
            error!(job_id = %job.id, error = %format!("{e:#}"), "Adapter hard error");
            store.mark_failed(job.id, &format!("{e:#}")).await
        }
    };

    match applied {
        Ok(true) => {}
        Ok(false) => {
            // Conditional update hit zero rows: another actor moved the job.
            warn!(job_id = %job.id, "Job was no longer ours; dropping result");
        }
        Err(e) => {
            error!(job_id = %job.id, error = %e, "Failed to persist job transition");
        }
    }
}

/// Handle to a started worker.
pub struct WorkerHandle {
    shutdown: watch::Sender<bool>,
    handle: tokio::task::JoinHandle<()>,
}

impl WorkerHandle {
    /// Stop claiming new jobs. In-flight jobs are allowed to finish.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }

    /// Wait for the loop (and its in-flight jobs) to wind down.
    pub async fn wait_for_shutdown(self) {
        if let Err(e) = self.handle.await {
            warn!(error = %e, "Worker task panicked");
        }
    }
}
