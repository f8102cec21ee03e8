//! End-to-end claim-loop scenarios with the mock adapter: the full
//! queued → processing → terminal lifecycle, retries included.

mod common;

use common::{enqueue_github_job, fast_worker_config, setup, wait_for_terminal};
use async_trait::async_trait;
use std::sync::Arc;
use worker_core::scrape::mock::MockScraper;
use worker_core::scrape::{FailureKind, ScrapeOutcome, Scraper};
use worker_core::{Dispatcher, JobStatus, JobStore, ScrapeJob, ScrapeWorker};

#[tokio::test]
async fn job_that_fails_twice_then_succeeds_completes_with_two_retries() -> anyhow::Result<()> {
    let db = setup().await?;
    let store = JobStore::new(db.pool.clone());

    let mock = Arc::new(MockScraper::with_script([
        ScrapeOutcome::failure(FailureKind::Timeout, "scrape timeout (attempt 1)"),
        ScrapeOutcome::failure(FailureKind::Timeout, "scrape timeout (attempt 2)"),
    ]));

    let job = enqueue_github_job(&store, 3).await?;
    let worker = ScrapeWorker::new(
        store.clone(),
        Dispatcher::fixed(mock.clone()),
        fast_worker_config(),
    );
    let handle = worker.start();

    let finished = wait_for_terminal(&store, job.id).await;
    handle.shutdown();
    handle.wait_for_shutdown().await;

    assert_eq!(finished.status, JobStatus::Completed);
    assert_eq!(finished.retry_count, 2);
    assert!(finished.completed_at.is_some());
    assert_eq!(mock.call_count(), 3);

    // Payload comes from the third (successful) call.
    let data = finished.scraped_data.expect("scraped_data populated");
    assert_eq!(
        data.pointer("/profile/username").and_then(|v| v.as_str()),
        Some("octocat")
    );
    assert_eq!(
        data.pointer("/stats/followers").and_then(|v| v.as_i64()),
        Some(42)
    );
    Ok(())
}

#[tokio::test]
async fn job_that_always_times_out_fails_after_the_retry_ceiling() -> anyhow::Result<()> {
    let db = setup().await?;
    let store = JobStore::new(db.pool.clone());

    let mock = Arc::new(MockScraper::always_failing(
        FailureKind::Timeout,
        "scrape timeout: target did not respond",
    ));

    let job = enqueue_github_job(&store, 1).await?;
    let worker = ScrapeWorker::new(
        store.clone(),
        Dispatcher::fixed(mock.clone()),
        fast_worker_config(),
    );
    let handle = worker.start();

    let finished = wait_for_terminal(&store, job.id).await;
    handle.shutdown();
    handle.wait_for_shutdown().await;

    assert_eq!(finished.status, JobStatus::Failed);
    assert_eq!(finished.retry_count, 1);
    assert!(finished
        .error_message
        .as_deref()
        .unwrap()
        .contains("timeout"));
    // One initial attempt plus one retry.
    assert_eq!(mock.call_count(), 2);
    Ok(())
}

#[tokio::test]
async fn two_workers_share_a_queue_without_double_claiming() -> anyhow::Result<()> {
    let db = setup().await?;
    let store = JobStore::new(db.pool.clone());

    let mock_a = Arc::new(MockScraper::new());
    let mock_b = Arc::new(MockScraper::new());

    let job = enqueue_github_job(&store, 3).await?;

    let worker_a = ScrapeWorker::new(
        store.clone(),
        Dispatcher::fixed(mock_a.clone()),
        fast_worker_config(),
    );
    let worker_b = ScrapeWorker::new(
        store.clone(),
        Dispatcher::fixed(mock_b.clone()),
        fast_worker_config(),
    );

    let handle_a = worker_a.start();
    let handle_b = worker_b.start();

    let finished = wait_for_terminal(&store, job.id).await;

    handle_a.shutdown();
    handle_b.shutdown();
    handle_a.wait_for_shutdown().await;
    handle_b.wait_for_shutdown().await;

    assert_eq!(finished.status, JobStatus::Completed);
    assert_eq!(
        mock_a.call_count() + mock_b.call_count(),
        1,
        "the job must be scraped exactly once"
    );
    Ok(())
}

/// Adapter that blows up the way a misconfigured one would.
struct MisconfiguredScraper;

#[async_trait]
impl Scraper for MisconfiguredScraper {
    async fn scrape(&self, _job: &ScrapeJob) -> anyhow::Result<ScrapeOutcome> {
        anyhow::bail!("selector table missing for platform")
    }
}

#[tokio::test]
async fn hard_adapter_errors_fail_immediately_without_consuming_retries() -> anyhow::Result<()> {
    let db = setup().await?;
    let store = JobStore::new(db.pool.clone());

    let job = enqueue_github_job(&store, 3).await?;
    let worker = ScrapeWorker::new(
        store.clone(),
        Dispatcher::fixed(Arc::new(MisconfiguredScraper)),
        fast_worker_config(),
    );
    let handle = worker.start();

    let finished = wait_for_terminal(&store, job.id).await;
    handle.shutdown();
    handle.wait_for_shutdown().await;

    assert_eq!(finished.status, JobStatus::Failed);
    assert_eq!(finished.retry_count, 0, "hard errors are not transient");
    assert!(finished
        .error_message
        .as_deref()
        .unwrap()
        .contains("selector table missing"));
    Ok(())
}

#[tokio::test]
async fn multiple_jobs_all_reach_completion() -> anyhow::Result<()> {
    let db = setup().await?;
    let store = JobStore::new(db.pool.clone());

    let mock = Arc::new(MockScraper::new());
    let mut ids = Vec::new();
    for _ in 0..5 {
        ids.push(enqueue_github_job(&store, 3).await?.id);
    }

    let worker = ScrapeWorker::new(
        store.clone(),
        Dispatcher::fixed(mock.clone()),
        fast_worker_config(),
    );
    let handle = worker.start();

    for id in &ids {
        let finished = wait_for_terminal(&store, *id).await;
        assert_eq!(finished.status, JobStatus::Completed);
    }

    handle.shutdown();
    handle.wait_for_shutdown().await;

    assert_eq!(mock.call_count(), 5);
    Ok(())
}

#[tokio::test]
async fn shutdown_with_an_empty_queue_is_clean() -> anyhow::Result<()> {
    let db = setup().await?;
    let store = JobStore::new(db.pool.clone());

    let worker = ScrapeWorker::new(
        store,
        Dispatcher::fixed(Arc::new(MockScraper::new())),
        fast_worker_config(),
    );
    let handle = worker.start();

    handle.shutdown();
    handle.wait_for_shutdown().await;
    Ok(())
}
