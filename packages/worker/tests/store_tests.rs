//! State-machine properties of the job store, exercised against a real
//! Postgres instance.

mod common;

use common::{age_processing_row, enqueue_github_job, setup, status_of};
use std::time::Duration;
use worker_core::scrape::ScrapedPayload;
use worker_core::{JobStatus, JobStore, NewScrapeJob};

#[tokio::test]
async fn enqueue_rejects_malformed_urls() -> anyhow::Result<()> {
    let db = setup().await?;
    let store = JobStore::new(db.pool.clone());

    let result = store
        .enqueue(NewScrapeJob::builder().target_url("not a url").build())
        .await;
    assert!(result.is_err());

    let result = store
        .enqueue(NewScrapeJob::builder().target_url("ftp://example.com/x").build())
        .await;
    assert!(result.is_err());

    assert_eq!(store.queued_count().await?, 0);
    Ok(())
}

#[tokio::test]
async fn claim_flips_queued_to_processing_and_sets_started_at() -> anyhow::Result<()> {
    let db = setup().await?;
    let store = JobStore::new(db.pool.clone());

    let job = enqueue_github_job(&store, 3).await?;
    assert_eq!(job.status, JobStatus::Queued);
    assert!(job.started_at.is_none());

    let claimed = store.claim_batch(5).await?;
    assert_eq!(claimed.len(), 1);
    assert_eq!(claimed[0].id, job.id);
    assert_eq!(claimed[0].status, JobStatus::Processing);
    assert!(claimed[0].started_at.is_some());

    // Nothing left to claim.
    assert!(store.claim_batch(5).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn concurrent_claims_on_one_row_yield_exactly_one_winner() -> anyhow::Result<()> {
    let db = setup().await?;
    let store_a = JobStore::new(db.pool.clone());
    let store_b = JobStore::new(db.pool.clone());

    let job = enqueue_github_job(&store_a, 3).await?;

    let (batch_a, batch_b) = tokio::join!(store_a.claim_batch(1), store_b.claim_batch(1));
    let batch_a = batch_a?;
    let batch_b = batch_b?;

    assert_eq!(
        batch_a.len() + batch_b.len(),
        1,
        "exactly one claimant must win the row"
    );
    let winner = batch_a.first().or(batch_b.first()).unwrap();
    assert_eq!(winner.id, job.id);
    Ok(())
}

#[tokio::test]
async fn claims_are_fifo_by_creation_time() -> anyhow::Result<()> {
    let db = setup().await?;
    let store = JobStore::new(db.pool.clone());

    let first = enqueue_github_job(&store, 3).await?;
    let second = enqueue_github_job(&store, 3).await?;
    let third = enqueue_github_job(&store, 3).await?;

    let claimed = store.claim_batch(10).await?;
    let ids: Vec<_> = claimed.iter().map(|j| j.id).collect();
    assert_eq!(ids, vec![first.id, second.id, third.id]);
    Ok(())
}

#[tokio::test]
async fn requeued_jobs_wait_out_their_backoff_delay() -> anyhow::Result<()> {
    let db = setup().await?;
    let store = JobStore::new(db.pool.clone());

    let job = enqueue_github_job(&store, 3).await?;
    store.claim_batch(1).await?;

    let applied = store
        .requeue_for_retry(job.id, "scrape timeout", Duration::from_secs(3600))
        .await?;
    assert!(applied);

    let refreshed = store.find_by_id(job.id).await?.unwrap();
    assert_eq!(refreshed.status, JobStatus::Queued);
    assert_eq!(refreshed.retry_count, 1);
    assert_eq!(refreshed.error_message.as_deref(), Some("scrape timeout"));
    assert!(refreshed.started_at.is_none());

    // Not eligible again until the backoff gate passes.
    assert!(store.claim_batch(5).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn terminal_rows_reject_further_transitions() -> anyhow::Result<()> {
    let db = setup().await?;
    let store = JobStore::new(db.pool.clone());

    let job = enqueue_github_job(&store, 3).await?;
    store.claim_batch(1).await?;

    assert!(store.mark_completed(job.id, &ScrapedPayload::default()).await?);

    // Once terminal, every conditional update is a no-op.
    assert!(!store.mark_completed(job.id, &ScrapedPayload::default()).await?);
    assert!(!store.mark_failed(job.id, "late failure").await?);
    assert!(
        !store
            .requeue_for_retry(job.id, "late retry", Duration::ZERO)
            .await?
    );

    let refreshed = store.find_by_id(job.id).await?.unwrap();
    assert_eq!(refreshed.status, JobStatus::Completed);
    assert!(refreshed.completed_at.is_some());
    assert_eq!(refreshed.error_message, None);
    Ok(())
}

#[tokio::test]
async fn stale_processing_rows_are_requeued_with_one_extra_retry() -> anyhow::Result<()> {
    let db = setup().await?;
    let store = JobStore::new(db.pool.clone());

    let job = enqueue_github_job(&store, 3).await?;
    store.claim_batch(1).await?;
    age_processing_row(&db.pool, job.id, 10).await?;

    let (requeued, failed) = store.requeue_stale(Duration::from_secs(120)).await?;
    assert_eq!((requeued, failed), (1, 0));

    let refreshed = store.find_by_id(job.id).await?.unwrap();
    assert_eq!(refreshed.status, JobStatus::Queued);
    assert_eq!(refreshed.retry_count, 1);
    assert!(refreshed
        .error_message
        .as_deref()
        .unwrap()
        .contains("stale claim"));

    // Reconciliation is idempotent: the row is queued now, not processing.
    let (requeued, failed) = store.requeue_stale(Duration::from_secs(120)).await?;
    assert_eq!((requeued, failed), (0, 0));
    assert_eq!(status_of(&db.pool, job.id).await, JobStatus::Queued);
    Ok(())
}

#[tokio::test]
async fn stale_rows_out_of_retries_are_failed_not_requeued() -> anyhow::Result<()> {
    let db = setup().await?;
    let store = JobStore::new(db.pool.clone());

    let job = enqueue_github_job(&store, 2).await?;
    store.claim_batch(1).await?;

    sqlx::query("UPDATE scrape_jobs SET retry_count = max_retries WHERE id = $1")
        .bind(job.id)
        .execute(&db.pool)
        .await?;
    age_processing_row(&db.pool, job.id, 10).await?;

    let (requeued, failed) = store.requeue_stale(Duration::from_secs(120)).await?;
    assert_eq!((requeued, failed), (0, 1));

    let refreshed = store.find_by_id(job.id).await?.unwrap();
    assert_eq!(refreshed.status, JobStatus::Failed);
    assert_eq!(refreshed.retry_count, refreshed.max_retries);
    Ok(())
}

#[tokio::test]
async fn fresh_processing_rows_are_left_alone() -> anyhow::Result<()> {
    let db = setup().await?;
    let store = JobStore::new(db.pool.clone());

    let job = enqueue_github_job(&store, 3).await?;
    store.claim_batch(1).await?;

    let (requeued, failed) = store.requeue_stale(Duration::from_secs(120)).await?;
    assert_eq!((requeued, failed), (0, 0));
    assert_eq!(status_of(&db.pool, job.id).await, JobStatus::Processing);
    Ok(())
}
