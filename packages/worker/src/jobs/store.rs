//! SQL for the scrape job queue.
//!
//! Every state transition is a single conditional `UPDATE` keyed on the
//! row's current status. Zero affected rows means the job was lost to
//! another claimant and the caller must not touch it again.

use anyhow::{Context, Result};
use sqlx::PgPool;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

use super::model::{JobStatus, NewScrapeJob, ScrapeJob};
use crate::scrape::ScrapedPayload;

#[derive(Clone)]
pub struct JobStore {
    pool: PgPool,
}

impl JobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Producer boundary: insert a new job in `queued` state.
    ///
    /// The target URL must be an absolute http(s) URL; anything else is
    /// rejected before it can reach the queue.
    pub async fn enqueue(&self, new: NewScrapeJob) -> Result<ScrapeJob> {
        let parsed = url::Url::parse(&new.target_url)
            .with_context(|| format!("invalid target URL: {}", new.target_url))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            anyhow::bail!("target URL must be http(s): {}", new.target_url);
        }

        let job = sqlx::query_as::<_, ScrapeJob>(
            r#"
            INSERT INTO scrape_jobs (id, target_url, target_username, platform, search_type, max_retries)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new.target_url)
        .bind(&new.target_username)
        .bind(&new.platform)
        .bind(new.search_type.map(|s| s.as_str()))
        .bind(new.max_retries)
        .fetch_one(&self.pool)
        .await?;

        debug!(job_id = %job.id, target_url = %job.target_url, "Enqueued scrape job");
        Ok(job)
    }

    /// Consumer boundary: the dashboard's job-status endpoint reads this.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<ScrapeJob>> {
        let job = sqlx::query_as::<_, ScrapeJob>("SELECT * FROM scrape_jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(job)
    }

    /// Atomically claim up to `limit` eligible jobs, oldest first.
    ///
    /// `FOR UPDATE SKIP LOCKED` plus the status condition on the outer
    /// `UPDATE` guarantee two workers polling concurrently never both claim
    /// the same row.
    pub async fn claim_batch(&self, limit: i64) -> Result<Vec<ScrapeJob>> {
        let jobs = sqlx::query_as::<_, ScrapeJob>(
            r#"
            WITH next_jobs AS (
                SELECT id
                FROM scrape_jobs
                WHERE status = 'queued'
                  AND (next_attempt_at IS NULL OR next_attempt_at <= NOW())
                ORDER BY created_at ASC
                LIMIT $1
                FOR UPDATE SKIP LOCKED
            )
            UPDATE scrape_jobs
            SET status = 'processing',
                started_at = NOW(),
                error_message = NULL,
                updated_at = NOW()
            WHERE id IN (SELECT id FROM next_jobs)
              AND status = 'queued'
            RETURNING *
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(jobs)
    }

    /// `processing → completed`. Returns false if the claim was lost.
    pub async fn mark_completed(&self, id: Uuid, payload: &ScrapedPayload) -> Result<bool> {
        let data = serde_json::to_value(payload).context("failed to serialize scraped payload")?;

        let rows = sqlx::query(
            r#"
            UPDATE scrape_jobs
            SET status = 'completed',
                scraped_data = $2,
                completed_at = NOW(),
                updated_at = NOW()
            WHERE id = $1 AND status = 'processing'
            "#,
        )
        .bind(id)
        .bind(data)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(rows == 1)
    }

    /// `processing → queued` with an incremented retry counter and a backoff
    /// gate. Returns false if the claim was lost.
    pub async fn requeue_for_retry(&self, id: Uuid, error: &str, delay: Duration) -> Result<bool> {
        let rows = sqlx::query(
            r#"
            UPDATE scrape_jobs
            SET status = 'queued',
                retry_count = retry_count + 1,
                error_message = $2,
                started_at = NULL,
                next_attempt_at = NOW() + ($3 || ' milliseconds')::INTERVAL,
                updated_at = NOW()
            WHERE id = $1 AND status = 'processing'
            "#,
        )
        .bind(id)
        .bind(error)
        .bind(delay.as_millis().to_string())
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(rows == 1)
    }

    /// `processing → failed`. Returns false if the claim was lost.
    pub async fn mark_failed(&self, id: Uuid, error: &str) -> Result<bool> {
        let rows = sqlx::query(
            r#"
            UPDATE scrape_jobs
            SET status = 'failed',
                error_message = $2,
                completed_at = NOW(),
                updated_at = NOW()
            WHERE id = $1 AND status = 'processing'
            "#,
        )
        .bind(id)
        .bind(error)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(rows == 1)
    }

    /// Reconcile claims left behind by workers that died without a graceful
    /// shutdown: any `processing` row whose `updated_at` is older than
    /// `threshold` goes back to `queued` with `retry_count + 1`. Rows already
    /// at their retry ceiling are marked `failed` instead, preserving the
    /// `retry_count <= max_retries` invariant.
    ///
    /// Returns `(requeued, failed)` row counts.
    pub async fn requeue_stale(&self, threshold: Duration) -> Result<(u64, u64)> {
        let secs = threshold.as_secs().to_string();

        let failed = sqlx::query(
            r#"
            UPDATE scrape_jobs
            SET status = 'failed',
                error_message = 'stale claim: worker died and retries are exhausted',
                completed_at = NOW(),
                updated_at = NOW()
            WHERE status = 'processing'
              AND updated_at < NOW() - ($1 || ' seconds')::INTERVAL
              AND retry_count >= max_retries
            "#,
        )
        .bind(&secs)
        .execute(&self.pool)
        .await?
        .rows_affected();

        let requeued = sqlx::query(
            r#"
            UPDATE scrape_jobs
            SET status = 'queued',
                retry_count = retry_count + 1,
                error_message = 'stale claim: worker died before finishing',
                started_at = NULL,
                updated_at = NOW()
            WHERE status = 'processing'
              AND updated_at < NOW() - ($1 || ' seconds')::INTERVAL
              AND retry_count < max_retries
            "#,
        )
        .bind(&secs)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok((requeued, failed))
    }

    /// Number of jobs currently eligible for claiming.
    pub async fn queued_count(&self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM scrape_jobs WHERE status = 'queued'",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Queue depth per status, for startup logging and health checks.
    pub async fn counts_by_status(&self) -> Result<Vec<(JobStatus, i64)>> {
        let counts = sqlx::query_as::<_, (JobStatus, i64)>(
            "SELECT status, COUNT(*) FROM scrape_jobs GROUP BY status",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(counts)
    }
}
