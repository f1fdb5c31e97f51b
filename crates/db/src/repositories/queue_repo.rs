//! Repository for the `job_queue` table: the durable dispatch channel
//! between the partitioner and the worker pool.
//!
//! Delivery is at-least-once: a claim that is never acknowledged (crashed
//! worker) is released after a timeout and redelivered. Unit processing is
//! idempotent by construction, so redelivery is safe.

use sqlx::PgPool;

use claimstream_core::types::DbId;

use crate::models::queue::QueuedUnit;

/// Column list for `job_queue` queries.
const COLUMNS: &str = "id, job_id, payload, claimed_at, claimed_by, created_at";

pub struct QueueRepo;

impl QueueRepo {
    /// Append one serialized work unit for a job.
    pub async fn enqueue(
        pool: &PgPool,
        job_id: DbId,
        payload: &serde_json::Value,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO job_queue (job_id, payload) VALUES ($1, $2) RETURNING id",
        )
        .bind(job_id)
        .bind(payload)
        .fetch_one(pool)
        .await
    }

    /// Atomically claim the oldest unclaimed unit.
    ///
    /// Uses `SELECT ... FOR UPDATE SKIP LOCKED` so concurrent workers never
    /// double-claim a row.
    pub async fn claim_next(
        pool: &PgPool,
        worker_name: &str,
    ) -> Result<Option<QueuedUnit>, sqlx::Error> {
        let query = format!(
            "UPDATE job_queue \
             SET claimed_at = NOW(), claimed_by = $1 \
             WHERE id = ( \
                 SELECT id FROM job_queue \
                 WHERE claimed_at IS NULL \
                 ORDER BY id ASC \
                 LIMIT 1 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, QueuedUnit>(&query)
            .bind(worker_name)
            .fetch_optional(pool)
            .await
    }

    /// Acknowledge a processed unit by deleting its row.
    ///
    /// Called only after the unit's completion record is durable.
    pub async fn ack(pool: &PgPool, queue_id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM job_queue WHERE id = $1")
            .bind(queue_id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Release claims older than `cutoff` back to the unclaimed pool.
    ///
    /// Returns the number of redelivered units.
    pub async fn release_stale(
        pool: &PgPool,
        cutoff: claimstream_core::types::Timestamp,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE job_queue SET claimed_at = NULL, claimed_by = NULL \
             WHERE claimed_at IS NOT NULL AND claimed_at < $1",
        )
        .bind(cutoff)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Unprocessed units remaining for one job.
    pub async fn depth_for_job(pool: &PgPool, job_id: DbId) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM job_queue WHERE job_id = $1")
            .bind(job_id)
            .fetch_one(pool)
            .await
    }
}
