//! Repository for the `job_keys` table (unit completion records).

use sqlx::PgPool;

use claimstream_core::types::DbId;

use crate::models::job_key::JobKey;

/// Column list for `job_keys` queries.
const COLUMNS: &str = "id, job_id, sequence, resource_type, file_name, created_at";

pub struct JobKeyRepo;

impl JobKeyRepo {
    /// Record that one work unit finished and wrote `file_name`.
    ///
    /// Must be durable before the completion check runs; the aggregator
    /// counts these rows against the job's expected unit count.
    ///
    /// Idempotent per `(job_id, sequence)`: a redelivered unit that was
    /// already recorded inserts nothing and returns `None`, leaving the
    /// first record (and its file name) authoritative.
    pub async fn insert(
        pool: &PgPool,
        job_id: DbId,
        sequence: i32,
        resource_type: &str,
        file_name: &str,
    ) -> Result<Option<JobKey>, sqlx::Error> {
        let query = format!(
            "INSERT INTO job_keys (job_id, sequence, resource_type, file_name) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (job_id, sequence) DO NOTHING \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, JobKey>(&query)
            .bind(job_id)
            .bind(sequence)
            .bind(resource_type)
            .bind(file_name)
            .fetch_optional(pool)
            .await
    }

    /// The completion record for one unit of a job, if it exists.
    pub async fn find_by_sequence(
        pool: &PgPool,
        job_id: DbId,
        sequence: i32,
    ) -> Result<Option<JobKey>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM job_keys WHERE job_id = $1 AND sequence = $2");
        sqlx::query_as::<_, JobKey>(&query)
            .bind(job_id)
            .bind(sequence)
            .fetch_optional(pool)
            .await
    }

    /// Number of completed units for a job.
    pub async fn count_for_job(pool: &PgPool, job_id: DbId) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM job_keys WHERE job_id = $1")
            .bind(job_id)
            .fetch_one(pool)
            .await
    }

    /// All completion records for a job, in insertion order, for manifest
    /// assembly.
    pub async fn list_for_job(pool: &PgPool, job_id: DbId) -> Result<Vec<JobKey>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM job_keys WHERE job_id = $1 ORDER BY id");
        sqlx::query_as::<_, JobKey>(&query)
            .bind(job_id)
            .fetch_all(pool)
            .await
    }
}
