//! Repository for the `export_jobs` table.
//!
//! Status transitions are conditional UPDATEs so they stay monotonic under
//! concurrent workers; nothing here ever moves a job backwards.

use sqlx::PgPool;
use uuid::Uuid;

use claimstream_core::admission::PriorJob;
use claimstream_core::types::{DbId, Timestamp};

use crate::models::export_job::{ExportJob, NewExportJob};
use crate::models::status::ExportJobStatus;

/// Column list for `export_jobs` queries.
const COLUMNS: &str = "\
    id, org_id, user_id, request_url, requested_types, since, \
    transaction_time, status_id, expected_unit_count, created_at, updated_at";

/// Provides CRUD operations and status transitions for export jobs.
pub struct ExportJobRepo;

impl ExportJobRepo {
    /// Insert a new Pending job at admission time.
    pub async fn create(pool: &PgPool, input: &NewExportJob) -> Result<ExportJob, sqlx::Error> {
        let query = format!(
            "INSERT INTO export_jobs \
                 (org_id, user_id, request_url, requested_types, since, status_id) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ExportJob>(&query)
            .bind(input.org_id)
            .bind(input.user_id)
            .bind(&input.request_url)
            .bind(&input.requested_types)
            .bind(&input.since)
            .bind(ExportJobStatus::Pending.id())
            .fetch_one(pool)
            .await
    }

    /// Find a job by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<ExportJob>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM export_jobs WHERE id = $1");
        sqlx::query_as::<_, ExportJob>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a job by ID, scoped to the owning organization.
    ///
    /// A job belonging to another organization reads as absent.
    pub async fn find_for_org(
        pool: &PgPool,
        id: DbId,
        org_id: Uuid,
    ) -> Result<Option<ExportJob>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM export_jobs WHERE id = $1 AND org_id = $2");
        sqlx::query_as::<_, ExportJob>(&query)
            .bind(id)
            .bind(org_id)
            .fetch_optional(pool)
            .await
    }

    /// All of an organization's jobs created at or after `cutoff`, for the
    /// admission controller.
    pub async fn list_for_org_since(
        pool: &PgPool,
        org_id: Uuid,
        cutoff: Timestamp,
    ) -> Result<Vec<ExportJob>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM export_jobs \
             WHERE org_id = $1 AND created_at >= $2 \
             ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, ExportJob>(&query)
            .bind(org_id)
            .bind(cutoff)
            .fetch_all(pool)
            .await
    }

    /// Persist the data snapshot time captured from the upstream server.
    pub async fn set_transaction_time(
        pool: &PgPool,
        job_id: DbId,
        transaction_time: Timestamp,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE export_jobs SET transaction_time = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(job_id)
        .bind(transaction_time)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Record the total number of work units this job will produce.
    ///
    /// Must be durable before the first unit is enqueued, otherwise the
    /// completion check could observe a job with an understated expectation.
    pub async fn set_expected_units(
        pool: &PgPool,
        job_id: DbId,
        expected: i32,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE export_jobs SET expected_unit_count = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(job_id)
        .bind(expected)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Promote a Pending job to InProgress. No-op for any other status.
    pub async fn mark_in_progress(pool: &PgPool, job_id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE export_jobs SET status_id = $2, updated_at = NOW() \
             WHERE id = $1 AND status_id = $3",
        )
        .bind(job_id)
        .bind(ExportJobStatus::InProgress.id())
        .bind(ExportJobStatus::Pending.id())
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Mark a job Failed. Only reachable before any unit is dispatched
    /// (admission metadata fetch or partitioning failure).
    pub async fn mark_failed(pool: &PgPool, job_id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE export_jobs SET status_id = $2, updated_at = NOW() \
             WHERE id = $1 AND status_id IN ($3, $4)",
        )
        .bind(job_id)
        .bind(ExportJobStatus::Failed.id())
        .bind(ExportJobStatus::Pending.id())
        .bind(ExportJobStatus::InProgress.id())
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Atomically transition the job to Completed iff every expected unit
    /// has a completion record.
    ///
    /// Safe to run concurrently from multiple workers: the count and the
    /// conditional status update happen in one statement, and setting
    /// Completed on an already-Completed job is a no-op. Returns `true` when
    /// the job is Completed after the call (whether this call performed the
    /// transition or a racing worker already had).
    pub async fn complete_if_done(pool: &PgPool, job_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE export_jobs SET status_id = $2, updated_at = NOW() \
             WHERE id = $1 \
               AND status_id IN ($3, $4) \
               AND expected_unit_count <= \
                   (SELECT COUNT(*) FROM job_keys WHERE job_id = $1)",
        )
        .bind(job_id)
        .bind(ExportJobStatus::Completed.id())
        .bind(ExportJobStatus::Pending.id())
        .bind(ExportJobStatus::InProgress.id())
        .execute(pool)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(true);
        }

        // Lost the race, or nothing to do: completed only if someone else
        // already moved the job there.
        let status: Option<i16> =
            sqlx::query_scalar("SELECT status_id FROM export_jobs WHERE id = $1")
                .bind(job_id)
                .fetch_optional(pool)
                .await?;
        Ok(status == Some(ExportJobStatus::Completed.id()))
    }

    /// Completed jobs whose last update is older than `cutoff`, for the
    /// archive sweep.
    pub async fn stale_completed(
        pool: &PgPool,
        cutoff: Timestamp,
    ) -> Result<Vec<ExportJob>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM export_jobs \
             WHERE status_id = $1 AND updated_at < $2 \
             ORDER BY updated_at ASC"
        );
        sqlx::query_as::<_, ExportJob>(&query)
            .bind(ExportJobStatus::Completed.id())
            .bind(cutoff)
            .fetch_all(pool)
            .await
    }

    /// Mark a Completed job Archived, after its payload has moved to cold
    /// storage.
    pub async fn mark_archived(pool: &PgPool, job_id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE export_jobs SET status_id = $2, updated_at = NOW() \
             WHERE id = $1 AND status_id = $3",
        )
        .bind(job_id)
        .bind(ExportJobStatus::Archived.id())
        .bind(ExportJobStatus::Completed.id())
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Mark a job Expired after its archived output has been purged.
    ///
    /// Also accepts Completed jobs: a purge can outrun a lagging archive
    /// sweep, and the client-visible outcome is identical.
    pub async fn mark_expired(pool: &PgPool, job_id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE export_jobs SET status_id = $2, updated_at = NOW() \
             WHERE id = $1 AND status_id IN ($3, $4)",
        )
        .bind(job_id)
        .bind(ExportJobStatus::Expired.id())
        .bind(ExportJobStatus::Archived.id())
        .bind(ExportJobStatus::Completed.id())
        .execute(pool)
        .await?;
        Ok(())
    }
}

impl ExportJob {
    /// Project this row into the admission policy's view of a prior job.
    ///
    /// Unknown type strings are skipped rather than erroring; they can only
    /// appear if the supported-type set shrinks across a deploy, and a type
    /// we no longer export cannot block anything.
    pub fn to_prior_job(&self) -> PriorJob {
        let requested_types = self.requested_types.as_ref().map(|types| {
            types
                .iter()
                .filter_map(|t| t.parse().ok())
                .collect::<Vec<_>>()
        });
        let unresolved = ExportJobStatus::from_id(self.status_id)
            .map(ExportJobStatus::is_unresolved)
            .unwrap_or(false);
        PriorJob {
            requested_types,
            unresolved,
            created_at: self.created_at,
        }
    }
}
