//! Integration tests for the export job lifecycle against a real database:
//! admission insert, organization scoping, status monotonicity, and the
//! atomic completion check.

use sqlx::PgPool;
use uuid::Uuid;

use claimstream_db::models::export_job::NewExportJob;
use claimstream_db::models::status::ExportJobStatus;
use claimstream_db::repositories::{ExportJobRepo, JobKeyRepo};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn new_job(org_id: Uuid, types: Option<Vec<&str>>) -> NewExportJob {
    NewExportJob {
        org_id,
        user_id: Uuid::new_v4(),
        request_url: "/api/v1/export".to_string(),
        requested_types: types.map(|ts| ts.iter().map(|s| s.to_string()).collect()),
        since: None,
    }
}

async fn status_of(pool: &PgPool, job_id: i64) -> ExportJobStatus {
    let job = ExportJobRepo::find_by_id(pool, job_id).await.unwrap().unwrap();
    ExportJobStatus::from_id(job.status_id).unwrap()
}

/// Push a Completed job's `updated_at` into the past so it looks stale.
async fn age_job(pool: &PgPool, job_id: i64, hours: i64) {
    sqlx::query("UPDATE export_jobs SET updated_at = NOW() - ($2 || ' hours')::interval WHERE id = $1")
        .bind(job_id)
        .bind(hours.to_string())
        .execute(pool)
        .await
        .unwrap();
}

// ---------------------------------------------------------------------------
// Creation and scoping
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn create_starts_pending(pool: PgPool) {
    let org = Uuid::new_v4();
    let job = ExportJobRepo::create(&pool, &new_job(org, Some(vec!["Patient"])))
        .await
        .unwrap();

    assert_eq!(job.status_id, ExportJobStatus::Pending.id());
    assert_eq!(job.expected_unit_count, 0);
    assert!(job.transaction_time.is_none());
    assert_eq!(job.requested_types, Some(vec!["Patient".to_string()]));
}

#[sqlx::test(migrations = "../../migrations")]
async fn find_for_org_hides_foreign_jobs(pool: PgPool) {
    let org = Uuid::new_v4();
    let job = ExportJobRepo::create(&pool, &new_job(org, None)).await.unwrap();

    assert!(ExportJobRepo::find_for_org(&pool, job.id, org)
        .await
        .unwrap()
        .is_some());
    assert!(ExportJobRepo::find_for_org(&pool, job.id, Uuid::new_v4())
        .await
        .unwrap()
        .is_none());
}

#[sqlx::test(migrations = "../../migrations")]
async fn list_for_org_since_honors_cutoff(pool: PgPool) {
    let org = Uuid::new_v4();
    let job = ExportJobRepo::create(&pool, &new_job(org, None)).await.unwrap();
    sqlx::query("UPDATE export_jobs SET created_at = NOW() - interval '48 hours' WHERE id = $1")
        .bind(job.id)
        .execute(&pool)
        .await
        .unwrap();
    ExportJobRepo::create(&pool, &new_job(org, Some(vec!["Coverage"])))
        .await
        .unwrap();

    let cutoff = chrono::Utc::now() - chrono::Duration::hours(24);
    let recent = ExportJobRepo::list_for_org_since(&pool, org, cutoff)
        .await
        .unwrap();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].requested_types, Some(vec!["Coverage".to_string()]));
}

#[sqlx::test(migrations = "../../migrations")]
async fn markerless_job_projects_with_no_types(pool: PgPool) {
    let org = Uuid::new_v4();
    let job = ExportJobRepo::create(&pool, &new_job(org, None)).await.unwrap();

    let prior = job.to_prior_job();
    assert!(prior.requested_types.is_none());
    assert!(prior.unresolved);
}

// ---------------------------------------------------------------------------
// Status transitions
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn mark_in_progress_only_from_pending(pool: PgPool) {
    let job = ExportJobRepo::create(&pool, &new_job(Uuid::new_v4(), None))
        .await
        .unwrap();

    ExportJobRepo::mark_in_progress(&pool, job.id).await.unwrap();
    assert_eq!(status_of(&pool, job.id).await, ExportJobStatus::InProgress);

    // Idempotent under concurrent first units.
    ExportJobRepo::mark_in_progress(&pool, job.id).await.unwrap();
    assert_eq!(status_of(&pool, job.id).await, ExportJobStatus::InProgress);
}

#[sqlx::test(migrations = "../../migrations")]
async fn mark_failed_never_demotes_completed(pool: PgPool) {
    let job = ExportJobRepo::create(&pool, &new_job(Uuid::new_v4(), None))
        .await
        .unwrap();
    assert!(ExportJobRepo::complete_if_done(&pool, job.id).await.unwrap());

    ExportJobRepo::mark_failed(&pool, job.id).await.unwrap();
    assert_eq!(status_of(&pool, job.id).await, ExportJobStatus::Completed);
}

// ---------------------------------------------------------------------------
// Completion check
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn completes_only_when_all_units_recorded(pool: PgPool) {
    let job = ExportJobRepo::create(&pool, &new_job(Uuid::new_v4(), None))
        .await
        .unwrap();
    ExportJobRepo::set_expected_units(&pool, job.id, 2).await.unwrap();
    ExportJobRepo::mark_in_progress(&pool, job.id).await.unwrap();

    JobKeyRepo::insert(&pool, job.id, 0, "Patient", "a.ndjson").await.unwrap();
    assert!(!ExportJobRepo::complete_if_done(&pool, job.id).await.unwrap());
    assert_eq!(status_of(&pool, job.id).await, ExportJobStatus::InProgress);

    JobKeyRepo::insert(&pool, job.id, 1, "Coverage", "b.ndjson").await.unwrap();
    assert!(ExportJobRepo::complete_if_done(&pool, job.id).await.unwrap());
    assert_eq!(status_of(&pool, job.id).await, ExportJobStatus::Completed);

    // Redelivered units re-run the check; still completed, still true.
    assert!(ExportJobRepo::complete_if_done(&pool, job.id).await.unwrap());
}

#[sqlx::test(migrations = "../../migrations")]
async fn zero_expected_units_completes_immediately(pool: PgPool) {
    let job = ExportJobRepo::create(&pool, &new_job(Uuid::new_v4(), None))
        .await
        .unwrap();

    assert!(ExportJobRepo::complete_if_done(&pool, job.id).await.unwrap());
    assert_eq!(status_of(&pool, job.id).await, ExportJobStatus::Completed);
}

#[sqlx::test(migrations = "../../migrations")]
async fn completion_count_ignores_other_jobs(pool: PgPool) {
    let org = Uuid::new_v4();
    let job_a = ExportJobRepo::create(&pool, &new_job(org, None)).await.unwrap();
    let job_b = ExportJobRepo::create(&pool, &new_job(org, Some(vec!["Patient"])))
        .await
        .unwrap();
    ExportJobRepo::set_expected_units(&pool, job_a.id, 1).await.unwrap();
    ExportJobRepo::set_expected_units(&pool, job_b.id, 1).await.unwrap();

    JobKeyRepo::insert(&pool, job_b.id, 0, "Patient", "b.ndjson").await.unwrap();

    assert!(!ExportJobRepo::complete_if_done(&pool, job_a.id).await.unwrap());
    assert!(ExportJobRepo::complete_if_done(&pool, job_b.id).await.unwrap());
}

#[sqlx::test(migrations = "../../migrations")]
async fn duplicate_sequence_records_once(pool: PgPool) {
    let job = ExportJobRepo::create(&pool, &new_job(Uuid::new_v4(), None))
        .await
        .unwrap();
    ExportJobRepo::set_expected_units(&pool, job.id, 1).await.unwrap();

    let first = JobKeyRepo::insert(&pool, job.id, 0, "Patient", "a.ndjson")
        .await
        .unwrap();
    assert!(first.is_some());

    // A redelivered unit re-records under the same sequence with a fresh
    // file name; the first record stays authoritative.
    let second = JobKeyRepo::insert(&pool, job.id, 0, "Patient", "z.ndjson")
        .await
        .unwrap();
    assert!(second.is_none());

    assert_eq!(JobKeyRepo::count_for_job(&pool, job.id).await.unwrap(), 1);
    let keys = JobKeyRepo::list_for_job(&pool, job.id).await.unwrap();
    assert_eq!(keys[0].file_name, "a.ndjson");
    assert!(ExportJobRepo::complete_if_done(&pool, job.id).await.unwrap());

    let found = JobKeyRepo::find_by_sequence(&pool, job.id, 0).await.unwrap();
    assert_eq!(found.unwrap().file_name, "a.ndjson");
}

// ---------------------------------------------------------------------------
// Archival transitions
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn stale_completed_respects_cutoff(pool: PgPool) {
    let fresh = ExportJobRepo::create(&pool, &new_job(Uuid::new_v4(), None))
        .await
        .unwrap();
    let stale = ExportJobRepo::create(&pool, &new_job(Uuid::new_v4(), None))
        .await
        .unwrap();
    assert!(ExportJobRepo::complete_if_done(&pool, fresh.id).await.unwrap());
    assert!(ExportJobRepo::complete_if_done(&pool, stale.id).await.unwrap());
    age_job(&pool, stale.id, 48).await;

    let cutoff = chrono::Utc::now() - chrono::Duration::hours(24);
    let found = ExportJobRepo::stale_completed(&pool, cutoff).await.unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, stale.id);
}

#[sqlx::test(migrations = "../../migrations")]
async fn archive_then_expire(pool: PgPool) {
    let job = ExportJobRepo::create(&pool, &new_job(Uuid::new_v4(), None))
        .await
        .unwrap();
    assert!(ExportJobRepo::complete_if_done(&pool, job.id).await.unwrap());

    ExportJobRepo::mark_archived(&pool, job.id).await.unwrap();
    assert_eq!(status_of(&pool, job.id).await, ExportJobStatus::Archived);

    ExportJobRepo::mark_expired(&pool, job.id).await.unwrap();
    assert_eq!(status_of(&pool, job.id).await, ExportJobStatus::Expired);
}

#[sqlx::test(migrations = "../../migrations")]
async fn expire_accepts_completed_when_archive_lagged(pool: PgPool) {
    let job = ExportJobRepo::create(&pool, &new_job(Uuid::new_v4(), None))
        .await
        .unwrap();
    assert!(ExportJobRepo::complete_if_done(&pool, job.id).await.unwrap());

    ExportJobRepo::mark_expired(&pool, job.id).await.unwrap();
    assert_eq!(status_of(&pool, job.id).await, ExportJobStatus::Expired);
}

#[sqlx::test(migrations = "../../migrations")]
async fn archive_does_not_touch_pending_jobs(pool: PgPool) {
    let job = ExportJobRepo::create(&pool, &new_job(Uuid::new_v4(), None))
        .await
        .unwrap();

    ExportJobRepo::mark_archived(&pool, job.id).await.unwrap();
    assert_eq!(status_of(&pool, job.id).await, ExportJobStatus::Pending);
}
