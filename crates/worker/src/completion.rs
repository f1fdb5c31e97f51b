//! Completion aggregation: flip the job to Completed once every expected
//! unit has recorded its output, then promote staged files to the payload
//! directory.
//!
//! Any worker may observe completion, and redelivered units may observe it
//! more than once, so promotion is idempotent: an absent staging directory
//! means a peer already promoted, and an already-present payload file wins
//! over its staging copy.

use std::path::Path;

use sqlx::PgPool;
use tracing::info;

use claimstream_core::naming;
use claimstream_core::types::DbId;
use claimstream_db::repositories::ExportJobRepo;

use crate::error::WorkerError;
use crate::DataDirs;

/// Run the completion check for a job and, if it just completed (or had
/// completed already), make sure its files live under the payload root.
pub async fn check_and_promote(
    pool: &PgPool,
    job_id: DbId,
    dirs: &DataDirs,
) -> Result<bool, WorkerError> {
    if !ExportJobRepo::complete_if_done(pool, job_id).await? {
        return Ok(false);
    }

    promote_staging(&dirs.staging, &dirs.payload, job_id)?;
    info!(job_id, "export job completed");
    Ok(true)
}

/// Move a job's staged files into the payload directory.
///
/// Safe to call repeatedly and concurrently with a peer doing the same
/// promotion.
pub fn promote_staging(
    staging_root: &Path,
    payload_root: &Path,
    job_id: DbId,
) -> std::io::Result<()> {
    let source = naming::job_dir(staging_root, job_id);
    if !source.exists() {
        return Ok(());
    }

    let target = naming::job_dir(payload_root, job_id);
    std::fs::create_dir_all(&target)?;

    for entry in std::fs::read_dir(&source)? {
        let entry = entry?;
        let destination = target.join(entry.file_name());
        if destination.exists() {
            std::fs::remove_file(entry.path())?;
        } else {
            std::fs::rename(entry.path(), &destination)?;
        }
    }

    // A peer may have emptied and removed the directory between our scan
    // and this call.
    match std::fs::remove_dir(&source) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage_file(root: &Path, job_id: DbId, name: &str, body: &str) {
        let dir = naming::job_dir(root, job_id);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(name), body).unwrap();
    }

    #[test]
    fn promotes_all_staged_files() {
        let tmp = tempfile::tempdir().unwrap();
        let (staging, payload) = (tmp.path().join("staging"), tmp.path().join("payload"));
        stage_file(&staging, 5, "a.ndjson", "one\n");
        stage_file(&staging, 5, "a-error.ndjson", "err\n");

        promote_staging(&staging, &payload, 5).unwrap();

        let dir = naming::job_dir(&payload, 5);
        assert!(dir.join("a.ndjson").exists());
        assert!(dir.join("a-error.ndjson").exists());
        assert!(!naming::job_dir(&staging, 5).exists());
    }

    #[test]
    fn promotion_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let (staging, payload) = (tmp.path().join("staging"), tmp.path().join("payload"));
        stage_file(&staging, 5, "a.ndjson", "one\n");

        promote_staging(&staging, &payload, 5).unwrap();
        promote_staging(&staging, &payload, 5).unwrap();

        assert!(naming::job_dir(&payload, 5).join("a.ndjson").exists());
    }

    #[test]
    fn existing_payload_file_wins() {
        let tmp = tempfile::tempdir().unwrap();
        let (staging, payload) = (tmp.path().join("staging"), tmp.path().join("payload"));
        stage_file(&staging, 5, "a.ndjson", "late\n");
        stage_file(&payload, 5, "a.ndjson", "first\n");

        promote_staging(&staging, &payload, 5).unwrap();

        let body =
            std::fs::read_to_string(naming::job_dir(&payload, 5).join("a.ndjson")).unwrap();
        assert_eq!(body, "first\n");
        assert!(!naming::job_dir(&staging, 5).exists());
    }
}
