//! Archival sweeper: moves stale Completed jobs' payloads to the archive
//! directory, and later purges archived output past the retention
//! threshold.
//!
//! Both passes are exposed as one-shot functions so they can run from a
//! periodic loop in production and directly in tests.

use std::path::Path;
use std::time::SystemTime;

use sqlx::PgPool;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use claimstream_core::naming;
use claimstream_core::types::DbId;
use claimstream_db::repositories::ExportJobRepo;

use crate::config::WorkerConfig;
use crate::DataDirs;

/// What one sweeper pass did.
#[derive(Debug, Default)]
pub struct SweepReport {
    pub processed: usize,
    pub failures: usize,
}

/// Move every Completed-and-stale job's payload directory into the
/// archive root and mark the job Archived.
///
/// A job whose payload directory is already gone is treated as archived;
/// only the status flip remains to be done.
pub async fn archive_once(
    pool: &PgPool,
    dirs: &DataDirs,
    window: chrono::Duration,
) -> Result<SweepReport, sqlx::Error> {
    let cutoff = chrono::Utc::now() - window;
    let jobs = ExportJobRepo::stale_completed(pool, cutoff).await?;

    let mut report = SweepReport::default();
    for job in jobs {
        match archive_job_dir(&dirs.payload, &dirs.archive, job.id) {
            Ok(()) => {
                ExportJobRepo::mark_archived(pool, job.id).await?;
                report.processed += 1;
            }
            Err(e) => {
                error!(job_id = job.id, error = %e, "archiving payload failed");
                report.failures += 1;
            }
        }
    }

    if report.processed > 0 || report.failures > 0 {
        info!(
            archived = report.processed,
            failures = report.failures,
            "archive pass finished"
        );
    }
    Ok(report)
}

/// Move one job's payload directory under the archive root. Absent source
/// is not an error.
pub fn archive_job_dir(
    payload_root: &Path,
    archive_root: &Path,
    job_id: DbId,
) -> std::io::Result<()> {
    let source = naming::job_dir(payload_root, job_id);
    if !source.exists() {
        return Ok(());
    }
    std::fs::create_dir_all(archive_root)?;
    std::fs::rename(&source, naming::job_dir(archive_root, job_id))
}

/// Delete archive entries whose modification time predates the retention
/// threshold, marking the matching jobs Expired.
///
/// Entries whose names are not job identifiers are purged without a
/// status update; they can only be leftovers from manual intervention.
pub async fn purge_once(
    pool: &PgPool,
    dirs: &DataDirs,
    threshold: chrono::Duration,
) -> Result<SweepReport, sqlx::Error> {
    let cutoff = SystemTime::now()
        - std::time::Duration::from_secs(threshold.num_seconds().max(0) as u64);

    let candidates = match purge_candidates(&dirs.archive, cutoff) {
        Ok(candidates) => candidates,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(SweepReport::default()),
        Err(e) => {
            error!(error = %e, "scanning archive directory failed");
            return Ok(SweepReport {
                processed: 0,
                failures: 1,
            });
        }
    };

    let mut report = SweepReport::default();
    for (path, job_id) in candidates {
        let removed = if path.is_dir() {
            std::fs::remove_dir_all(&path)
        } else {
            std::fs::remove_file(&path)
        };
        if let Err(e) = removed {
            error!(path = %path.display(), error = %e, "purging archive entry failed");
            report.failures += 1;
            continue;
        }

        match job_id {
            Some(job_id) => ExportJobRepo::mark_expired(pool, job_id).await?,
            None => warn!(path = %path.display(), "purged archive entry with no job id"),
        }
        report.processed += 1;
    }

    if report.processed > 0 || report.failures > 0 {
        info!(
            purged = report.processed,
            failures = report.failures,
            "purge pass finished"
        );
    }
    Ok(report)
}

/// Archive entries older than `cutoff`, paired with the job id parsed
/// from the entry name when it has one.
pub fn purge_candidates(
    archive_root: &Path,
    cutoff: SystemTime,
) -> std::io::Result<Vec<(std::path::PathBuf, Option<DbId>)>> {
    let mut candidates = Vec::new();
    for entry in std::fs::read_dir(archive_root)? {
        let entry = entry?;
        let modified = entry.metadata()?.modified()?;
        if modified >= cutoff {
            continue;
        }
        let job_id = entry.file_name().to_str().and_then(|n| n.parse().ok());
        candidates.push((entry.path(), job_id));
    }
    Ok(candidates)
}

/// Periodic loop running both passes until cancelled.
pub async fn run(pool: PgPool, config: WorkerConfig, cancel: CancellationToken) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(config.sweep_interval) => {}
        }

        if let Err(e) = archive_once(&pool, &config.dirs, config.visibility_window).await {
            error!(error = %e, "archive pass failed");
        }
        if let Err(e) = purge_once(&pool, &config.dirs, config.purge_threshold).await {
            error!(error = %e, "purge pass failed");
        }
    }
    info!("sweeper stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use filetime::FileTime;

    #[test]
    fn archive_moves_payload_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let (payload, archive) = (tmp.path().join("payload"), tmp.path().join("archive"));
        let dir = naming::job_dir(&payload, 9);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("a.ndjson"), "x\n").unwrap();

        archive_job_dir(&payload, &archive, 9).unwrap();

        assert!(!dir.exists());
        assert!(naming::job_dir(&archive, 9).join("a.ndjson").exists());
    }

    #[test]
    fn archive_of_missing_dir_is_ok() {
        let tmp = tempfile::tempdir().unwrap();
        archive_job_dir(&tmp.path().join("payload"), &tmp.path().join("archive"), 9).unwrap();
    }

    #[test]
    fn purge_candidates_honor_mtime_cutoff() {
        let tmp = tempfile::tempdir().unwrap();
        let old_dir = naming::job_dir(tmp.path(), 3);
        let new_dir = naming::job_dir(tmp.path(), 4);
        std::fs::create_dir_all(&old_dir).unwrap();
        std::fs::create_dir_all(&new_dir).unwrap();

        let past = FileTime::from_system_time(SystemTime::now() - Duration::from_secs(7_200));
        filetime::set_file_mtime(&old_dir, past).unwrap();

        let cutoff = SystemTime::now() - Duration::from_secs(3_600);
        let candidates = purge_candidates(tmp.path(), cutoff).unwrap();

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].0, old_dir);
        assert_eq!(candidates[0].1, Some(3));
    }

    #[test]
    fn purge_candidates_flag_orphan_entries() {
        let tmp = tempfile::tempdir().unwrap();
        let orphan = tmp.path().join("not-a-job");
        std::fs::create_dir_all(&orphan).unwrap();
        let past = FileTime::from_system_time(SystemTime::now() - Duration::from_secs(7_200));
        filetime::set_file_mtime(&orphan, past).unwrap();

        let cutoff = SystemTime::now() - Duration::from_secs(3_600);
        let candidates = purge_candidates(tmp.path(), cutoff).unwrap();

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].1, None);
    }
}
