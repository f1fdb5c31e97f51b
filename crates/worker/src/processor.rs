//! Per-unit processing: fetch each beneficiary's records, isolate
//! per-record failures, record the unit's output file, and run the
//! completion check.

use sqlx::PgPool;
use tracing::{debug, warn};
use uuid::Uuid;

use claimstream_core::partition::WorkUnit;
use claimstream_db::repositories::{ExportJobRepo, JobKeyRepo};
use claimstream_upstream::DataServerClient;

use crate::completion;
use crate::error::WorkerError;
use crate::writer::{RecordError, UnitWriter};
use crate::DataDirs;

/// What one unit produced.
#[derive(Debug)]
pub struct UnitOutcome {
    pub fetched: usize,
    pub failed: usize,
}

/// Process one claimed work unit end to end.
///
/// A failed record fetch is isolated into the unit's error file; only
/// infrastructure failures (database, filesystem) abort the unit. Returns
/// `true` when this unit was the one that completed the job.
pub async fn process_unit(
    pool: &PgPool,
    client: &dyn DataServerClient,
    dirs: &DataDirs,
    unit: &WorkUnit,
) -> Result<bool, WorkerError> {
    let job = ExportJobRepo::find_by_id(pool, unit.job_id)
        .await?
        .ok_or(WorkerError::JobMissing {
            job_id: unit.job_id,
        })?;

    // First unit to arrive moves the job out of Pending; a no-op for the
    // rest.
    ExportJobRepo::mark_in_progress(pool, unit.job_id).await?;

    let sequence = unit.sequence as i32;

    // The queue is at-least-once: a worker that died between recording the
    // unit and acking the claim gets the unit redelivered. The completion
    // record is the unit's commit point, so an existing record means the
    // output is already written and only the completion check remains.
    if JobKeyRepo::find_by_sequence(pool, unit.job_id, sequence)
        .await?
        .is_some()
    {
        debug!(
            job_id = unit.job_id,
            sequence = unit.sequence,
            "unit already recorded, skipping rewrite"
        );
        return completion::check_and_promote(pool, unit.job_id, dirs).await;
    }

    let writer = UnitWriter::create(&dirs.staging, unit.job_id)?;
    let outcome = write_unit_records(client, unit, job.org_id, &writer).await?;

    debug!(
        job_id = unit.job_id,
        resource_type = %unit.resource_type,
        sequence = unit.sequence,
        fetched = outcome.fetched,
        failed = outcome.failed,
        "unit written"
    );

    let recorded = JobKeyRepo::insert(
        pool,
        unit.job_id,
        sequence,
        unit.resource_type.as_str(),
        writer.data_file_name(),
    )
    .await?;

    // Lost the record race to a concurrent redelivery: the other worker's
    // files are authoritative, so discard ours.
    if recorded.is_none() {
        remove_unit_files(&writer)?;
    }

    completion::check_and_promote(pool, unit.job_id, dirs).await
}

/// Fetch every beneficiary in the unit, appending records and failure
/// entries as we go.
pub async fn write_unit_records(
    client: &dyn DataServerClient,
    unit: &WorkUnit,
    org_id: Uuid,
    writer: &UnitWriter,
) -> Result<UnitOutcome, WorkerError> {
    let mut outcome = UnitOutcome {
        fetched: 0,
        failed: 0,
    };

    for beneficiary_id in &unit.beneficiary_ids {
        match client
            .fetch_record(
                unit.resource_type,
                beneficiary_id,
                unit.job_id,
                org_id,
                unit.since.as_deref(),
            )
            .await
        {
            Ok(record) => {
                writer.append_record(&record)?;
                outcome.fetched += 1;
            }
            Err(err) => {
                warn!(
                    job_id = unit.job_id,
                    resource_type = %unit.resource_type,
                    beneficiary_id = %beneficiary_id,
                    error = %err,
                    "record fetch failed"
                );
                writer.append_error(&RecordError {
                    resource_type: unit.resource_type,
                    beneficiary_id,
                    org_id,
                    message: &err.to_string(),
                })?;
                outcome.failed += 1;
            }
        }
    }

    Ok(outcome)
}

/// Delete a unit's staged output after losing the record race.
fn remove_unit_files(writer: &UnitWriter) -> Result<(), WorkerError> {
    for path in [writer.data_path(), writer.error_path()] {
        match std::fs::remove_file(&path) {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }
    }
    Ok(())
}
