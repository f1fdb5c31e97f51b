//! Handler for `GET /api/v1/jobs/{id}`: progress polling and the
//! completed-job manifest.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use claimstream_core::error::CoreError;
use claimstream_core::types::DbId;
use claimstream_core::{manifest, naming, progress};
use claimstream_db::models::export_job::ExportJob;
use claimstream_db::models::status::ExportJobStatus;
use claimstream_db::repositories::{ExportJobRepo, JobKeyRepo};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthOrg;
use crate::state::AppState;

/// GET /api/v1/jobs/{id}
///
/// Poll an export job. Unresolved jobs answer 202 with an `X-Progress`
/// header; a Completed job inside the visibility window answers 200 with
/// the download manifest; anything whose output has left the window
/// answers 410. A job belonging to another organization reads as 404.
pub async fn job_status(
    auth: AuthOrg,
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
) -> AppResult<Response> {
    let job = ExportJobRepo::find_for_org(&state.pool, job_id, auth.org_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "ExportJob",
            id: job_id,
        }))?;

    let status = ExportJobStatus::from_id(job.status_id).ok_or_else(|| {
        AppError::InternalError(format!(
            "job {} carries unknown status id {}",
            job.id, job.status_id
        ))
    })?;

    match status {
        ExportJobStatus::Pending | ExportJobStatus::InProgress => {
            let completed = JobKeyRepo::count_for_job(&state.pool, job.id).await?;
            let message = progress::progress_message(
                status == ExportJobStatus::InProgress,
                completed,
                job.expected_unit_count,
            );
            Ok((StatusCode::ACCEPTED, [("X-Progress", message)]).into_response())
        }

        ExportJobStatus::Completed => {
            let expires_at = job.updated_at + state.config.visibility_window;
            if expires_at <= chrono::Utc::now() {
                // The sweeper has not archived it yet, but the client
                // contract has already lapsed.
                return Err(gone(&job, expires_at));
            }
            completed_manifest(&state, &job).await
        }

        ExportJobStatus::Archived | ExportJobStatus::Expired => {
            // updated_at is when the sweeper moved the job on; the output
            // was reachable for a full visibility window after that.
            Err(gone(&job, job.updated_at + state.config.visibility_window))
        }

        ExportJobStatus::Failed => Err(AppError::InternalError(format!(
            "export job {} failed during admission",
            job.id
        ))),
    }
}

fn gone(job: &ExportJob, expires: claimstream_core::types::Timestamp) -> AppError {
    AppError::Gone {
        message: format!("output for export job {} is no longer available", job.id),
        expires: Some(expires),
    }
}

async fn completed_manifest(state: &AppState, job: &ExportJob) -> AppResult<Response> {
    let transaction_time = job.transaction_time.ok_or_else(|| {
        AppError::InternalError(format!("completed job {} has no transaction time", job.id))
    })?;

    let units: Vec<_> = JobKeyRepo::list_for_job(&state.pool, job.id)
        .await?
        .into_iter()
        .map(|key| manifest::CompletedUnit {
            resource_type: key.resource_type,
            file_name: key.file_name,
        })
        .collect();

    let job_dir = naming::job_dir(&state.config.payload_dir, job.id);
    let body = manifest::build(
        &state.config.public_base_url,
        job.id,
        &job.request_url,
        transaction_time,
        &units,
        |name| job_dir.join(name).is_file(),
    );

    Ok((StatusCode::OK, Json(body)).into_response())
}
