//! Handler for `GET /data/{job_id}/{file}`: payload file downloads.

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

use claimstream_core::error::CoreError;
use claimstream_core::naming;
use claimstream_core::types::DbId;
use claimstream_db::repositories::ExportJobRepo;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthOrg;
use crate::state::AppState;

/// GET /data/{job_id}/{file}
///
/// Serve one NDJSON file from a job's payload directory. The file name is
/// validated against path traversal, and the job must belong to the
/// calling organization. Absent files (including everything belonging to
/// an archived job) read as 404.
pub async fn download(
    auth: AuthOrg,
    State(state): State<AppState>,
    Path((job_id, file_name)): Path<(DbId, String)>,
) -> AppResult<Response> {
    let not_found = AppError::Core(CoreError::NotFound {
        entity: "ExportFile",
        id: job_id,
    });

    if !naming::is_safe_file_name(&file_name) {
        return Err(not_found);
    }

    ExportJobRepo::find_for_org(&state.pool, job_id, auth.org_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "ExportJob",
            id: job_id,
        }))?;

    let path = naming::job_dir(&state.config.payload_dir, job_id).join(&file_name);
    let body = match tokio::fs::read(&path).await {
        Ok(body) => body,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(not_found),
        Err(e) => {
            return Err(AppError::InternalError(format!(
                "reading payload file {} failed: {e}",
                path.display()
            )));
        }
    };

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/fhir+ndjson")],
        body,
    )
        .into_response())
}
