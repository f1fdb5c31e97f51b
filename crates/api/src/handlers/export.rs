//! Handler for `POST /api/v1/export`: admission, snapshot capture,
//! partitioning, and dispatch.

use axum::extract::{OriginalUri, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Deserialize;

use claimstream_core::admission::{self, AdmissionDecision};
use claimstream_core::error::CoreError;
use claimstream_core::partition;
use claimstream_core::resource::{parse_requested_types, validate_since, ResourceType};
use claimstream_db::models::export_job::{ExportJob, NewExportJob};
use claimstream_db::repositories::{ExportJobRepo, QueueRepo, RosterRepo};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthOrg;
use crate::state::AppState;

/// Query parameters of a bulk export request, FHIR-style underscore names.
#[derive(Debug, Deserialize)]
pub struct ExportParams {
    #[serde(rename = "_type")]
    pub types: Option<String>,
    #[serde(rename = "_since")]
    pub since: Option<String>,
}

/// POST /api/v1/export
///
/// Admit a new export request. Returns 202 with a `Content-Location`
/// header pointing at the job's status endpoint, 400 on invalid
/// parameters, or 429 with `Retry-After` when every requested type is
/// already covered by an unresolved export.
pub async fn start_export(
    auth: AuthOrg,
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Query(params): Query<ExportParams>,
) -> AppResult<impl IntoResponse> {
    // ---- Validation ----
    let requested = parse_requested_types(params.types.as_deref()).map_err(AppError::Core)?;
    if let Some(since) = &params.since {
        validate_since(since).map_err(AppError::Core)?;
    }

    // ---- Admission ----
    let window_start = chrono::Utc::now() - state.config.visibility_window;
    let prior: Vec<_> = ExportJobRepo::list_for_org_since(&state.pool, auth.org_id, window_start)
        .await?
        .iter()
        .map(ExportJob::to_prior_job)
        .collect();

    let approved = match admission::evaluate(
        &prior,
        &requested,
        state.config.visibility_window,
        chrono::Utc::now(),
    ) {
        AdmissionDecision::Approved(types) => types,
        AdmissionDecision::Throttled => {
            return Err(AppError::Core(CoreError::Throttled {
                retry_after_secs: state.config.retry_after_secs,
            }));
        }
    };

    // A marker-less request stays marker-less on the job row; that is what
    // makes it block all types for later admissions.
    let stored_types = params
        .types
        .as_ref()
        .map(|_| approved.iter().map(|t| t.to_string()).collect());

    let job = ExportJobRepo::create(
        &state.pool,
        &NewExportJob {
            org_id: auth.org_id,
            user_id: auth.user_id,
            request_url: uri.to_string(),
            requested_types: stored_types,
            since: params.since.clone(),
        },
    )
    .await?;

    tracing::info!(
        job_id = job.id,
        org_id = %auth.org_id,
        types = ?approved,
        "export job admitted"
    );

    // ---- Snapshot time ----
    let transaction_time = match state.upstream.fetch_metadata().await {
        Ok(ts) => ts,
        Err(e) => {
            ExportJobRepo::mark_failed(&state.pool, job.id).await?;
            return Err(AppError::InternalError(format!(
                "upstream metadata fetch failed for job {}: {e}",
                job.id
            )));
        }
    };
    ExportJobRepo::set_transaction_time(&state.pool, job.id, transaction_time).await?;

    // ---- Partition and dispatch ----
    match dispatch_units(&state, &job, &approved, params.since.as_deref()).await {
        Ok(unit_count) => {
            tracing::info!(job_id = job.id, unit_count, "export job dispatched");
        }
        Err(e) => {
            ExportJobRepo::mark_failed(&state.pool, job.id).await?;
            return Err(e);
        }
    }

    let location = format!("{}/api/v1/jobs/{}", state.config.public_base_url, job.id);
    Ok((StatusCode::ACCEPTED, [("Content-Location", location)]))
}

/// Resolve the roster, partition it, persist the expectation, and enqueue
/// every unit. Returns the number of units dispatched.
async fn dispatch_units(
    state: &AppState,
    job: &ExportJob,
    approved: &[ResourceType],
    since: Option<&str>,
) -> AppResult<usize> {
    let beneficiaries = RosterRepo::resolve(&state.pool, job.org_id, false)
        .await
        .map_err(|e| AppError::Core(e.into()))?;

    let units = partition::partition(
        job.id,
        approved,
        &beneficiaries,
        since,
        &state.config.chunk_limits,
    );

    // The expectation must be durable before the first unit is visible to a
    // worker, or the completion check could fire with an understated count.
    ExportJobRepo::set_expected_units(&state.pool, job.id, units.len() as i32).await?;

    for unit in &units {
        let payload = serde_json::to_value(unit)
            .map_err(|e| AppError::InternalError(format!("unit serialization failed: {e}")))?;
        QueueRepo::enqueue(&state.pool, job.id, &payload).await?;
    }

    // A zero-unit job has nothing to wait for; complete it here so the
    // client sees an empty manifest rather than an eternal 202.
    if units.is_empty() {
        ExportJobRepo::complete_if_done(&state.pool, job.id).await?;
    }

    Ok(units.len())
}
