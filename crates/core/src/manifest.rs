//! The completed-job manifest returned by the status endpoint.

use serde::Serialize;

use crate::naming;
use crate::types::{DbId, Timestamp};

/// One downloadable file descriptor.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FileItem {
    /// FHIR resource type of the file contents.
    #[serde(rename = "type")]
    pub resource_type: String,
    pub url: String,
}

/// Manifest body for a completed export, one `output` entry per unit
/// completion record and one `error` entry per unit that recorded failures.
#[derive(Debug, Clone, Serialize)]
pub struct ExportManifest {
    /// Data snapshot time captured at admission.
    #[serde(rename = "transactionTime")]
    pub transaction_time: Timestamp,
    /// The originating request URL.
    #[serde(rename = "request")]
    pub request_url: String,
    #[serde(rename = "requiresAccessToken")]
    pub requires_access_token: bool,
    #[serde(rename = "output")]
    pub files: Vec<FileItem>,
    #[serde(rename = "error")]
    pub errors: Vec<FileItem>,
    #[serde(rename = "jobID")]
    pub job_id: DbId,
}

/// A unit completion record, as read back from the job record store.
#[derive(Debug, Clone)]
pub struct CompletedUnit {
    pub resource_type: String,
    pub file_name: String,
}

/// Assemble the manifest for a completed job.
///
/// `has_error_file` reports whether a given file name exists in the job's
/// payload directory; error files are only listed when the unit actually
/// recorded failures.
pub fn build(
    base_url: &str,
    job_id: DbId,
    request_url: &str,
    transaction_time: Timestamp,
    units: &[CompletedUnit],
    has_error_file: impl Fn(&str) -> bool,
) -> ExportManifest {
    let mut files = Vec::with_capacity(units.len());
    let mut errors = Vec::new();

    for unit in units {
        let file_name = unit.file_name.trim();
        files.push(FileItem {
            resource_type: unit.resource_type.clone(),
            url: format!("{base_url}/data/{job_id}/{file_name}"),
        });

        let error_name = naming::error_file_for(file_name);
        if has_error_file(&error_name) {
            errors.push(FileItem {
                resource_type: "OperationOutcome".to_string(),
                url: format!("{base_url}/data/{job_id}/{error_name}"),
            });
        }
    }

    ExportManifest {
        transaction_time,
        request_url: request_url.to_string(),
        requires_access_token: true,
        files,
        errors,
        job_id,
    }
}
