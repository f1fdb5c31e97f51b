//! Append-only NDJSON output for one work unit.
//!
//! Each unit writes to its own uniquely-named pair of files inside the
//! job's staging directory: `{stem}.ndjson` for fetched records and
//! `{stem}-error.ndjson` for per-record failure entries. Appends are
//! line-at-a-time so a unit abandoned mid-write leaves only whole lines
//! behind.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use claimstream_core::naming;
use claimstream_core::resource::ResourceType;
use claimstream_core::types::DbId;

/// Writer for one unit's staging output.
pub struct UnitWriter {
    dir: PathBuf,
    data_name: String,
    error_name: String,
}

impl UnitWriter {
    /// Create the job's staging directory if needed and pick a fresh file
    /// stem for this unit.
    pub fn create(staging_root: &Path, job_id: DbId) -> std::io::Result<Self> {
        Self::with_stem(staging_root, job_id, &naming::new_file_stem())
    }

    /// As [`Self::create`], with an explicit stem.
    pub fn with_stem(staging_root: &Path, job_id: DbId, stem: &str) -> std::io::Result<Self> {
        let dir = naming::job_dir(staging_root, job_id);
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            data_name: naming::data_file_name(stem),
            error_name: naming::error_file_name(stem),
        })
    }

    /// Name of the data file, as recorded in `job_keys`.
    pub fn data_file_name(&self) -> &str {
        &self.data_name
    }

    pub fn data_path(&self) -> PathBuf {
        self.dir.join(&self.data_name)
    }

    pub fn error_path(&self) -> PathBuf {
        self.dir.join(&self.error_name)
    }

    /// Append one fetched record as a single NDJSON line.
    pub fn append_record(&self, record: &str) -> std::io::Result<()> {
        append_line(&self.data_path(), record.trim_end())
    }

    /// Append one failure entry to the unit's error file.
    pub fn append_error(&self, entry: &RecordError<'_>) -> std::io::Result<()> {
        append_line(&self.error_path(), &entry.to_outcome_line())
    }
}

fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(line.as_bytes())?;
    file.write_all(b"\n")
}

/// One per-record failure, rendered as a FHIR `OperationOutcome` line.
pub struct RecordError<'a> {
    pub resource_type: ResourceType,
    pub beneficiary_id: &'a str,
    pub org_id: Uuid,
    pub message: &'a str,
}

impl RecordError<'_> {
    fn to_outcome_line(&self) -> String {
        let text = format!(
            "Error retrieving {} for beneficiary {} in organization {}: {}",
            self.resource_type, self.beneficiary_id, self.org_id, self.message
        );
        serde_json::json!({
            "resourceType": "OperationOutcome",
            "issue": [{
                "severity": "error",
                "code": "exception",
                "details": { "text": text },
            }],
        })
        .to_string()
    }
}
