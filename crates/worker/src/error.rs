//! Worker-side error type.

use claimstream_core::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    /// A queue row referenced a job that no longer exists. The unit is
    /// dropped, not retried.
    #[error("export job {job_id} not found for queued unit")]
    JobMissing { job_id: DbId },

    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),

    #[error("filesystem error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed queue payload: {0}")]
    Payload(#[from] serde_json::Error),
}
