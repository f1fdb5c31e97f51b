//! Unit completion records.

use serde::Serialize;
use sqlx::FromRow;

use claimstream_core::types::{DbId, Timestamp};

/// A row from the `job_keys` table: one work unit finished and wrote the
/// named output file. The completion aggregator counts these against the
/// job's expected unit count.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct JobKey {
    pub id: DbId,
    pub job_id: DbId,
    pub sequence: i32,
    pub resource_type: String,
    pub file_name: String,
    pub created_at: Timestamp,
}
