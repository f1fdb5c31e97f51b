//! Dispatch queue rows.

use sqlx::FromRow;

use claimstream_core::types::{DbId, Timestamp};

/// A row from the `job_queue` table: one serialized work unit awaiting (or
/// undergoing) processing.
#[derive(Debug, Clone, FromRow)]
pub struct QueuedUnit {
    pub id: DbId,
    pub job_id: DbId,
    pub payload: serde_json::Value,
    pub claimed_at: Option<Timestamp>,
    pub claimed_by: Option<String>,
    pub created_at: Timestamp,
}
