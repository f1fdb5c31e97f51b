//! Export job entity and insert DTO.

use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use claimstream_core::types::{DbId, Timestamp};

use super::status::StatusId;

/// A row from the `export_jobs` table.
///
/// Never deleted; a job only moves forward through its status lifecycle.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ExportJob {
    pub id: DbId,
    pub org_id: Uuid,
    pub user_id: Uuid,
    pub request_url: String,
    /// `None` means the request carried no `_type` marker and covers all
    /// resource types (this matters to admission control).
    pub requested_types: Option<Vec<String>>,
    pub since: Option<String>,
    /// Data snapshot time, captured from upstream before any unit is
    /// dispatched. `None` only while Pending or after a Failed admission.
    pub transaction_time: Option<Timestamp>,
    pub status_id: StatusId,
    pub expected_unit_count: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Fields for inserting a new Pending job at admission time.
#[derive(Debug, Clone)]
pub struct NewExportJob {
    pub org_id: Uuid,
    pub user_id: Uuid,
    pub request_url: String,
    /// The approved (narrowed) resource types, or `None` for a marker-less
    /// request.
    pub requested_types: Option<Vec<String>>,
    pub since: Option<String>,
}
