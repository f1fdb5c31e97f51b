//! Roster file metadata.

use sqlx::FromRow;
use uuid::Uuid;

use claimstream_core::types::{DbId, Timestamp};

/// A row from the `roster_files` table. The newest file per organization is
/// the authoritative roster; older files are kept for audit.
#[derive(Debug, Clone, FromRow)]
pub struct RosterFile {
    pub id: DbId,
    pub org_id: Uuid,
    pub name: String,
    pub imported_at: Timestamp,
}
