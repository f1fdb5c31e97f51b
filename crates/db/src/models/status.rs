//! Status enum mapping to the SMALLINT `export_job_statuses` lookup table.
//!
//! Variant discriminants match the seed data order (1-based) in the
//! migration.

/// Status ID type matching SMALLINT/SMALLSERIAL in the database.
pub type StatusId = i16;

/// Export job lifecycle status.
///
/// `Pending → InProgress → Completed → Archived → Expired`, with the side
/// branch `Pending → Failed` reachable only before any unit is dispatched.
/// The Completed transition is monotonic; no job leaves a terminal state.
#[repr(i16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportJobStatus {
    Pending = 1,
    InProgress = 2,
    Completed = 3,
    Archived = 4,
    Expired = 5,
    Failed = 6,
}

impl ExportJobStatus {
    /// Return the database status ID.
    pub fn id(self) -> StatusId {
        self as StatusId
    }

    /// Map a stored ID back to the enum. Unknown IDs are a data bug.
    pub fn from_id(id: StatusId) -> Option<Self> {
        match id {
            1 => Some(Self::Pending),
            2 => Some(Self::InProgress),
            3 => Some(Self::Completed),
            4 => Some(Self::Archived),
            5 => Some(Self::Expired),
            6 => Some(Self::Failed),
            _ => None,
        }
    }

    /// True while the job may still produce output (Pending or InProgress).
    pub fn is_unresolved(self) -> bool {
        matches!(self, Self::Pending | Self::InProgress)
    }
}

impl From<ExportJobStatus> for StatusId {
    fn from(value: ExportJobStatus) -> Self {
        value as StatusId
    }
}
