use crate::types::DbId;

/// Domain-level errors shared across the export engine.
///
/// Component boundaries convert lower-level failures (I/O, network, SQL)
/// into one of these kinds before handing them to the next layer; the API
/// crate maps them onto HTTP statuses.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: DbId },

    #[error("{0}")]
    Validation(String),

    /// Every requested resource type is already covered by an unresolved
    /// export for the same organization.
    #[error("an export covering the requested resource types is already in progress")]
    Throttled { retry_after_secs: u64 },

    /// No roster file has ever been imported for the organization.
    #[error("no roster has been imported for organization {org_id}")]
    RosterMissing { org_id: uuid::Uuid },

    /// A roster exists but resolves to zero exportable beneficiaries.
    #[error("roster for organization {org_id} resolved to zero beneficiaries")]
    RosterEmpty { org_id: uuid::Uuid },

    #[error("internal error: {0}")]
    Internal(String),
}
