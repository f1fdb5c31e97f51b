//! Roster resolution: the authoritative beneficiary list for an
//! organization, honoring opt-out suppression.
//!
//! The roster tables are written by the external import pipeline; this
//! repository only reads the newest imported file per organization.

use sqlx::PgPool;
use uuid::Uuid;

use claimstream_core::error::CoreError;

use crate::models::roster::RosterFile;

/// Why a roster could not be resolved. "Never imported" and "resolved but
/// empty" are distinct conditions and callers report them differently.
#[derive(Debug, thiserror::Error)]
pub enum RosterResolveError {
    #[error("no roster file has been imported for organization {0}")]
    Missing(Uuid),

    #[error("roster for organization {0} resolved to zero beneficiaries")]
    Empty(Uuid),

    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

impl From<RosterResolveError> for CoreError {
    fn from(err: RosterResolveError) -> Self {
        match err {
            RosterResolveError::Missing(org_id) => CoreError::RosterMissing { org_id },
            RosterResolveError::Empty(org_id) => CoreError::RosterEmpty { org_id },
            RosterResolveError::Db(e) => CoreError::Internal(e.to_string()),
        }
    }
}

pub struct RosterRepo;

impl RosterRepo {
    /// Resolve the current roster for an organization.
    ///
    /// Reads the newest imported roster file and returns its beneficiary
    /// identifiers in stable (insertion) order. Unless `include_suppressed`
    /// is set, beneficiaries with an active opt-out are excluded.
    pub async fn resolve(
        pool: &PgPool,
        org_id: Uuid,
        include_suppressed: bool,
    ) -> Result<Vec<String>, RosterResolveError> {
        let file = Self::newest_file(pool, org_id)
            .await?
            .ok_or(RosterResolveError::Missing(org_id))?;
        let file_id = file.id;

        let query = if include_suppressed {
            "SELECT beneficiary_id FROM roster_beneficiaries \
             WHERE file_id = $1 ORDER BY id"
        } else {
            "SELECT rb.beneficiary_id FROM roster_beneficiaries rb \
             WHERE rb.file_id = $1 \
               AND NOT EXISTS ( \
                   SELECT 1 FROM suppressions s \
                   WHERE s.beneficiary_id = rb.beneficiary_id AND s.opted_out \
               ) \
             ORDER BY rb.id"
        };

        let ids: Vec<String> = sqlx::query_scalar(query).bind(file_id).fetch_all(pool).await?;

        if ids.is_empty() {
            return Err(RosterResolveError::Empty(org_id));
        }
        Ok(ids)
    }

    /// The most recently imported roster file for an organization, if any.
    pub async fn newest_file(
        pool: &PgPool,
        org_id: Uuid,
    ) -> Result<Option<RosterFile>, sqlx::Error> {
        sqlx::query_as::<_, RosterFile>(
            "SELECT id, org_id, name, imported_at FROM roster_files \
             WHERE org_id = $1 \
             ORDER BY imported_at DESC, id DESC \
             LIMIT 1",
        )
        .bind(org_id)
        .fetch_optional(pool)
        .await
    }
}
