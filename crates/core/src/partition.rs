//! Roster partitioning: one export job fans out into bounded work units.

use serde::{Deserialize, Serialize};

use crate::resource::{ChunkLimits, ResourceType};
use crate::types::DbId;

/// One bounded batch of work: fetch `resource_type` records for every
/// beneficiary in `beneficiary_ids`.
///
/// Serialized as JSON into the dispatch queue. Consumed at-least-once, so
/// processing must stay idempotent (each unit writes its own uniquely named
/// output files).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkUnit {
    pub job_id: DbId,
    pub resource_type: ResourceType,
    pub beneficiary_ids: Vec<String>,
    /// Per-job correlation sequence, unique across all of the job's units.
    pub sequence: u32,
    /// Changed-since filter supplied by the caller, forwarded verbatim to
    /// the upstream server.
    pub since: Option<String>,
}

/// Split a resolved roster into work units for each approved resource type.
///
/// Each type's identifier list is cut into consecutive chunks of at most
/// its configured maximum, yielding exactly `ceil(N/K)` units per type.
/// An empty roster yields zero units. Sequence numbers run across the whole
/// job in production order.
pub fn partition(
    job_id: DbId,
    types: &[ResourceType],
    beneficiary_ids: &[String],
    since: Option<&str>,
    limits: &ChunkLimits,
) -> Vec<WorkUnit> {
    let mut units = Vec::new();
    let mut sequence: u32 = 0;

    for &rt in types {
        let limit = limits.limit_for(rt);
        for chunk in beneficiary_ids.chunks(limit) {
            units.push(WorkUnit {
                job_id,
                resource_type: rt,
                beneficiary_ids: chunk.to_vec(),
                sequence,
                since: since.map(str::to_owned),
            });
            sequence += 1;
        }
    }

    units
}
