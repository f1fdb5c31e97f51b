//! Admission policy for new export requests.
//!
//! One organization may not have two unresolved exports covering the same
//! resource type inside the visibility window; unbounded concurrent
//! re-export of the same data would flood both the upstream FHIR server and
//! the worker pool. The policy narrows a new request to the resource types
//! no unresolved job is already working, and throttles when none remain.

use chrono::Duration;

use crate::resource::ResourceType;
use crate::types::Timestamp;

/// The slice of a previously admitted job the policy needs to see.
#[derive(Debug, Clone)]
pub struct PriorJob {
    /// The types the prior request explicitly asked for. `None` means the
    /// request carried no type marker and therefore covers all types.
    pub requested_types: Option<Vec<ResourceType>>,
    /// True while the job is Pending or InProgress.
    pub unresolved: bool,
    pub created_at: Timestamp,
}

/// Outcome of evaluating a new request against an organization's history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmissionDecision {
    /// Admit, narrowed to the resource types not already being worked.
    Approved(Vec<ResourceType>),
    /// Every requested type is already covered; caller should retry later.
    Throttled,
}

impl PriorJob {
    fn blocks_within(&self, window: Duration, now: Timestamp) -> bool {
        self.unresolved && self.created_at + window > now
    }
}

/// Evaluate a new export request against the organization's prior jobs.
///
/// A requested type is "already worked" when some unresolved prior job
/// created within `window` explicitly lists it. A prior job with no type
/// marker blocks every requested type unconditionally: a marker-less
/// request meant "export everything", so anything asked for now is already
/// covered by it. The asymmetry is deliberate.
pub fn evaluate(
    prior_jobs: &[PriorJob],
    requested: &[ResourceType],
    window: Duration,
    now: Timestamp,
) -> AdmissionDecision {
    let mut unworked = Vec::new();

    for &rt in requested {
        let mut worked = false;
        for job in prior_jobs {
            if !job.blocks_within(window, now) {
                continue;
            }
            match &job.requested_types {
                Some(types) => {
                    if types.contains(&rt) {
                        worked = true;
                        break;
                    }
                }
                // No marker: the prior request covers all types.
                None => return AdmissionDecision::Throttled,
            }
        }
        if !worked {
            unworked.push(rt);
        }
    }

    if unworked.is_empty() {
        AdmissionDecision::Throttled
    } else {
        AdmissionDecision::Approved(unworked)
    }
}
