//! Supported FHIR resource types and export request validation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Default chunk maximum for `ExplanationOfBenefit` work units.
/// EOB bundles are an order of magnitude heavier than the other types.
pub const CHUNK_MAX_EOB_DEFAULT: usize = 200;

/// Default chunk maximum for `Coverage` work units.
pub const CHUNK_MAX_COVERAGE_DEFAULT: usize = 4000;

/// Default chunk maximum for `Patient` work units.
pub const CHUNK_MAX_PATIENT_DEFAULT: usize = 5000;

/// The resource types this service can export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceType {
    Patient,
    Coverage,
    ExplanationOfBenefit,
}

impl ResourceType {
    /// All supported types, in the order a default (no `_type`) request
    /// expands to.
    pub fn all() -> [ResourceType; 3] {
        [
            ResourceType::Patient,
            ResourceType::ExplanationOfBenefit,
            ResourceType::Coverage,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ResourceType::Patient => "Patient",
            ResourceType::Coverage => "Coverage",
            ResourceType::ExplanationOfBenefit => "ExplanationOfBenefit",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Patient" => Ok(ResourceType::Patient),
            "Coverage" => Ok(ResourceType::Coverage),
            "ExplanationOfBenefit" => Ok(ResourceType::ExplanationOfBenefit),
            other => Err(CoreError::Validation(format!(
                "invalid resource type: {other}"
            ))),
        }
    }
}

/// Per-resource-type chunk maxima used by the partitioner.
///
/// Each type carries its own bound because per-record payload cost differs;
/// a richer resource type gets a smaller chunk.
#[derive(Debug, Clone, Copy)]
pub struct ChunkLimits {
    pub patient: usize,
    pub coverage: usize,
    pub explanation_of_benefit: usize,
}

impl Default for ChunkLimits {
    fn default() -> Self {
        Self {
            patient: CHUNK_MAX_PATIENT_DEFAULT,
            coverage: CHUNK_MAX_COVERAGE_DEFAULT,
            explanation_of_benefit: CHUNK_MAX_EOB_DEFAULT,
        }
    }
}

impl ChunkLimits {
    /// The chunk maximum for one resource type. Never zero; a zero override
    /// is clamped to one so partitioning always terminates.
    pub fn limit_for(&self, resource_type: ResourceType) -> usize {
        let limit = match resource_type {
            ResourceType::Patient => self.patient,
            ResourceType::Coverage => self.coverage,
            ResourceType::ExplanationOfBenefit => self.explanation_of_benefit,
        };
        limit.max(1)
    }
}

/// Parse the `_type` request parameter into a validated list of resource
/// types.
///
/// - `None` (parameter absent) expands to all supported types, matching the
///   "default export covers everything" request semantics.
/// - Unknown types and repeated types are validation errors.
pub fn parse_requested_types(raw: Option<&str>) -> Result<Vec<ResourceType>, CoreError> {
    let raw = match raw {
        Some(r) => r,
        None => return Ok(ResourceType::all().to_vec()),
    };

    let mut types = Vec::new();
    for part in raw.split(',') {
        let rt: ResourceType = part.trim().parse()?;
        if types.contains(&rt) {
            return Err(CoreError::Validation(format!(
                "repeated resource type: {rt}"
            )));
        }
        types.push(rt);
    }
    Ok(types)
}

/// Validate the `_since` request parameter as an RFC 3339 instant.
pub fn validate_since(raw: &str) -> Result<(), CoreError> {
    chrono::DateTime::parse_from_rfc3339(raw)
        .map(|_| ())
        .map_err(|_| {
            CoreError::Validation(
                "invalid date format supplied in _since parameter; must be RFC 3339".to_string(),
            )
        })
}
