//! The upstream clinical-data server capability.
//!
//! The export engine needs exactly two operations from the FHIR data
//! server: fetch one beneficiary's records for a resource type, and fetch
//! the server's current snapshot timestamp. Both live behind
//! [`DataServerClient`] so workers and handlers take a trait object and
//! tests substitute canned implementations.
//!
//! The server applies its own retry/backoff; a returned error is terminal
//! for that call and its message is suitable for direct inclusion in a
//! per-record error entry.

pub mod http;

use async_trait::async_trait;
use uuid::Uuid;

use claimstream_core::resource::ResourceType;
use claimstream_core::types::{DbId, Timestamp};

/// Errors surfaced by the upstream data server.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    /// Client misconfiguration (bad base URL, unreadable certificates).
    #[error("upstream client configuration error: {0}")]
    Config(String),

    /// The request could not be performed at all.
    #[error("upstream request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("upstream returned status {code}")]
    Status { code: u16 },

    /// The response body did not carry what we needed.
    #[error("unexpected upstream response: {0}")]
    Malformed(String),
}

/// Capability contract for the clinical-data server.
#[async_trait]
pub trait DataServerClient: Send + Sync {
    /// Fetch one beneficiary's records for a resource type, returning the
    /// raw JSON payload to be written verbatim as one NDJSON line.
    ///
    /// `job_id` and `org_id` are forwarded for upstream-side request
    /// correlation; `since` narrows to records changed after the instant.
    async fn fetch_record(
        &self,
        resource_type: ResourceType,
        beneficiary_id: &str,
        job_id: DbId,
        org_id: Uuid,
        since: Option<&str>,
    ) -> Result<String, UpstreamError>;

    /// Fetch the server's current data snapshot timestamp.
    ///
    /// Captured once per job at admission; a failure here is fatal to the
    /// job before any unit is dispatched.
    async fn fetch_metadata(&self) -> Result<Timestamp, UpstreamError>;
}
