//! Production HTTP client for the FHIR data server.
//!
//! Configured from environment variables; supports mutual TLS when client
//! certificate material is provided. Retry/backoff is the server's own
//! responsibility, so a failed call here is terminal.

use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use claimstream_core::resource::ResourceType;
use claimstream_core::types::{DbId, Timestamp};

use crate::{DataServerClient, UpstreamError};

/// Default per-call timeout.
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// HTTP implementation of [`DataServerClient`].
pub struct FhirDataClient {
    base_url: String,
    client: reqwest::Client,
}

impl FhirDataClient {
    /// Build a client from environment variables.
    ///
    /// | Env Var                     | Meaning                               |
    /// |-----------------------------|---------------------------------------|
    /// | `UPSTREAM_BASE_URL`         | FHIR server base URL (required)       |
    /// | `UPSTREAM_CLIENT_CERT_FILE` | PEM client cert + key for mTLS        |
    /// | `UPSTREAM_TIMEOUT_SECS`     | per-call timeout (default 120)        |
    pub fn from_env() -> Result<Self, UpstreamError> {
        let base_url = std::env::var("UPSTREAM_BASE_URL")
            .map_err(|_| UpstreamError::Config("UPSTREAM_BASE_URL must be set".into()))?;

        let timeout_secs: u64 = std::env::var("UPSTREAM_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .use_rustls_tls();

        if let Ok(cert_path) = std::env::var("UPSTREAM_CLIENT_CERT_FILE") {
            let pem = std::fs::read(&cert_path).map_err(|e| {
                UpstreamError::Config(format!("cannot read client cert {cert_path}: {e}"))
            })?;
            let identity = reqwest::Identity::from_pem(&pem).map_err(|e| {
                UpstreamError::Config(format!("invalid client cert {cert_path}: {e}"))
            })?;
            builder = builder.identity(identity);
        }

        let client = builder
            .build()
            .map_err(|e| UpstreamError::Config(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Issue a GET and return the body, mapping non-success statuses.
    async fn get_body(&self, request: reqwest::RequestBuilder) -> Result<String, UpstreamError> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status {
                code: status.as_u16(),
            });
        }
        Ok(response.text().await?)
    }
}

#[async_trait]
impl DataServerClient for FhirDataClient {
    async fn fetch_record(
        &self,
        resource_type: ResourceType,
        beneficiary_id: &str,
        job_id: DbId,
        org_id: Uuid,
        since: Option<&str>,
    ) -> Result<String, UpstreamError> {
        let url = format!("{}/{}", self.base_url, resource_type);

        let mut request = self
            .client
            .get(&url)
            .query(&[("patient", beneficiary_id), ("_format", "application/fhir+json")])
            .header("X-Export-Job-Id", job_id.to_string())
            .header("X-Export-Org-Id", org_id.to_string());

        if let Some(since) = since {
            request = request.query(&[("_lastUpdated", since)]);
        }

        self.get_body(request).await
    }

    async fn fetch_metadata(&self) -> Result<Timestamp, UpstreamError> {
        let url = format!("{}/metadata", self.base_url);
        let body = self.get_body(self.client.get(&url)).await?;

        let value: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| UpstreamError::Malformed(format!("metadata is not JSON: {e}")))?;

        let last_updated = value
            .pointer("/meta/lastUpdated")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                UpstreamError::Malformed("metadata response missing meta.lastUpdated".into())
            })?;

        chrono::DateTime::parse_from_rfc3339(last_updated)
            .map(|dt| dt.with_timezone(&chrono::Utc))
            .map_err(|e| UpstreamError::Malformed(format!("bad meta.lastUpdated: {e}")))
    }
}
