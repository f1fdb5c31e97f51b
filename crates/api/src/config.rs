use std::path::PathBuf;

use claimstream_core::resource::{
    ChunkLimits, CHUNK_MAX_COVERAGE_DEFAULT, CHUNK_MAX_EOB_DEFAULT, CHUNK_MAX_PATIENT_DEFAULT,
};

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Externally visible base URL used in `Content-Location` headers and
    /// manifest download links.
    pub public_base_url: String,
    /// Where completed jobs' files are served from.
    pub payload_dir: PathBuf,
    /// How long Completed output stays visible, and how far back admission
    /// control looks for prior jobs.
    pub visibility_window: chrono::Duration,
    /// `Retry-After` hint returned with throttled (429) responses.
    pub retry_after_secs: u64,
    /// Per-resource-type partitioning bounds.
    pub chunk_limits: ChunkLimits,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Default                 |
    /// |--------------------------|-------------------------|
    /// | `HOST`                   | `0.0.0.0`               |
    /// | `PORT`                   | `3000`                  |
    /// | `CORS_ORIGINS`           | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`   | `30`                    |
    /// | `PUBLIC_BASE_URL`        | `http://localhost:3000` |
    /// | `FHIR_PAYLOAD_DIR`       | `./data/payload`        |
    /// | `VISIBILITY_WINDOW_HOURS`| `24`                    |
    /// | `CLIENT_RETRY_AFTER_SECS`| `30`                    |
    /// | `CHUNK_MAX_PATIENT`      | `5000`                  |
    /// | `CHUNK_MAX_COVERAGE`     | `4000`                  |
    /// | `CHUNK_MAX_EOB`          | `200`                   |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let public_base_url = std::env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| format!("http://localhost:{port}"))
            .trim_end_matches('/')
            .to_string();

        let payload_dir: PathBuf = std::env::var("FHIR_PAYLOAD_DIR")
            .unwrap_or_else(|_| "./data/payload".into())
            .into();

        let visibility_window_hours: i64 = std::env::var("VISIBILITY_WINDOW_HOURS")
            .unwrap_or_else(|_| "24".into())
            .parse()
            .expect("VISIBILITY_WINDOW_HOURS must be a valid i64");

        let retry_after_secs: u64 = std::env::var("CLIENT_RETRY_AFTER_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("CLIENT_RETRY_AFTER_SECS must be a valid u64");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            public_base_url,
            payload_dir,
            visibility_window: chrono::Duration::hours(visibility_window_hours),
            retry_after_secs,
            chunk_limits: ChunkLimits {
                patient: env_chunk("CHUNK_MAX_PATIENT", CHUNK_MAX_PATIENT_DEFAULT),
                coverage: env_chunk("CHUNK_MAX_COVERAGE", CHUNK_MAX_COVERAGE_DEFAULT),
                explanation_of_benefit: env_chunk("CHUNK_MAX_EOB", CHUNK_MAX_EOB_DEFAULT),
            },
        }
    }
}

fn env_chunk(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
