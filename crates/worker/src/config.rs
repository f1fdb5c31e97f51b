//! Worker configuration, loaded from the environment.

use std::time::Duration;

use crate::DataDirs;

/// Default number of concurrent unit processors.
const DEFAULT_WORKER_COUNT: usize = 4;

/// Default queue poll interval when no work is available.
const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;

/// Default age after which a claimed-but-unacknowledged queue row is
/// released for redelivery.
const DEFAULT_STALE_CLAIM_MINUTES: i64 = 30;

/// Default interval between sweeper passes.
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 3_600;

/// Default age after which a Completed job's files leave the payload
/// directory.
const DEFAULT_VISIBILITY_WINDOW_HOURS: i64 = 24;

/// Default age after which archived files are purged outright.
const DEFAULT_PURGE_THRESHOLD_HOURS: i64 = 720;

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub database_url: String,
    pub dirs: DataDirs,
    pub worker_count: usize,
    pub poll_interval: Duration,
    pub stale_claim_after: chrono::Duration,
    pub sweep_interval: Duration,
    pub visibility_window: chrono::Duration,
    pub purge_threshold: chrono::Duration,
}

impl WorkerConfig {
    /// Load configuration from environment variables.
    ///
    /// | Env Var                  | Default          |
    /// |--------------------------|------------------|
    /// | `DATABASE_URL`           | (required)       |
    /// | `FHIR_STAGING_DIR`       | `./data/staging` |
    /// | `FHIR_PAYLOAD_DIR`       | `./data/payload` |
    /// | `FHIR_ARCHIVE_DIR`       | `./data/archive` |
    /// | `WORKER_COUNT`           | 4                |
    /// | `WORKER_POLL_INTERVAL_MS`| 1000             |
    /// | `STALE_CLAIM_MINUTES`    | 30               |
    /// | `SWEEP_INTERVAL_SECS`    | 3600             |
    /// | `VISIBILITY_WINDOW_HOURS`| 24               |
    /// | `PURGE_THRESHOLD_HOURS`  | 720              |
    pub fn from_env() -> Result<Self, String> {
        let database_url =
            std::env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set".to_string())?;

        Ok(Self {
            database_url,
            dirs: DataDirs {
                staging: env_or("FHIR_STAGING_DIR", "./data/staging").into(),
                payload: env_or("FHIR_PAYLOAD_DIR", "./data/payload").into(),
                archive: env_or("FHIR_ARCHIVE_DIR", "./data/archive").into(),
            },
            worker_count: env_parse("WORKER_COUNT", DEFAULT_WORKER_COUNT).max(1),
            poll_interval: Duration::from_millis(env_parse(
                "WORKER_POLL_INTERVAL_MS",
                DEFAULT_POLL_INTERVAL_MS,
            )),
            stale_claim_after: chrono::Duration::minutes(env_parse(
                "STALE_CLAIM_MINUTES",
                DEFAULT_STALE_CLAIM_MINUTES,
            )),
            sweep_interval: Duration::from_secs(env_parse(
                "SWEEP_INTERVAL_SECS",
                DEFAULT_SWEEP_INTERVAL_SECS,
            )),
            visibility_window: chrono::Duration::hours(env_parse(
                "VISIBILITY_WINDOW_HOURS",
                DEFAULT_VISIBILITY_WINDOW_HOURS,
            )),
            purge_threshold: chrono::Duration::hours(env_parse(
                "PURGE_THRESHOLD_HOURS",
                DEFAULT_PURGE_THRESHOLD_HOURS,
            )),
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
