//! Fixed-size worker pool over the dispatch queue.
//!
//! Each worker loops: claim a unit, process it, acknowledge. A unit that
//! fails on infrastructure stays claimed and is redelivered once its claim
//! goes stale; a unit whose payload cannot be decoded or whose job has
//! vanished is acknowledged and dropped. A separate loop releases stale
//! claims left behind by crashed workers.

use std::sync::Arc;

use sqlx::PgPool;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use claimstream_core::partition::WorkUnit;
use claimstream_db::repositories::QueueRepo;
use claimstream_upstream::DataServerClient;

use crate::config::WorkerConfig;
use crate::error::WorkerError;
use crate::processor;

pub struct WorkerPool {
    pool: PgPool,
    client: Arc<dyn DataServerClient>,
    config: WorkerConfig,
}

impl WorkerPool {
    pub fn new(pool: PgPool, client: Arc<dyn DataServerClient>, config: WorkerConfig) -> Self {
        Self {
            pool,
            client,
            config,
        }
    }

    /// Run the pool until the token is cancelled. Resolves once every
    /// worker and the stale-claim loop have wound down.
    pub async fn run(self, cancel: CancellationToken) {
        let mut handles = Vec::with_capacity(self.config.worker_count + 1);

        for index in 0..self.config.worker_count {
            let worker = Worker {
                name: format!("worker-{index}"),
                pool: self.pool.clone(),
                client: Arc::clone(&self.client),
                config: self.config.clone(),
            };
            let cancel = cancel.clone();
            handles.push(tokio::spawn(async move { worker.run(cancel).await }));
        }

        handles.push(tokio::spawn(release_stale_loop(
            self.pool.clone(),
            self.config.clone(),
            cancel.clone(),
        )));

        for handle in handles {
            if let Err(e) = handle.await {
                error!(error = %e, "worker task panicked");
            }
        }
        info!("worker pool stopped");
    }
}

struct Worker {
    name: String,
    pool: PgPool,
    client: Arc<dyn DataServerClient>,
    config: WorkerConfig,
}

impl Worker {
    async fn run(self, cancel: CancellationToken) {
        info!(worker = %self.name, "worker started");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                claimed = QueueRepo::claim_next(&self.pool, &self.name) => {
                    match claimed {
                        Ok(Some(row)) => self.handle_claim(row.id, row.payload).await,
                        Ok(None) => {
                            tokio::select! {
                                _ = cancel.cancelled() => break,
                                _ = tokio::time::sleep(self.config.poll_interval) => {}
                            }
                        }
                        Err(e) => {
                            error!(worker = %self.name, error = %e, "queue claim failed");
                            tokio::time::sleep(self.config.poll_interval).await;
                        }
                    }
                }
            }
        }
        info!(worker = %self.name, "worker stopped");
    }

    async fn handle_claim(&self, queue_id: i64, payload: serde_json::Value) {
        let unit: WorkUnit = match serde_json::from_value(payload) {
            Ok(unit) => unit,
            Err(e) => {
                // Undecodable rows would otherwise redeliver forever.
                error!(worker = %self.name, queue_id, error = %e, "dropping undecodable unit");
                self.ack(queue_id).await;
                return;
            }
        };

        match processor::process_unit(&self.pool, self.client.as_ref(), &self.config.dirs, &unit)
            .await
        {
            Ok(_) => self.ack(queue_id).await,
            Err(WorkerError::JobMissing { job_id }) => {
                warn!(worker = %self.name, queue_id, job_id, "dropping unit for missing job");
                self.ack(queue_id).await;
            }
            Err(e) => {
                // Leave the claim in place; the stale-claim loop will
                // redeliver it.
                error!(
                    worker = %self.name,
                    queue_id,
                    job_id = unit.job_id,
                    error = %e,
                    "unit processing failed"
                );
            }
        }
    }

    async fn ack(&self, queue_id: i64) {
        if let Err(e) = QueueRepo::ack(&self.pool, queue_id).await {
            error!(worker = %self.name, queue_id, error = %e, "queue ack failed");
        }
    }
}

/// Periodically release claims held longer than the stale-claim window.
async fn release_stale_loop(pool: PgPool, config: WorkerConfig, cancel: CancellationToken) {
    let interval = config.poll_interval.max(std::time::Duration::from_secs(30));
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }

        let cutoff = chrono::Utc::now() - config.stale_claim_after;
        match QueueRepo::release_stale(&pool, cutoff).await {
            Ok(0) => {}
            Ok(released) => warn!(released, "released stale queue claims"),
            Err(e) => error!(error = %e, "stale claim release failed"),
        }
    }
}
