//! Worker daemon: drains the dispatch queue and runs the archival
//! sweeper.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use claimstream_upstream::http::FhirDataClient;
use claimstream_worker::config::WorkerConfig;
use claimstream_worker::pool::WorkerPool;
use claimstream_worker::sweep;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "claimstream_worker=info,claimstream_db=info,sqlx=warn".into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match WorkerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid worker configuration");
            std::process::exit(1);
        }
    };

    let pool = match claimstream_db::create_pool(&config.database_url).await {
        Ok(pool) => pool,
        Err(e) => {
            error!(error = %e, "database connection failed");
            std::process::exit(1);
        }
    };

    let client: Arc<dyn claimstream_upstream::DataServerClient> =
        match FhirDataClient::from_env() {
            Ok(client) => Arc::new(client),
            Err(e) => {
                error!(error = %e, "upstream client configuration failed");
                std::process::exit(1);
            }
        };

    info!(
        workers = config.worker_count,
        staging = %config.dirs.staging.display(),
        payload = %config.dirs.payload.display(),
        archive = %config.dirs.archive.display(),
        "worker starting"
    );

    let cancel = CancellationToken::new();

    let sweeper = tokio::spawn(sweep::run(pool.clone(), config.clone(), cancel.clone()));
    let workers = tokio::spawn(
        WorkerPool::new(pool.clone(), client, config.clone()).run(cancel.clone()),
    );

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(e) => error!(error = %e, "failed to listen for shutdown signal"),
    }
    cancel.cancel();

    let _ = workers.await;
    let _ = sweeper.await;
    pool.close().await;
    info!("worker stopped");
}
