pub mod modules;
pub mod schema;
pub mod shared;

use modules::{
    cascade::{CascadeHandler, LifecycleService},
    jobs::{BackgroundWorker, BatchSummary, JobRepository, JobRepositoryImpl, WorkerMode},
    reconciliation::{HttpReconciliationClient, ReconciliationClient},
    resources::{ResourceRepository, ResourceRepositoryImpl},
};
use shared::config::{AppConfig, WorkerConfig};
use shared::errors::AppResult;
use shared::Database;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Everything the worker and the lifecycle entry points need, wired together
pub struct Services {
    pub resources: Arc<dyn ResourceRepository>,
    pub jobs: Arc<dyn JobRepository>,
    pub cascade: Arc<CascadeHandler>,
    pub lifecycle: Arc<LifecycleService>,
    pub worker: Arc<BackgroundWorker>,
}

impl Services {
    pub fn new(
        resources: Arc<dyn ResourceRepository>,
        jobs: Arc<dyn JobRepository>,
        reconciliation: Arc<dyn ReconciliationClient>,
        worker_config: &WorkerConfig,
    ) -> Self {
        let cascade = Arc::new(CascadeHandler::new(
            Arc::clone(&resources),
            Arc::clone(&jobs),
            reconciliation,
        ));
        let lifecycle = Arc::new(LifecycleService::new(
            Arc::clone(&resources),
            Arc::clone(&jobs),
            Arc::clone(&cascade),
        ));
        let worker = Arc::new(BackgroundWorker::new(
            Arc::clone(&jobs),
            cascade.clone(),
            worker_config,
        ));

        Self {
            resources,
            jobs,
            cascade,
            lifecycle,
            worker,
        }
    }

    /// Postgres-backed repositories and the HTTP reconciliation client
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        let database = Arc::new(Database::new(&config.database_url)?);
        database.run_migrations()?;
        let pool = database.pool_status();
        log_info!(
            "Database ready: {} of {} connections open, {} idle",
            pool.connections,
            pool.max_size,
            pool.idle_connections
        );

        let resources: Arc<dyn ResourceRepository> =
            Arc::new(ResourceRepositoryImpl::new(Arc::clone(&database)));
        let jobs: Arc<dyn JobRepository> = Arc::new(
            JobRepositoryImpl::new(Arc::clone(&database))
                .with_dead_letter_threshold(config.worker.max_failed_attempts),
        );
        let reconciliation: Arc<dyn ReconciliationClient> =
            Arc::new(HttpReconciliationClient::new(&config.reconciliation)?);

        Ok(Self::new(resources, jobs, reconciliation, &config.worker))
    }
}

/// Run the worker until it drains (`Draining`) or `shutdown` fires (`Polling`)
pub async fn run(
    config: AppConfig,
    mode: WorkerMode,
    shutdown: CancellationToken,
) -> AppResult<BatchSummary> {
    let services = {
        let config = config.clone();
        tokio::task::spawn_blocking(move || Services::from_config(&config)).await??
    };

    let worker = Arc::clone(&services.worker);
    let stop = shutdown.clone();
    let cancel = worker.cancellation_token();
    tokio::spawn(async move {
        stop.cancelled().await;
        cancel.cancel();
    });

    log_info!(
        "Worker starting in {:?} mode with batch size {}",
        mode,
        config.worker.concurrency
    );
    let summary = worker.run(mode).await;

    match services.jobs.get_statistics().await {
        Ok(stats) => log_info!(
            "Queue after run: {} queued, {} failed, {} dead-lettered",
            stats.queued_count,
            stats.failed_count,
            stats.dead_lettered_count
        ),
        Err(e) => log_warn!("Could not read queue statistics: {}", e),
    }

    Ok(summary)
}
