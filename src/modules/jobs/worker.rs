/// Background worker that drives the job queue
///
/// Pulls batches from the `JobRepository`, runs each job through a `JobHandler`
/// sequentially, deletes jobs that succeed and marks the rest failed.
use crate::modules::jobs::domain::entities::JobRecord;
use crate::modules::jobs::domain::errors::JobError;
use crate::modules::jobs::domain::repository::{JobHandler, JobRepository};
use crate::shared::config::WorkerConfig;
use crate::shared::errors::AppResult;
use crate::shared::utils::logger::{LogContext, TimedOperation};
use crate::{log_debug, log_error, log_info, log_warn};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerMode {
    /// Poll forever, sleeping when the queue is empty, until cancelled
    Polling,
    /// Process until a pull comes back empty, then return
    Draining,
}

/// Outcome of one or more batches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub pulled: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl std::ops::AddAssign for BatchSummary {
    fn add_assign(&mut self, other: Self) {
        self.pulled += other.pulled;
        self.succeeded += other.succeeded;
        self.failed += other.failed;
    }
}

#[derive(Default)]
struct SessionCounters {
    processed: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
}

/// Background worker that processes jobs from the queue
pub struct BackgroundWorker {
    job_repository: Arc<dyn JobRepository>,
    handler: Arc<dyn JobHandler>,
    concurrency: usize,
    poll_interval: Duration,
    cancel: CancellationToken,
    is_running: Arc<tokio::sync::RwLock<bool>>,
    counters: SessionCounters,
}

impl BackgroundWorker {
    /// Create a new background worker
    pub fn new(
        job_repository: Arc<dyn JobRepository>,
        handler: Arc<dyn JobHandler>,
        config: &WorkerConfig,
    ) -> Self {
        Self {
            job_repository,
            handler,
            concurrency: config.concurrency.max(1),
            poll_interval: config.poll_interval,
            cancel: CancellationToken::new(),
            is_running: Arc::new(tokio::sync::RwLock::new(false)),
            counters: SessionCounters::default(),
        }
    }

    /// Use an externally owned token so the caller can stop the loop
    pub fn with_cancellation_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Start the worker loop in the given mode
    ///
    /// Call it with tokio::spawn to run in the background. Returns the totals
    /// once the loop ends (cancellation, or an empty pull when draining).
    pub async fn run(self: Arc<Self>, mode: WorkerMode) -> BatchSummary {
        self.run_loop(mode).await
    }

    /// Process everything currently eligible, then return
    pub async fn drain(&self) -> BatchSummary {
        self.run_loop(WorkerMode::Draining).await
    }

    /// Stop the background worker
    pub async fn stop(&self) {
        self.cancel.cancel();
        let mut running = self.is_running.write().await;
        *running = false;
        log_info!("Background worker stop requested");
    }

    /// Pull and process exactly one batch
    pub async fn run_once(&self) -> AppResult<BatchSummary> {
        let jobs = self.job_repository.pull(self.concurrency).await?;
        let (summary, _) = self.process_batch(jobs).await;
        Ok(summary)
    }

    async fn run_loop(&self, mode: WorkerMode) -> BatchSummary {
        log_info!(
            "Background worker started ({:?}, batch size {})",
            mode,
            self.concurrency
        );
        {
            let mut running = self.is_running.write().await;
            *running = true;
        }

        let mut total = BatchSummary::default();
        // Only consulted when draining
        let mut failed_in_run: HashSet<Uuid> = HashSet::new();

        loop {
            if self.cancel.is_cancelled() {
                log_info!("Background worker cancelled");
                break;
            }

            let pulled = match mode {
                WorkerMode::Polling => self.job_repository.pull(self.concurrency).await,
                WorkerMode::Draining => self.pull_skipping(&failed_in_run).await,
            };

            let jobs = match pulled {
                Ok(jobs) => jobs,
                Err(e) => {
                    log_error!("Failed to pull jobs: {}", e);
                    if mode == WorkerMode::Draining {
                        break;
                    }
                    self.idle().await;
                    continue;
                }
            };

            if jobs.is_empty() {
                match mode {
                    WorkerMode::Draining => {
                        log_info!("Job queue drained");
                        break;
                    }
                    WorkerMode::Polling => {
                        self.idle().await;
                        continue;
                    }
                }
            }

            let (summary, failed_ids) = self.process_batch(jobs).await;
            total += summary;

            match mode {
                WorkerMode::Draining => failed_in_run.extend(failed_ids),
                // A batch where nothing succeeded is all retries; back off instead of spinning
                WorkerMode::Polling if summary.succeeded == 0 => self.idle().await,
                WorkerMode::Polling => {}
            }
        }

        {
            let mut running = self.is_running.write().await;
            *running = false;
        }
        log_info!(
            "Background worker stopped: {} pulled, {} succeeded, {} failed",
            total.pulled,
            total.succeeded,
            total.failed
        );
        total
    }

    /// Pull a batch that excludes jobs already failed in this drain
    async fn pull_skipping(&self, skip: &HashSet<Uuid>) -> AppResult<Vec<JobRecord>> {
        let jobs = self
            .job_repository
            .pull(self.concurrency + skip.len())
            .await?;
        Ok(jobs
            .into_iter()
            .filter(|job| !skip.contains(&job.id))
            .take(self.concurrency)
            .collect())
    }

    /// Sleep for the poll interval, waking early on cancellation
    async fn idle(&self) {
        tokio::select! {
            _ = self.cancel.cancelled() => {}
            _ = tokio::time::sleep(self.poll_interval) => {}
        }
    }

    async fn process_batch(&self, jobs: Vec<JobRecord>) -> (BatchSummary, Vec<Uuid>) {
        let mut summary = BatchSummary {
            pulled: jobs.len(),
            ..BatchSummary::default()
        };
        let mut failed_ids = Vec::new();

        log_debug!("Processing batch of {} jobs", jobs.len());

        for job in jobs {
            if self.process_job(&job).await {
                summary.succeeded += 1;
            } else {
                summary.failed += 1;
                failed_ids.push(job.id);
            }
        }

        (summary, failed_ids)
    }

    /// Run one job. Returns true if the handler succeeded.
    async fn process_job(&self, job: &JobRecord) -> bool {
        log_info!(
            "Processing job {} (type: {}, failed attempts: {})",
            job.id,
            job.message_type,
            job.failed_attempts
        );
        let timer = TimedOperation::new(&job.message_type);

        let result = match job.message() {
            Ok(message) => self.handler.handle(message).await,
            Err(e) => Err(JobError::fatal(e)),
        };

        self.counters.processed.fetch_add(1, Ordering::Relaxed);

        match result {
            Ok(()) => {
                self.counters.succeeded.fetch_add(1, Ordering::Relaxed);
                LogContext::job_transition(&job.id, &job.message_type, "succeeded");
                timer.finish();
                if let Err(e) = self.job_repository.delete(job.id).await {
                    log_error!("Job {} succeeded but could not be deleted: {}", job.id, e);
                }
                true
            }
            Err(e) => {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                match &e {
                    JobError::Retryable(inner) => {
                        log_warn!("Job {} failed, will be retried: {}", job.id, inner)
                    }
                    JobError::Fatal(inner) => {
                        log_error!("Job {} failed permanently: {}", job.id, inner)
                    }
                }
                LogContext::job_transition(&job.id, &job.message_type, "failed");
                if let Err(store_err) = self.job_repository.mark_failed(job.id, &e.to_string()).await
                {
                    log_error!("Could not mark job {} as failed: {}", job.id, store_err);
                }
                false
            }
        }
    }

    /// Get statistics about the worker and job queue
    pub async fn get_statistics(&self) -> AppResult<WorkerStatistics> {
        let job_stats = self.job_repository.get_statistics().await?;
        let is_running = *self.is_running.read().await;

        Ok(WorkerStatistics {
            is_running,
            queued_jobs: job_stats.queued_count,
            failed_jobs: job_stats.failed_count,
            dead_lettered_jobs: job_stats.dead_lettered_count,
            total_jobs: job_stats.total_count,
            processed_in_session: self.counters.processed.load(Ordering::Relaxed),
            succeeded_in_session: self.counters.succeeded.load(Ordering::Relaxed),
            failed_in_session: self.counters.failed.load(Ordering::Relaxed),
        })
    }
}

/// Worker statistics for monitoring
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerStatistics {
    pub is_running: bool,
    pub queued_jobs: i64,
    pub failed_jobs: i64,
    pub dead_lettered_jobs: i64,
    pub total_jobs: i64,
    pub processed_in_session: u64,
    pub succeeded_in_session: u64,
    pub failed_in_session: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::jobs::domain::messages::JobMessage;
    use crate::modules::jobs::domain::repository::{MockJobHandler, MockJobRepository};
    use crate::modules::jobs::domain::value_objects::JobStatus;
    use crate::modules::jobs::infrastructure::InMemoryJobRepository;
    use crate::shared::errors::AppError;

    fn config(concurrency: usize) -> WorkerConfig {
        WorkerConfig {
            concurrency,
            poll_interval: Duration::from_millis(10),
            max_failed_attempts: None,
        }
    }

    fn plan_message(plan_ref: Uuid) -> JobMessage {
        JobMessage::OffboardAndDeletePlan { plan_ref }
    }

    #[tokio::test]
    async fn test_run_once_deletes_successes_and_marks_failures() {
        let repo = Arc::new(InMemoryJobRepository::new());
        let good = Uuid::new_v4();
        let bad = Uuid::new_v4();
        repo.push(&plan_message(good)).await.unwrap();
        let bad_job = repo.push(&plan_message(bad)).await.unwrap();

        let mut handler = MockJobHandler::new();
        handler.expect_handle().times(2).returning(move |message| match message {
            JobMessage::OffboardAndDeletePlan { plan_ref } if plan_ref == bad => Err(
                JobError::from(AppError::ExternalServiceError("503".to_string())),
            ),
            _ => Ok(()),
        });

        let worker = BackgroundWorker::new(repo.clone(), Arc::new(handler), &config(10));
        let summary = worker.run_once().await.unwrap();

        assert_eq!(
            summary,
            BatchSummary {
                pulled: 2,
                succeeded: 1,
                failed: 1
            }
        );
        assert_eq!(repo.len(), 1);
        let stored = repo.get_by_id(bad_job.id).await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Failed);
        assert_eq!(stored.failed_attempts, 1);
    }

    #[tokio::test]
    async fn test_undecodable_job_fails_without_reaching_handler() {
        let mut handler = MockJobHandler::new();
        handler.expect_handle().never();

        let job = JobRecord {
            message_type: "ImportMerchants".to_string(),
            ..JobRecord::queued(&plan_message(Uuid::new_v4())).unwrap()
        };
        let mut store = MockJobRepository::new();
        let pulled = job.clone();
        store
            .expect_pull()
            .times(1)
            .returning(move |_| Ok(vec![pulled.clone()]));
        store
            .expect_mark_failed()
            .withf(move |id, error| *id == job.id && error.contains("Unsupported message type"))
            .times(1)
            .returning(|_, _| Ok(()));

        let worker = BackgroundWorker::new(Arc::new(store), Arc::new(handler), &config(10));
        let summary = worker.run_once().await.unwrap();
        assert_eq!(summary.failed, 1);
    }

    #[tokio::test]
    async fn test_store_errors_do_not_stop_the_batch() {
        let first = JobRecord::queued(&plan_message(Uuid::new_v4())).unwrap();
        let second = JobRecord::queued(&plan_message(Uuid::new_v4())).unwrap();
        let batch = vec![first, second];

        let mut store = MockJobRepository::new();
        store
            .expect_pull()
            .times(1)
            .returning(move |_| Ok(batch.clone()));
        store
            .expect_delete()
            .times(2)
            .returning(|_| Err(AppError::DatabaseError("connection reset".to_string())));

        let mut handler = MockJobHandler::new();
        handler.expect_handle().times(2).returning(|_| Ok(()));

        let worker = BackgroundWorker::new(Arc::new(store), Arc::new(handler), &config(10));
        let summary = worker.run_once().await.unwrap();
        assert_eq!(summary.succeeded, 2);
    }

    #[tokio::test]
    async fn test_drain_does_not_retry_jobs_failed_in_same_run() {
        let repo = Arc::new(InMemoryJobRepository::new());
        let poison = repo.push(&plan_message(Uuid::new_v4())).await.unwrap();
        repo.push(&plan_message(Uuid::new_v4())).await.unwrap();

        let poison_id = poison.id;
        let mut handler = MockJobHandler::new();
        let mut calls = 0;
        handler.expect_handle().times(2).returning(move |_| {
            calls += 1;
            if calls == 1 {
                Err(JobError::fatal(AppError::NotFound("gone".to_string())))
            } else {
                Ok(())
            }
        });

        // batch size 1 so the poison job is pulled alone first
        let worker = BackgroundWorker::new(repo.clone(), Arc::new(handler), &config(1));
        let summary = worker.drain().await;

        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 1);
        let stored = repo.get_by_id(poison_id).await.unwrap().unwrap();
        assert_eq!(stored.failed_attempts, 1);
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn test_drain_on_empty_queue_returns_immediately() {
        let repo = Arc::new(InMemoryJobRepository::new());
        let mut handler = MockJobHandler::new();
        handler.expect_handle().never();

        let worker = BackgroundWorker::new(repo, Arc::new(handler), &config(5));
        assert_eq!(worker.drain().await, BatchSummary::default());
    }

    #[tokio::test]
    async fn test_polling_stops_on_cancel() {
        let repo = Arc::new(InMemoryJobRepository::new());
        let mut handler = MockJobHandler::new();
        handler.expect_handle().returning(|_| Ok(()));

        let token = CancellationToken::new();
        let worker = Arc::new(
            BackgroundWorker::new(repo.clone(), Arc::new(handler), &config(5))
                .with_cancellation_token(token.clone()),
        );

        let handle = tokio::spawn(worker.clone().run(WorkerMode::Polling));
        repo.push(&plan_message(Uuid::new_v4())).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();

        let summary = tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("worker did not stop")
            .unwrap();
        assert_eq!(summary.succeeded, 1);
        assert!(repo.is_empty());

        let stats = worker.get_statistics().await.unwrap();
        assert!(!stats.is_running);
        assert_eq!(stats.succeeded_in_session, 1);
    }
}
