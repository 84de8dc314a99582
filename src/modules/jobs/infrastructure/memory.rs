/// In-memory JobRepository
///
/// Same ordering and dead-letter rules as the Postgres store. Used for burst
/// runs in tests and local tooling.
use crate::modules::jobs::domain::entities::JobRecord;
use crate::modules::jobs::domain::messages::JobMessage;
use crate::modules::jobs::domain::repository::{JobRepository, JobStatistics};
use crate::modules::jobs::domain::value_objects::JobStatus;
use crate::shared::errors::{AppError, AppResult};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

struct StoredJob {
    /// Insertion sequence, breaks `created_at` ties
    seq: u64,
    record: JobRecord,
}

#[derive(Default)]
pub struct InMemoryJobRepository {
    jobs: DashMap<Uuid, StoredJob>,
    next_seq: AtomicU64,
    dead_letter_threshold: Option<i32>,
}

impl InMemoryJobRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dead_letter_threshold(mut self, threshold: Option<i32>) -> Self {
        self.dead_letter_threshold = threshold;
        self
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Every stored job in pull order, ignoring the dead-letter threshold
    pub fn snapshot(&self) -> Vec<JobRecord> {
        let mut jobs: Vec<(u64, JobRecord)> = self
            .jobs
            .iter()
            .map(|entry| (entry.seq, entry.record.clone()))
            .collect();
        jobs.sort_by(|(a_seq, a), (b_seq, b)| {
            a.failed_attempts
                .cmp(&b.failed_attempts)
                .then(a.created_at.cmp(&b.created_at))
                .then(a_seq.cmp(b_seq))
        });
        jobs.into_iter().map(|(_, record)| record).collect()
    }
}

#[async_trait]
impl JobRepository for InMemoryJobRepository {
    async fn push(&self, message: &JobMessage) -> AppResult<JobRecord> {
        let record = JobRecord::queued(message)?;
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        self.jobs.insert(
            record.id,
            StoredJob {
                seq,
                record: record.clone(),
            },
        );
        Ok(record)
    }

    async fn pull(&self, max_count: usize) -> AppResult<Vec<JobRecord>> {
        let threshold = self.dead_letter_threshold;
        Ok(self
            .snapshot()
            .into_iter()
            .filter(|job| !job.is_dead_lettered(threshold))
            .take(max_count)
            .collect())
    }

    async fn delete(&self, job_id: Uuid) -> AppResult<()> {
        self.jobs.remove(&job_id);
        Ok(())
    }

    async fn mark_failed(&self, job_id: Uuid, error: &str) -> AppResult<()> {
        let mut stored = self
            .jobs
            .get_mut(&job_id)
            .ok_or_else(|| AppError::NotFound(format!("Job {} not found", job_id)))?;
        stored.record.status = JobStatus::Failed;
        stored.record.failed_attempts += 1;
        stored.record.last_error = Some(error.to_string());
        stored.record.updated_at = Utc::now();
        Ok(())
    }

    async fn get_by_id(&self, job_id: Uuid) -> AppResult<Option<JobRecord>> {
        Ok(self.jobs.get(&job_id).map(|stored| stored.record.clone()))
    }

    async fn get_failed_jobs(&self) -> AppResult<Vec<JobRecord>> {
        Ok(self
            .snapshot()
            .into_iter()
            .filter(JobRecord::is_failed)
            .collect())
    }

    async fn get_statistics(&self) -> AppResult<JobStatistics> {
        let mut stats = JobStatistics::default();
        for entry in self.jobs.iter() {
            let job = &entry.record;
            match job.status {
                JobStatus::Queued => stats.queued_count += 1,
                JobStatus::Failed => stats.failed_count += 1,
            }
            if job.is_dead_lettered(self.dead_letter_threshold) {
                stats.dead_lettered_count += 1;
            }
            stats.total_count += 1;
        }
        Ok(stats)
    }
}
