/// Repository trait for job persistence
///
/// Defines the interface for job storage and retrieval operations.
/// Implemented over PostgreSQL (Diesel) and in memory.
use crate::modules::jobs::domain::entities::JobRecord;
use crate::modules::jobs::domain::errors::JobError;
use crate::modules::jobs::domain::messages::JobMessage;
use crate::shared::errors::AppResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Enqueue a new QUEUED job. Duplicate payloads are allowed.
    async fn push(&self, message: &JobMessage) -> AppResult<JobRecord>;

    /// Up to `max_count` QUEUED or FAILED jobs, least-failed and oldest first.
    /// Jobs at the dead-letter threshold are skipped.
    async fn pull(&self, max_count: usize) -> AppResult<Vec<JobRecord>>;

    /// Remove a job after it succeeded
    async fn delete(&self, job_id: Uuid) -> AppResult<()>;

    /// Mark job as failed with error message, incrementing `failed_attempts`
    async fn mark_failed(&self, job_id: Uuid, error: &str) -> AppResult<()>;

    /// Get job by ID
    async fn get_by_id(&self, job_id: Uuid) -> AppResult<Option<JobRecord>>;

    /// Get all failed jobs (for monitoring)
    async fn get_failed_jobs(&self) -> AppResult<Vec<JobRecord>>;

    /// Get job statistics
    async fn get_statistics(&self) -> AppResult<JobStatistics>;
}

/// Job queue statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStatistics {
    pub queued_count: i64,
    pub failed_count: i64,
    /// Failed jobs at or above the dead-letter threshold (always 0 without one)
    pub dead_lettered_count: i64,
    pub total_count: i64,
}

/// Executes one decoded job message
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, message: JobMessage) -> Result<(), JobError>;
}
