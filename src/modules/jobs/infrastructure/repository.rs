/// Diesel-based implementation of JobRepository
///
/// A single worker consumes the queue, so `pull` is a plain ordered read and
/// jobs stay visible until `delete` or `mark_failed`.
use crate::modules::jobs::domain::entities::JobRecord;
use crate::modules::jobs::domain::messages::JobMessage;
use crate::modules::jobs::domain::repository::{JobRepository, JobStatistics};
use crate::modules::jobs::domain::value_objects::JobStatus;
use crate::modules::jobs::infrastructure::models::{BackgroundJobModel, NewJob, StatisticsRow};
use crate::schema::background_jobs;
use crate::shared::database::Database;
use crate::shared::errors::{AppError, AppResult};
use crate::shared::utils::logger::LogContext;
use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use std::sync::Arc;
use uuid::Uuid;

pub struct JobRepositoryImpl {
    db: Arc<Database>,
    dead_letter_threshold: Option<i32>,
}

impl JobRepositoryImpl {
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            db,
            dead_letter_threshold: None,
        }
    }

    /// Stop pulling jobs once they failed `threshold` times
    pub fn with_dead_letter_threshold(mut self, threshold: Option<i32>) -> Self {
        self.dead_letter_threshold = threshold;
        self
    }
}

#[async_trait]
impl JobRepository for JobRepositoryImpl {
    async fn push(&self, message: &JobMessage) -> AppResult<JobRecord> {
        let new_job = NewJob::from(&JobRecord::queued(message)?);

        self.db
            .interact(move |conn| {
                let inserted: BackgroundJobModel = diesel::insert_into(background_jobs::table)
                    .values(&new_job)
                    .returning(BackgroundJobModel::as_returning())
                    .get_result(conn)
                    .map_err(|e| AppError::DatabaseError(format!("Failed to push job: {}", e)))?;
                Ok(inserted.into())
            })
            .await
    }

    async fn pull(&self, max_count: usize) -> AppResult<Vec<JobRecord>> {
        if max_count == 0 {
            return Ok(Vec::new());
        }
        let threshold = self.dead_letter_threshold;
        let limit = i64::try_from(max_count).unwrap_or(i64::MAX);

        self.db
            .interact(move |conn| {
                let start = std::time::Instant::now();
                let mut query = background_jobs::table
                    .select(BackgroundJobModel::as_select())
                    .into_boxed();
                if let Some(max) = threshold {
                    query = query.filter(background_jobs::failed_attempts.lt(max));
                }

                let jobs: Vec<BackgroundJobModel> = query
                    .order((
                        background_jobs::failed_attempts.asc(),
                        background_jobs::created_at.asc(),
                    ))
                    .limit(limit)
                    .load(conn)
                    .map_err(|e| AppError::DatabaseError(format!("Failed to pull jobs: {}", e)))?;

                LogContext::db_operation(
                    "pull",
                    "background_jobs",
                    Some(start.elapsed().as_millis() as u64),
                );
                Ok(jobs.into_iter().map(JobRecord::from).collect())
            })
            .await
    }

    async fn delete(&self, job_id: Uuid) -> AppResult<()> {
        self.db
            .interact(move |conn| {
                diesel::delete(background_jobs::table.find(job_id))
                    .execute(conn)
                    .map_err(|e| AppError::DatabaseError(format!("Failed to delete job: {}", e)))?;
                Ok(())
            })
            .await
    }

    async fn mark_failed(&self, job_id: Uuid, error: &str) -> AppResult<()> {
        let error = error.to_string();
        self.db
            .interact(move |conn| {
                let updated = diesel::update(background_jobs::table.find(job_id))
                    .set((
                        background_jobs::status.eq(JobStatus::Failed),
                        background_jobs::failed_attempts.eq(background_jobs::failed_attempts + 1),
                        background_jobs::last_error.eq(Some(error)),
                        background_jobs::updated_at.eq(Utc::now()),
                    ))
                    .execute(conn)
                    .map_err(|e| {
                        AppError::DatabaseError(format!("Failed to mark job as failed: {}", e))
                    })?;

                if updated == 0 {
                    return Err(AppError::NotFound(format!("Job {} not found", job_id)));
                }
                Ok(())
            })
            .await
    }

    async fn get_by_id(&self, job_id: Uuid) -> AppResult<Option<JobRecord>> {
        self.db
            .interact(move |conn| {
                let job = background_jobs::table
                    .find(job_id)
                    .select(BackgroundJobModel::as_select())
                    .first(conn)
                    .optional()
                    .map_err(|e| {
                        AppError::DatabaseError(format!("Failed to get job by id: {}", e))
                    })?;
                Ok(job.map(JobRecord::from))
            })
            .await
    }

    async fn get_failed_jobs(&self) -> AppResult<Vec<JobRecord>> {
        self.db
            .interact(move |conn| {
                let jobs: Vec<BackgroundJobModel> = background_jobs::table
                    .filter(background_jobs::status.eq(JobStatus::Failed))
                    .order((
                        background_jobs::failed_attempts.desc(),
                        background_jobs::created_at.asc(),
                    ))
                    .select(BackgroundJobModel::as_select())
                    .load(conn)
                    .map_err(|e| {
                        AppError::DatabaseError(format!("Failed to get failed jobs: {}", e))
                    })?;
                Ok(jobs.into_iter().map(JobRecord::from).collect())
            })
            .await
    }

    async fn get_statistics(&self) -> AppResult<JobStatistics> {
        let threshold = self.dead_letter_threshold;
        self.db
            .interact(move |conn| {
                let row: StatisticsRow = diesel::sql_query(
                    "SELECT
                        COUNT(*) FILTER (WHERE status = 'queued') AS queued_count,
                        COUNT(*) FILTER (WHERE status = 'failed') AS failed_count,
                        COUNT(*) FILTER (
                            WHERE $1::int4 IS NOT NULL AND failed_attempts >= $1
                        ) AS dead_lettered_count,
                        COUNT(*) AS total_count
                     FROM background_jobs",
                )
                .bind::<diesel::sql_types::Nullable<diesel::sql_types::Integer>, _>(threshold)
                .get_result(conn)
                .map_err(|e| AppError::DatabaseError(format!("Failed to count jobs: {}", e)))?;

                Ok(JobStatistics {
                    queued_count: row.queued_count,
                    failed_count: row.failed_count,
                    dead_lettered_count: row.dead_lettered_count,
                    total_count: row.total_count,
                })
            })
            .await
    }
}
