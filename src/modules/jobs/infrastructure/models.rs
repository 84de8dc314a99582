/// Diesel models for background_jobs table
use crate::modules::jobs::domain::entities::JobRecord;
use crate::modules::jobs::domain::value_objects::JobStatus;
use crate::schema::background_jobs;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sql_types::BigInt;
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Diesel model for inserting new jobs
#[derive(Insertable, Debug)]
#[diesel(table_name = background_jobs)]
pub struct NewJob {
    pub id: Uuid,
    pub message_type: String,
    pub payload: JsonValue,
    pub status: JobStatus,
    pub failed_attempts: i32,
}

impl From<&JobRecord> for NewJob {
    fn from(record: &JobRecord) -> Self {
        Self {
            id: record.id,
            message_type: record.message_type.clone(),
            payload: record.payload.clone(),
            status: record.status,
            failed_attempts: record.failed_attempts,
        }
    }
}

/// Diesel model for querying existing jobs
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = background_jobs)]
pub struct BackgroundJobModel {
    pub id: Uuid,
    pub message_type: String,
    pub payload: JsonValue,
    pub status: JobStatus,
    pub failed_attempts: i32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<BackgroundJobModel> for JobRecord {
    fn from(model: BackgroundJobModel) -> Self {
        Self {
            id: model.id,
            message_type: model.message_type,
            payload: model.payload,
            status: model.status,
            failed_attempts: model.failed_attempts,
            last_error: model.last_error,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Helper struct for the statistics query
#[derive(QueryableByName, Debug)]
pub struct StatisticsRow {
    #[diesel(sql_type = BigInt)]
    pub queued_count: i64,
    #[diesel(sql_type = BigInt)]
    pub failed_count: i64,
    #[diesel(sql_type = BigInt)]
    pub dead_lettered_count: i64,
    #[diesel(sql_type = BigInt)]
    pub total_count: i64,
}
