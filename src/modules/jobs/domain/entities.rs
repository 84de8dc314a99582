/// Domain entities for the job store
///
/// A job is a persisted `JobMessage` plus bookkeeping for retries.
use super::messages::JobMessage;
use super::value_objects::JobStatus;
use crate::shared::errors::AppResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Job record from the store (with metadata)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: Uuid,
    pub message_type: String,
    pub payload: serde_json::Value,
    pub status: JobStatus,
    pub failed_attempts: i32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobRecord {
    /// Fresh QUEUED record for a message
    pub fn queued(message: &JobMessage) -> AppResult<Self> {
        let (message_type, payload) = message.to_parts()?;
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            message_type,
            payload,
            status: JobStatus::Queued,
            failed_attempts: 0,
            last_error: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Decode the typed message
    pub fn message(&self) -> AppResult<JobMessage> {
        JobMessage::from_parts(&self.message_type, &self.payload)
    }

    pub fn is_failed(&self) -> bool {
        self.status == JobStatus::Failed
    }

    /// Whether the job has reached a dead-letter threshold
    pub fn is_dead_lettered(&self, threshold: Option<i32>) -> bool {
        threshold.is_some_and(|max| self.failed_attempts >= max)
    }
}
