/// Job execution errors
///
/// Both variants mark the job failed and leave it eligible for re-pull.
/// Fatal failures are logged at error level.
use crate::shared::errors::AppError;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum JobError {
    #[error("retryable: {0}")]
    Retryable(AppError),

    #[error("fatal: {0}")]
    Fatal(AppError),
}

impl JobError {
    pub fn fatal(error: AppError) -> Self {
        JobError::Fatal(error)
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, JobError::Retryable(_))
    }

    pub fn inner(&self) -> &AppError {
        match self {
            JobError::Retryable(e) | JobError::Fatal(e) => e,
        }
    }
}

/// Transient `AppError`s are retryable, everything else is fatal.
impl From<AppError> for JobError {
    fn from(error: AppError) -> Self {
        if error.is_transient() {
            JobError::Retryable(error)
        } else {
            JobError::Fatal(error)
        }
    }
}
