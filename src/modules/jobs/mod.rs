/// Background job system module
///
/// Provides a durable job queue for the resource lifecycle:
/// - onboarding and offboarding MIDs with the reconciliation service
/// - cascading merchant and plan deletions
///
/// Architecture:
/// - Domain: job records, typed messages, repository and handler traits
/// - Infrastructure: Diesel-based and in-memory repository implementations
/// - Worker: Background worker that processes jobs
pub mod domain;
pub mod infrastructure;
pub mod worker;

// Re-exports for easy access
pub use domain::{
    JobError, JobHandler, JobMessage, JobRecord, JobRepository, JobStatistics, JobStatus,
};
pub use infrastructure::{InMemoryJobRepository, JobRepositoryImpl};
pub use worker::{BackgroundWorker, BatchSummary, WorkerMode, WorkerStatistics};
