pub mod entities;
pub mod errors;
pub mod messages;
pub mod repository;
pub mod value_objects;

pub use entities::JobRecord;
pub use errors::JobError;
pub use messages::JobMessage;
pub use repository::{JobHandler, JobRepository, JobStatistics};
pub use value_objects::JobStatus;
