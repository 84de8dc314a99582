pub mod cascade;
pub mod jobs;
pub mod reconciliation;
pub mod resources;
