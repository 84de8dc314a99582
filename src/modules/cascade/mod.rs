/// Deletion cascade over the resource hierarchy
///
/// - Domain: pure decisions over current resource state
/// - Application: the job handler and the synchronous lifecycle entry points
pub mod application;
pub mod domain;

pub use application::{CascadeHandler, LifecycleService};
pub use domain::DeletionOutcome;
