/// Plan, merchant, MID and location hierarchy
///
/// - Domain: entities, statuses and the `ResourceRepository` trait
/// - Infrastructure: Diesel-backed and in-memory repositories
pub mod domain;
pub mod infrastructure;

pub use domain::{
    Location, Merchant, Mid, MidKind, MidRefs, Plan, ReconciliationStatus, ResourceRepository,
    ResourceStatus,
};
pub use infrastructure::{InMemoryResourceRepository, ResourceRepositoryImpl};
