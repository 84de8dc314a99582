pub mod entities;
pub mod repository;
pub mod value_objects;

pub use entities::{Location, Merchant, Mid, MidKind, MidRefs, Plan};
pub use repository::ResourceRepository;
pub use value_objects::{ReconciliationStatus, ResourceStatus};
