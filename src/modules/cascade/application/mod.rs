pub mod handler;
pub mod lifecycle_service;

pub use handler::CascadeHandler;
pub use lifecycle_service::LifecycleService;
