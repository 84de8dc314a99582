pub mod memory;
pub mod models;
pub mod repository;

pub use memory::InMemoryResourceRepository;
pub use repository::ResourceRepositoryImpl;
