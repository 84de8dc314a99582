// Shared kernel: configuration, database access, errors and logging

pub mod config;
pub mod database;
pub mod errors;
pub mod utils;

pub use config::AppConfig;
pub use database::Database;
