pub mod client;

pub use client::{ReconciliationClient, ReconciliationIdentifier};
