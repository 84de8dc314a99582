/// Client for the external reconciliation service
pub mod domain;
pub mod infrastructure;

pub use domain::{ReconciliationClient, ReconciliationIdentifier};
pub use infrastructure::HttpReconciliationClient;
