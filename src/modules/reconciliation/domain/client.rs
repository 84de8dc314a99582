/// Port to the external reconciliation service
use crate::shared::errors::AppResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One MID-like resource as the reconciliation service knows it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationIdentifier {
    pub identifier: String,
    /// Slug of the owning plan
    pub loyalty_plan: String,
    pub payment_scheme: String,
    /// Only primary MIDs attached to a location send one
    pub location_id: Option<String>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReconciliationClient: Send + Sync {
    /// Register identifiers. An empty slice is a no-op.
    async fn onboard(&self, identifiers: &[ReconciliationIdentifier]) -> AppResult<()>;

    /// Deregister identifiers. An empty slice is a no-op.
    async fn offboard(&self, identifiers: &[ReconciliationIdentifier]) -> AppResult<()>;
}
