/// Repository trait for the resource hierarchy
///
/// Reads are scoped by owner reference; status changes are conditional updates.
/// Multi-row cascading changes (merchant or plan plus children) are atomic.
use super::entities::{Location, Merchant, Mid, MidRefs, Plan};
use super::value_objects::ReconciliationStatus;
use crate::shared::errors::AppResult;
use async_trait::async_trait;
use uuid::Uuid;

#[async_trait]
pub trait ResourceRepository: Send + Sync {
    /// Insert or replace a plan
    async fn save_plan(&self, plan: &Plan) -> AppResult<Plan>;

    /// Insert or replace a merchant
    async fn save_merchant(&self, merchant: &Merchant) -> AppResult<Merchant>;

    /// Insert or replace a MID-like resource
    async fn save_mid(&self, mid: &Mid) -> AppResult<Mid>;

    /// Insert or replace a location
    async fn save_location(&self, location: &Location) -> AppResult<Location>;

    /// Associate a secondary MID with a location
    async fn link_secondary_mid_location(
        &self,
        secondary_mid_ref: Uuid,
        location_ref: Uuid,
    ) -> AppResult<()>;

    async fn get_plan(&self, plan_ref: Uuid) -> AppResult<Option<Plan>>;

    async fn get_merchant(&self, merchant_ref: Uuid) -> AppResult<Option<Merchant>>;

    async fn get_location(&self, location_ref: Uuid) -> AppResult<Option<Location>>;

    /// All merchants owned by a plan, deleted ones included
    async fn list_merchants(&self, plan_ref: Uuid) -> AppResult<Vec<Merchant>>;

    /// All locations owned by a merchant, deleted ones included
    async fn list_locations(&self, merchant_ref: Uuid) -> AppResult<Vec<Location>>;

    /// All MID-like resources owned by a merchant, deleted ones included
    async fn list_mids(&self, merchant_ref: Uuid) -> AppResult<Vec<Mid>>;

    /// The MIDs that exist among `refs`. Missing references are omitted.
    async fn get_mids(&self, refs: &MidRefs) -> AppResult<Vec<Mid>>;

    /// Locations a secondary MID is linked to
    async fn secondary_mid_locations(&self, secondary_mid_ref: Uuid) -> AppResult<Vec<Uuid>>;

    /// Number of non-deleted MIDs under a merchant that are onboarded
    async fn count_onboarded_mids(&self, merchant_ref: Uuid) -> AppResult<i64>;

    /// Set the reconciliation status of every non-deleted MID in `refs`
    async fn set_reconciliation_status(
        &self,
        refs: &MidRefs,
        status: ReconciliationStatus,
    ) -> AppResult<usize>;

    /// Mark MIDs owned by `merchant_ref` as pending deletion
    async fn mark_mids_pending_deletion(&self, merchant_ref: Uuid, refs: &MidRefs)
        -> AppResult<usize>;

    /// Delete MIDs: status DELETED, onboarded ones become OFFBOARDED, and
    /// location associations are cleared. Callers offboard first.
    async fn delete_mids(&self, refs: &MidRefs) -> AppResult<usize>;

    /// Atomically mark a merchant and the given MIDs as pending deletion
    async fn mark_merchant_pending_deletion(
        &self,
        merchant_ref: Uuid,
        mids: &MidRefs,
    ) -> AppResult<()>;

    /// Atomically mark a plan and its live merchants as pending deletion.
    /// Returns the merchants that are now pending deletion.
    async fn mark_plan_pending_deletion(&self, plan_ref: Uuid) -> AppResult<Vec<Uuid>>;

    /// Atomically delete a merchant with all of its MIDs and locations
    async fn delete_merchant_tree(&self, merchant_ref: Uuid) -> AppResult<()>;

    /// Atomically delete a plan with every merchant tree beneath it
    async fn delete_plan_tree(&self, plan_ref: Uuid) -> AppResult<()>;

    /// Delete a location and its sub-locations, detaching any MIDs that point at them.
    /// Returns the number of locations deleted.
    async fn delete_location(&self, merchant_ref: Uuid, location_ref: Uuid) -> AppResult<usize>;
}
