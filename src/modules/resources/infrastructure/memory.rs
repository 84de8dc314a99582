/// In-memory ResourceRepository
///
/// A single lock guards the whole hierarchy, so every multi-row change is atomic
/// in the same way the Postgres implementation's transactions are. Used for burst
/// runs without a database and by the test suites.
use crate::modules::resources::domain::{
    Location, Merchant, Mid, MidKind, MidRefs, Plan, ReconciliationStatus, ResourceRepository,
    ResourceStatus,
};
use crate::shared::errors::AppResult;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct HierarchyState {
    plans: HashMap<Uuid, Plan>,
    merchants: HashMap<Uuid, Merchant>,
    mids: HashMap<Uuid, Mid>,
    locations: HashMap<Uuid, Location>,
    /// (secondary_mid_ref, location_ref)
    secondary_links: Vec<(Uuid, Uuid)>,
}

impl HierarchyState {
    fn mids_matching<'a>(&'a mut self, refs: &'a MidRefs) -> impl Iterator<Item = &'a mut Mid> {
        self.mids.values_mut().filter(move |mid| {
            refs.refs(mid.kind).contains(&mid.mid_ref)
        })
    }

    fn detach_mid_locations(&mut self, deleted: &HashSet<Uuid>) {
        for mid in self.mids.values_mut() {
            if deleted.contains(&mid.mid_ref) && mid.kind == MidKind::PrimaryMid {
                mid.location_ref = None;
            }
        }
        self.secondary_links
            .retain(|(mid_ref, _)| !deleted.contains(mid_ref));
    }

    fn delete_merchant_tree(&mut self, merchant_ref: Uuid) {
        if let Some(merchant) = self.merchants.get_mut(&merchant_ref) {
            merchant.status = ResourceStatus::Deleted;
        }

        let mut deleted = HashSet::new();
        for mid in self.mids.values_mut() {
            if mid.merchant_ref == merchant_ref {
                mid.status = ResourceStatus::Deleted;
                deleted.insert(mid.mid_ref);
            }
        }
        self.detach_mid_locations(&deleted);

        for location in self.locations.values_mut() {
            if location.merchant_ref == merchant_ref {
                location.status = ResourceStatus::Deleted;
            }
        }
    }
}

#[derive(Default)]
pub struct InMemoryResourceRepository {
    state: RwLock<HierarchyState>,
}

impl InMemoryResourceRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResourceRepository for InMemoryResourceRepository {
    async fn save_plan(&self, plan: &Plan) -> AppResult<Plan> {
        let mut state = self.state.write().await;
        state.plans.insert(plan.plan_ref, plan.clone());
        Ok(plan.clone())
    }

    async fn save_merchant(&self, merchant: &Merchant) -> AppResult<Merchant> {
        let mut state = self.state.write().await;
        state.merchants.insert(merchant.merchant_ref, merchant.clone());
        Ok(merchant.clone())
    }

    async fn save_mid(&self, mid: &Mid) -> AppResult<Mid> {
        let mut stored = mid.clone();
        if stored.kind != MidKind::PrimaryMid {
            stored.location_ref = None;
        }
        let mut state = self.state.write().await;
        state.mids.insert(stored.mid_ref, stored.clone());
        Ok(stored)
    }

    async fn save_location(&self, location: &Location) -> AppResult<Location> {
        let mut state = self.state.write().await;
        state.locations.insert(location.location_ref, location.clone());
        Ok(location.clone())
    }

    async fn link_secondary_mid_location(
        &self,
        secondary_mid_ref: Uuid,
        location_ref: Uuid,
    ) -> AppResult<()> {
        let mut state = self.state.write().await;
        let link = (secondary_mid_ref, location_ref);
        if !state.secondary_links.contains(&link) {
            state.secondary_links.push(link);
        }
        Ok(())
    }

    async fn get_plan(&self, plan_ref: Uuid) -> AppResult<Option<Plan>> {
        Ok(self.state.read().await.plans.get(&plan_ref).cloned())
    }

    async fn get_merchant(&self, merchant_ref: Uuid) -> AppResult<Option<Merchant>> {
        Ok(self.state.read().await.merchants.get(&merchant_ref).cloned())
    }

    async fn get_location(&self, location_ref: Uuid) -> AppResult<Option<Location>> {
        Ok(self.state.read().await.locations.get(&location_ref).cloned())
    }

    async fn list_merchants(&self, plan_ref: Uuid) -> AppResult<Vec<Merchant>> {
        let state = self.state.read().await;
        Ok(state
            .merchants
            .values()
            .filter(|m| m.plan_ref == plan_ref)
            .cloned()
            .collect())
    }

    async fn list_locations(&self, merchant_ref: Uuid) -> AppResult<Vec<Location>> {
        let state = self.state.read().await;
        Ok(state
            .locations
            .values()
            .filter(|l| l.merchant_ref == merchant_ref)
            .cloned()
            .collect())
    }

    async fn list_mids(&self, merchant_ref: Uuid) -> AppResult<Vec<Mid>> {
        let state = self.state.read().await;
        Ok(state
            .mids
            .values()
            .filter(|m| m.merchant_ref == merchant_ref)
            .cloned()
            .collect())
    }

    async fn get_mids(&self, refs: &MidRefs) -> AppResult<Vec<Mid>> {
        let state = self.state.read().await;
        Ok(refs
            .iter()
            .filter_map(|(kind, mid_ref)| {
                state
                    .mids
                    .get(&mid_ref)
                    .filter(|mid| mid.kind == kind)
                    .cloned()
            })
            .collect())
    }

    async fn secondary_mid_locations(&self, secondary_mid_ref: Uuid) -> AppResult<Vec<Uuid>> {
        let state = self.state.read().await;
        Ok(state
            .secondary_links
            .iter()
            .filter(|(mid_ref, _)| *mid_ref == secondary_mid_ref)
            .map(|(_, location_ref)| *location_ref)
            .collect())
    }

    async fn count_onboarded_mids(&self, merchant_ref: Uuid) -> AppResult<i64> {
        let state = self.state.read().await;
        Ok(state
            .mids
            .values()
            .filter(|m| {
                m.merchant_ref == merchant_ref && !m.status.is_deleted() && m.is_onboarded()
            })
            .count() as i64)
    }

    async fn set_reconciliation_status(
        &self,
        refs: &MidRefs,
        status: ReconciliationStatus,
    ) -> AppResult<usize> {
        let mut state = self.state.write().await;
        let mut updated = 0;
        for mid in state.mids_matching(refs) {
            if !mid.status.is_deleted() {
                mid.reconciliation_status = status;
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn mark_mids_pending_deletion(
        &self,
        merchant_ref: Uuid,
        refs: &MidRefs,
    ) -> AppResult<usize> {
        let mut state = self.state.write().await;
        let mut updated = 0;
        for mid in state.mids_matching(refs) {
            if mid.merchant_ref == merchant_ref && !mid.status.is_deleted() {
                mid.status = ResourceStatus::PendingDeletion;
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn delete_mids(&self, refs: &MidRefs) -> AppResult<usize> {
        let mut state = self.state.write().await;
        let mut deleted = HashSet::new();
        for mid in state.mids_matching(refs) {
            if mid.is_onboarded() {
                mid.reconciliation_status = ReconciliationStatus::Offboarded;
            }
            mid.status = ResourceStatus::Deleted;
            deleted.insert(mid.mid_ref);
        }
        state.detach_mid_locations(&deleted);
        Ok(deleted.len())
    }

    async fn mark_merchant_pending_deletion(
        &self,
        merchant_ref: Uuid,
        mids: &MidRefs,
    ) -> AppResult<()> {
        let mut state = self.state.write().await;
        if let Some(merchant) = state.merchants.get_mut(&merchant_ref) {
            if !merchant.status.is_deleted() {
                merchant.status = ResourceStatus::PendingDeletion;
            }
        }
        for mid in state.mids_matching(mids) {
            if mid.merchant_ref == merchant_ref && !mid.status.is_deleted() {
                mid.status = ResourceStatus::PendingDeletion;
            }
        }
        Ok(())
    }

    async fn mark_plan_pending_deletion(&self, plan_ref: Uuid) -> AppResult<Vec<Uuid>> {
        let mut state = self.state.write().await;
        if let Some(plan) = state.plans.get_mut(&plan_ref) {
            if !plan.status.is_deleted() {
                plan.status = ResourceStatus::PendingDeletion;
            }
        }
        let mut pending = Vec::new();
        for merchant in state.merchants.values_mut() {
            if merchant.plan_ref == plan_ref && !merchant.status.is_deleted() {
                merchant.status = ResourceStatus::PendingDeletion;
                pending.push(merchant.merchant_ref);
            }
        }
        Ok(pending)
    }

    async fn delete_merchant_tree(&self, merchant_ref: Uuid) -> AppResult<()> {
        let mut state = self.state.write().await;
        state.delete_merchant_tree(merchant_ref);
        Ok(())
    }

    async fn delete_plan_tree(&self, plan_ref: Uuid) -> AppResult<()> {
        let mut state = self.state.write().await;
        let merchant_refs: Vec<Uuid> = state
            .merchants
            .values()
            .filter(|m| m.plan_ref == plan_ref)
            .map(|m| m.merchant_ref)
            .collect();
        for merchant_ref in merchant_refs {
            state.delete_merchant_tree(merchant_ref);
        }
        if let Some(plan) = state.plans.get_mut(&plan_ref) {
            plan.status = ResourceStatus::Deleted;
        }
        Ok(())
    }

    async fn delete_location(&self, merchant_ref: Uuid, location_ref: Uuid) -> AppResult<usize> {
        let mut state = self.state.write().await;

        let owned = state
            .locations
            .get(&location_ref)
            .is_some_and(|l| l.merchant_ref == merchant_ref);
        if !owned {
            return Ok(0);
        }

        // Walk down to every sub-location
        let mut subtree = HashSet::from([location_ref]);
        let mut frontier = vec![location_ref];
        while let Some(parent) = frontier.pop() {
            for location in state.locations.values() {
                if location.parent_ref == Some(parent) && subtree.insert(location.location_ref) {
                    frontier.push(location.location_ref);
                }
            }
        }

        for location in state.locations.values_mut() {
            if subtree.contains(&location.location_ref) {
                location.status = ResourceStatus::Deleted;
            }
        }
        for mid in state.mids.values_mut() {
            if mid.location_ref.is_some_and(|l| subtree.contains(&l)) {
                mid.location_ref = None;
            }
        }
        state
            .secondary_links
            .retain(|(_, location)| !subtree.contains(location));

        Ok(subtree.len())
    }
}
