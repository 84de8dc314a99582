/// Cascade decisions
///
/// Pure functions of current resource state. The handler re-reads state before
/// every call, so applying a decision twice converges on the same result.
use crate::modules::resources::domain::{Merchant, Mid, MidRefs, Plan, ResourceStatus};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Result of a synchronous deletion request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionOutcome {
    /// `Deleted` on the fast path, `PendingDeletion` when offboarding was queued
    pub status: ResourceStatus,
    pub job_id: Option<Uuid>,
}

impl DeletionOutcome {
    pub fn deleted() -> Self {
        Self {
            status: ResourceStatus::Deleted,
            job_id: None,
        }
    }

    pub fn pending(job_id: Uuid) -> Self {
        Self {
            status: ResourceStatus::PendingDeletion,
            job_id: Some(job_id),
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.status.is_deleted()
    }
}

/// MIDs an OnboardMIDs message should actually send
pub fn mids_to_onboard(mids: &[Mid]) -> MidRefs {
    MidRefs::from_mids(
        mids.iter()
            .filter(|mid| !mid.is_onboarded() && !mid.status.is_being_removed()),
    )
}

/// New MIDs may only be registered under a plan and merchant that are staying
pub fn accepts_onboarding(merchant: &Merchant, plan: &Plan) -> bool {
    !merchant.status.is_being_removed() && !plan.status.is_being_removed()
}

/// Onboarded MIDs that no pending offboarding job covers yet
pub fn unqueued_onboarded(mids: &[Mid]) -> MidRefs {
    MidRefs::from_mids(
        mids.iter()
            .filter(|mid| mid.is_onboarded() && !mid.status.is_being_removed()),
    )
}

/// MIDs an offboarding message should actually send
pub fn mids_to_offboard(mids: &[Mid]) -> MidRefs {
    MidRefs::from_mids(mids.iter().filter(|mid| mid.is_onboarded()))
}

/// Live MIDs still registered with the reconciliation service
pub fn onboarded_children(mids: &[Mid]) -> MidRefs {
    MidRefs::from_mids(
        mids.iter()
            .filter(|mid| mid.is_onboarded() && !mid.status.is_deleted()),
    )
}

/// MIDs not yet deleted
pub fn live_mids(mids: &[Mid]) -> MidRefs {
    MidRefs::from_mids(mids.iter().filter(|mid| !mid.status.is_deleted()))
}

/// Requested references with no matching MID of that kind
pub fn missing_refs(requested: &MidRefs, found: &[Mid]) -> MidRefs {
    let mut missing = MidRefs::default();
    for (kind, mid_ref) in requested.iter() {
        if !found
            .iter()
            .any(|mid| mid.kind == kind && mid.mid_ref == mid_ref)
        {
            missing.push(kind, mid_ref);
        }
    }
    missing
}

/// Distinct owning merchants, in first-seen order
pub fn owning_merchants(mids: &[Mid]) -> Vec<Uuid> {
    let mut merchants = Vec::new();
    for mid in mids {
        if !merchants.contains(&mid.merchant_ref) {
            merchants.push(mid.merchant_ref);
        }
    }
    merchants
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MerchantDeletion {
    AlreadyDeleted,
    /// Nothing is onboarded; the tree can go now
    DeleteNow,
    /// Offboard these first
    Offboard(MidRefs),
}

pub fn merchant_deletion(merchant: &Merchant, mids: &[Mid]) -> MerchantDeletion {
    if merchant.status.is_deleted() {
        return MerchantDeletion::AlreadyDeleted;
    }
    let onboarded = onboarded_children(mids);
    if onboarded.is_empty() {
        MerchantDeletion::DeleteNow
    } else {
        MerchantDeletion::Offboard(onboarded)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CascadeStep {
    /// Resource is not being deleted, nothing to do
    NotPending,
    /// Still waiting on children
    Wait,
    Delete,
}

/// A pending merchant is deleted once no live MID is onboarded
pub fn merchant_cascade(merchant: &Merchant, onboarded_count: i64) -> CascadeStep {
    if !merchant.status.is_pending_deletion() {
        CascadeStep::NotPending
    } else if onboarded_count > 0 {
        CascadeStep::Wait
    } else {
        CascadeStep::Delete
    }
}

/// A pending plan is deleted once every merchant is deleted
pub fn plan_cascade(plan: &Plan, merchants: &[Merchant]) -> CascadeStep {
    if !plan.status.is_pending_deletion() {
        CascadeStep::NotPending
    } else if merchants.iter().all(|m| m.status.is_deleted()) {
        CascadeStep::Delete
    } else {
        CascadeStep::Wait
    }
}
