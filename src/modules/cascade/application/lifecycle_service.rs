/// Synchronous entry points for lifecycle requests
///
/// Validates the request against current state, completes it immediately when
/// nothing has to be offboarded and otherwise enqueues the job that will.
/// Not-found errors are returned here, before any job exists.
use super::handler::CascadeHandler;
use crate::modules::cascade::domain::decisions::{self, DeletionOutcome};
use crate::modules::jobs::domain::{JobMessage, JobRecord, JobRepository};
use crate::modules::resources::domain::{Merchant, Mid, MidRefs, Plan, ResourceRepository};
use crate::shared::errors::{AppError, AppResult};
use crate::log_info;
use std::sync::Arc;
use uuid::Uuid;

pub struct LifecycleService {
    resources: Arc<dyn ResourceRepository>,
    jobs: Arc<dyn JobRepository>,
    cascade: Arc<CascadeHandler>,
}

impl LifecycleService {
    pub fn new(
        resources: Arc<dyn ResourceRepository>,
        jobs: Arc<dyn JobRepository>,
        cascade: Arc<CascadeHandler>,
    ) -> Self {
        Self {
            resources,
            jobs,
            cascade,
        }
    }

    pub async fn request_plan_deletion(&self, plan_ref: Uuid) -> AppResult<DeletionOutcome> {
        self.live_plan(plan_ref).await?;

        let mut onboarded = 0;
        for merchant in self.resources.list_merchants(plan_ref).await? {
            if !merchant.status.is_deleted() {
                onboarded += self
                    .resources
                    .count_onboarded_mids(merchant.merchant_ref)
                    .await?;
            }
        }

        if onboarded == 0 {
            self.resources.delete_plan_tree(plan_ref).await?;
            log_info!("Plan {} deleted synchronously", plan_ref);
            return Ok(DeletionOutcome::deleted());
        }

        self.resources.mark_plan_pending_deletion(plan_ref).await?;
        let job = self
            .jobs
            .push(&JobMessage::OffboardAndDeletePlan { plan_ref })
            .await?;
        log_info!(
            "Plan {} pending deletion with {} onboarded MIDs (job {})",
            plan_ref,
            onboarded,
            job.id
        );
        Ok(DeletionOutcome::pending(job.id))
    }

    pub async fn request_merchant_deletion(
        &self,
        plan_ref: Uuid,
        merchant_ref: Uuid,
    ) -> AppResult<DeletionOutcome> {
        self.live_merchant(plan_ref, merchant_ref).await?;
        self.cascade.delete_merchant(merchant_ref).await
    }

    /// Always synchronous: locations are not registered with reconciliation
    pub async fn request_location_deletion(
        &self,
        plan_ref: Uuid,
        merchant_ref: Uuid,
        location_ref: Uuid,
    ) -> AppResult<DeletionOutcome> {
        self.live_merchant(plan_ref, merchant_ref).await?;

        let location = self
            .resources
            .get_location(location_ref)
            .await?
            .filter(|l| l.merchant_ref == merchant_ref && !l.status.is_deleted())
            .ok_or_else(|| AppError::NotFound(format!("Location {} not found", location_ref)))?;

        let removed = self
            .resources
            .delete_location(merchant_ref, location.location_ref)
            .await?;
        log_info!(
            "Location {} deleted with {} locations in its subtree",
            location_ref,
            removed
        );
        Ok(DeletionOutcome::deleted())
    }

    /// Non-onboarded MIDs are deleted now, onboarded ones are queued for offboarding
    pub async fn request_mid_deletion(
        &self,
        plan_ref: Uuid,
        merchant_ref: Uuid,
        refs: &MidRefs,
    ) -> AppResult<DeletionOutcome> {
        self.live_merchant(plan_ref, merchant_ref).await?;
        let mids = self.owned_mids(merchant_ref, refs).await?;

        let onboarded = decisions::onboarded_children(&mids);
        let immediate = MidRefs::from_mids(mids.iter().filter(|mid| {
            !mid.status.is_deleted() && !onboarded.refs(mid.kind).contains(&mid.mid_ref)
        }));

        if !immediate.is_empty() {
            self.resources.delete_mids(&immediate).await?;
        }

        if onboarded.is_empty() {
            return Ok(DeletionOutcome::deleted());
        }

        self.resources
            .mark_mids_pending_deletion(merchant_ref, &onboarded)
            .await?;
        let job = self
            .jobs
            .push(&JobMessage::OffboardAndDeleteMids(onboarded))
            .await?;
        Ok(DeletionOutcome::pending(job.id))
    }

    pub async fn request_onboarding(
        &self,
        plan_ref: Uuid,
        merchant_ref: Uuid,
        refs: &MidRefs,
    ) -> AppResult<JobRecord> {
        let plan = self.live_plan(plan_ref).await?;
        let merchant = self.live_merchant(plan_ref, merchant_ref).await?;
        if !decisions::accepts_onboarding(&merchant, &plan) {
            return Err(AppError::InvalidOperation(format!(
                "Merchant {} is pending deletion",
                merchant_ref
            )));
        }
        self.owned_mids(merchant_ref, refs).await?;
        self.jobs.push(&JobMessage::OnboardMids(refs.clone())).await
    }

    pub async fn request_offboarding(
        &self,
        plan_ref: Uuid,
        merchant_ref: Uuid,
        refs: &MidRefs,
    ) -> AppResult<JobRecord> {
        self.live_merchant(plan_ref, merchant_ref).await?;
        self.owned_mids(merchant_ref, refs).await?;
        self.jobs.push(&JobMessage::OffboardMids(refs.clone())).await
    }

    async fn live_plan(&self, plan_ref: Uuid) -> AppResult<Plan> {
        self.resources
            .get_plan(plan_ref)
            .await?
            .filter(|plan| !plan.status.is_deleted())
            .ok_or_else(|| AppError::NotFound(format!("Plan {} not found", plan_ref)))
    }

    /// The merchant, if it exists under `plan_ref` and is not deleted
    async fn live_merchant(&self, plan_ref: Uuid, merchant_ref: Uuid) -> AppResult<Merchant> {
        self.live_plan(plan_ref).await?;
        self.resources
            .get_merchant(merchant_ref)
            .await?
            .filter(|m| m.plan_ref == plan_ref && !m.status.is_deleted())
            .ok_or_else(|| AppError::NotFound(format!("Merchant {} not found", merchant_ref)))
    }

    /// Every referenced MID must exist and belong to `merchant_ref`
    async fn owned_mids(&self, merchant_ref: Uuid, refs: &MidRefs) -> AppResult<Vec<Mid>> {
        if refs.is_empty() {
            return Err(AppError::InvalidInput("No MID references given".to_string()));
        }

        let mids: Vec<Mid> = self
            .resources
            .get_mids(refs)
            .await?
            .into_iter()
            .filter(|mid| mid.merchant_ref == merchant_ref)
            .collect();

        let missing = decisions::missing_refs(refs, &mids);
        if let Some((kind, mid_ref)) = missing.iter().next() {
            return Err(AppError::NotFound(format!(
                "{} {} not found for merchant {}",
                kind, mid_ref, merchant_ref
            )));
        }
        Ok(mids)
    }
}
