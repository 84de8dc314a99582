/// Executes job messages against the resource hierarchy
///
/// Each message re-reads current state, applies a decision from
/// `cascade::domain::decisions`, makes at most one reconciliation call and
/// enqueues any follow-up jobs.
use crate::modules::cascade::domain::decisions::{
    self, CascadeStep, DeletionOutcome, MerchantDeletion,
};
use crate::modules::jobs::domain::{JobError, JobHandler, JobMessage, JobRepository};
use crate::modules::reconciliation::domain::{ReconciliationClient, ReconciliationIdentifier};
use crate::modules::resources::domain::{
    Mid, MidKind, MidRefs, ReconciliationStatus, ResourceRepository,
};
use crate::shared::errors::{AppError, AppResult};
use crate::{log_debug, log_info};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

pub struct CascadeHandler {
    resources: Arc<dyn ResourceRepository>,
    jobs: Arc<dyn JobRepository>,
    reconciliation: Arc<dyn ReconciliationClient>,
}

impl CascadeHandler {
    pub fn new(
        resources: Arc<dyn ResourceRepository>,
        jobs: Arc<dyn JobRepository>,
        reconciliation: Arc<dyn ReconciliationClient>,
    ) -> Self {
        Self {
            resources,
            jobs,
            reconciliation,
        }
    }

    async fn onboard_mids(&self, refs: &MidRefs) -> AppResult<()> {
        let mids = self.with_staying_owners(self.load_mids(refs).await?).await?;
        let targets = decisions::mids_to_onboard(&mids);
        if targets.is_empty() {
            log_debug!("All {} MIDs already onboarded or being removed", refs.len());
            return Ok(());
        }

        let identifiers = self.resolve_identifiers(&mids, &targets).await?;
        self.reconciliation.onboard(&identifiers).await?;
        self.resources
            .set_reconciliation_status(&targets, ReconciliationStatus::Onboarded)
            .await?;

        log_info!("Onboarded {} MIDs", targets.len());
        Ok(())
    }

    async fn offboard_mids(&self, refs: &MidRefs) -> AppResult<()> {
        let mids = self.load_mids(refs).await?;
        let targets = decisions::mids_to_offboard(&mids);
        if targets.is_empty() {
            log_debug!("None of {} MIDs are onboarded", refs.len());
            return Ok(());
        }

        let identifiers = self.resolve_identifiers(&mids, &targets).await?;
        self.reconciliation.offboard(&identifiers).await?;
        self.resources
            .set_reconciliation_status(&targets, ReconciliationStatus::Offboarded)
            .await?;

        log_info!("Offboarded {} MIDs", targets.len());
        Ok(())
    }

    async fn offboard_and_delete_mids(&self, refs: &MidRefs) -> AppResult<()> {
        let mids = self.load_mids(refs).await?;

        let targets = decisions::mids_to_offboard(&mids);
        if !targets.is_empty() {
            let identifiers = self.resolve_identifiers(&mids, &targets).await?;
            self.reconciliation.offboard(&identifiers).await?;
        }

        let live = decisions::live_mids(&mids);
        if !live.is_empty() {
            let deleted = self.resources.delete_mids(&live).await?;
            log_info!(
                "Deleted {} MIDs ({} offboarded first)",
                deleted,
                targets.len()
            );
        }

        for merchant_ref in decisions::owning_merchants(&mids) {
            self.check_merchant(merchant_ref).await?;
        }
        Ok(())
    }

    async fn offboard_and_delete_plan(&self, plan_ref: Uuid) -> AppResult<()> {
        let plan = self
            .resources
            .get_plan(plan_ref)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Plan {} not found", plan_ref)))?;
        if plan.status.is_deleted() {
            log_debug!("Plan {} already deleted", plan_ref);
            return Ok(());
        }

        let merchants = self.resources.mark_plan_pending_deletion(plan_ref).await?;
        if merchants.is_empty() {
            self.resources.delete_plan_tree(plan_ref).await?;
            log_info!("Plan {} had no live merchants and was deleted", plan_ref);
            return Ok(());
        }

        for merchant_ref in &merchants {
            self.jobs
                .push(&JobMessage::OffboardAndDeleteMerchant {
                    plan_ref,
                    merchant_ref: *merchant_ref,
                })
                .await?;
        }
        log_info!(
            "Plan {} pending deletion, queued {} merchant deletions",
            plan_ref,
            merchants.len()
        );
        Ok(())
    }

    /// Delete a merchant now, or mark it pending and queue offboarding of its
    /// onboarded MIDs. Shared by the OffboardAndDeleteMerchant message and
    /// synchronous merchant deletion requests.
    pub async fn delete_merchant(&self, merchant_ref: Uuid) -> AppResult<DeletionOutcome> {
        let merchant = self
            .resources
            .get_merchant(merchant_ref)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Merchant {} not found", merchant_ref)))?;
        let mids = self.resources.list_mids(merchant_ref).await?;

        match decisions::merchant_deletion(&merchant, &mids) {
            MerchantDeletion::AlreadyDeleted => Ok(DeletionOutcome::deleted()),
            MerchantDeletion::DeleteNow => {
                self.resources.delete_merchant_tree(merchant_ref).await?;
                log_info!("Merchant {} had no onboarded MIDs and was deleted", merchant_ref);
                self.check_plan(merchant.plan_ref).await?;
                Ok(DeletionOutcome::deleted())
            }
            MerchantDeletion::Offboard(onboarded) => {
                self.resources
                    .mark_merchant_pending_deletion(merchant_ref, &onboarded)
                    .await?;
                let job = self
                    .jobs
                    .push(&JobMessage::OffboardAndDeleteMids(onboarded.clone()))
                    .await?;
                log_info!(
                    "Merchant {} pending deletion, {} MIDs queued for offboarding (job {})",
                    merchant_ref,
                    onboarded.len(),
                    job.id
                );
                Ok(DeletionOutcome::pending(job.id))
            }
        }
    }

    /// Finish a pending merchant once nothing under it is onboarded
    async fn check_merchant(&self, merchant_ref: Uuid) -> AppResult<()> {
        let merchant = self
            .resources
            .get_merchant(merchant_ref)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Merchant {} not found", merchant_ref)))?;
        let onboarded = self.resources.count_onboarded_mids(merchant_ref).await?;

        match decisions::merchant_cascade(&merchant, onboarded) {
            CascadeStep::NotPending => Ok(()),
            CascadeStep::Wait => {
                let stragglers =
                    decisions::unqueued_onboarded(&self.resources.list_mids(merchant_ref).await?);
                if stragglers.is_empty() {
                    log_debug!(
                        "Merchant {} still has {} onboarded MIDs",
                        merchant_ref,
                        onboarded
                    );
                    return Ok(());
                }

                self.resources
                    .mark_mids_pending_deletion(merchant_ref, &stragglers)
                    .await?;
                let job = self
                    .jobs
                    .push(&JobMessage::OffboardAndDeleteMids(stragglers.clone()))
                    .await?;
                log_info!(
                    "Merchant {} has {} onboarded MIDs outside any deletion job, queued job {}",
                    merchant_ref,
                    stragglers.len(),
                    job.id
                );
                Ok(())
            }
            CascadeStep::Delete => {
                self.resources.delete_merchant_tree(merchant_ref).await?;
                log_info!("Merchant {} deleted after offboarding", merchant_ref);
                self.check_plan(merchant.plan_ref).await
            }
        }
    }

    /// Finish a pending plan once every merchant is deleted
    async fn check_plan(&self, plan_ref: Uuid) -> AppResult<()> {
        let plan = self
            .resources
            .get_plan(plan_ref)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Plan {} not found", plan_ref)))?;
        let merchants = self.resources.list_merchants(plan_ref).await?;

        if decisions::plan_cascade(&plan, &merchants) == CascadeStep::Delete {
            self.resources.delete_plan_tree(plan_ref).await?;
            log_info!("Plan {} deleted after its last merchant", plan_ref);
        }
        Ok(())
    }

    /// Load every referenced MID; a missing one is an invariant violation
    async fn load_mids(&self, refs: &MidRefs) -> AppResult<Vec<Mid>> {
        let mids = self.resources.get_mids(refs).await?;
        let missing = decisions::missing_refs(refs, &mids);
        if !missing.is_empty() {
            let listed: Vec<String> = missing
                .iter()
                .map(|(kind, mid_ref)| format!("{}:{}", kind, mid_ref))
                .collect();
            return Err(AppError::NotFound(format!(
                "MIDs not found: {}",
                listed.join(", ")
            )));
        }
        Ok(mids)
    }

    /// Drop MIDs whose merchant or plan is pending deletion or deleted
    async fn with_staying_owners(&self, mids: Vec<Mid>) -> AppResult<Vec<Mid>> {
        let mut staying: HashMap<Uuid, bool> = HashMap::new();
        for merchant_ref in decisions::owning_merchants(&mids) {
            let merchant = self
                .resources
                .get_merchant(merchant_ref)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Merchant {} not found", merchant_ref)))?;
            let plan = self
                .resources
                .get_plan(merchant.plan_ref)
                .await?
                .ok_or_else(|| {
                    AppError::NotFound(format!("Plan {} not found", merchant.plan_ref))
                })?;
            staying.insert(merchant_ref, decisions::accepts_onboarding(&merchant, &plan));
        }

        let (kept, skipped): (Vec<Mid>, Vec<Mid>) = mids
            .into_iter()
            .partition(|mid| staying.get(&mid.merchant_ref).copied().unwrap_or(false));
        if !skipped.is_empty() {
            log_info!(
                "Skipping onboarding of {} MIDs whose merchant or plan is being removed",
                skipped.len()
            );
        }
        Ok(kept)
    }

    /// Build the wire identifiers for `targets`, resolving plan slugs and
    /// primary MID locations
    async fn resolve_identifiers(
        &self,
        mids: &[Mid],
        targets: &MidRefs,
    ) -> AppResult<Vec<ReconciliationIdentifier>> {
        let mut slugs: HashMap<Uuid, String> = HashMap::new();
        let mut identifiers = Vec::with_capacity(targets.len());

        for mid in mids {
            if !targets.refs(mid.kind).contains(&mid.mid_ref) {
                continue;
            }

            let loyalty_plan = match slugs.get(&mid.merchant_ref) {
                Some(slug) => slug.clone(),
                None => {
                    let slug = self.plan_slug(mid.merchant_ref).await?;
                    slugs.insert(mid.merchant_ref, slug.clone());
                    slug
                }
            };

            let location_id = match (mid.kind, mid.location_ref) {
                (MidKind::PrimaryMid, Some(location_ref)) => self
                    .resources
                    .get_location(location_ref)
                    .await?
                    .filter(|location| !location.status.is_deleted())
                    .map(|location| location.location_id),
                _ => None,
            };

            identifiers.push(ReconciliationIdentifier {
                identifier: mid.identifier.clone(),
                loyalty_plan,
                payment_scheme: mid.payment_scheme.clone(),
                location_id,
            });
        }

        Ok(identifiers)
    }

    async fn plan_slug(&self, merchant_ref: Uuid) -> AppResult<String> {
        let merchant = self
            .resources
            .get_merchant(merchant_ref)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Merchant {} not found", merchant_ref)))?;
        let plan = self
            .resources
            .get_plan(merchant.plan_ref)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Plan {} not found", merchant.plan_ref)))?;
        Ok(plan.slug)
    }
}

#[async_trait]
impl JobHandler for CascadeHandler {
    async fn handle(&self, message: JobMessage) -> Result<(), JobError> {
        log_debug!("Handling {}", message);
        match &message {
            JobMessage::OnboardMids(refs) => self.onboard_mids(refs).await?,
            JobMessage::OffboardMids(refs) => self.offboard_mids(refs).await?,
            JobMessage::OffboardAndDeleteMids(refs) => self.offboard_and_delete_mids(refs).await?,
            JobMessage::OffboardAndDeleteMerchant { merchant_ref, .. } => {
                self.delete_merchant(*merchant_ref).await?;
            }
            JobMessage::OffboardAndDeletePlan { plan_ref } => {
                self.offboard_and_delete_plan(*plan_ref).await?
            }
        }
        Ok(())
    }
}
