/// Service wiring for integration tests
use super::fakes::RecordingReconciliationClient;
use merchant_cascade::modules::jobs::InMemoryJobRepository;
use merchant_cascade::modules::resources::{
    InMemoryResourceRepository, Location, Merchant, Mid, Plan, ResourceRepository,
};
use merchant_cascade::shared::config::WorkerConfig;
use merchant_cascade::Services;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

pub struct TestContext {
    pub services: Services,
    pub resources: Arc<InMemoryResourceRepository>,
    pub jobs: Arc<InMemoryJobRepository>,
    pub reconciliation: Arc<RecordingReconciliationClient>,
}

pub fn test_worker_config() -> WorkerConfig {
    WorkerConfig {
        concurrency: 50,
        poll_interval: Duration::from_millis(10),
        max_failed_attempts: None,
    }
}

/// In-memory repositories and a recording reconciliation client
pub fn build_test_services() -> TestContext {
    build_test_services_with(test_worker_config())
}

pub fn build_test_services_with(config: WorkerConfig) -> TestContext {
    let resources = Arc::new(InMemoryResourceRepository::new());
    let jobs = Arc::new(
        InMemoryJobRepository::new().with_dead_letter_threshold(config.max_failed_attempts),
    );
    let reconciliation = Arc::new(RecordingReconciliationClient::new());

    let services = Services::new(
        resources.clone(),
        jobs.clone(),
        reconciliation.clone(),
        &config,
    );

    TestContext {
        services,
        resources,
        jobs,
        reconciliation,
    }
}

impl TestContext {
    pub async fn seed_plan(&self, plan: &Plan) {
        self.resources.save_plan(plan).await.unwrap();
    }

    pub async fn seed_merchant(&self, merchant: &Merchant) {
        self.resources.save_merchant(merchant).await.unwrap();
    }

    pub async fn seed_mid(&self, mid: &Mid) {
        self.resources.save_mid(mid).await.unwrap();
    }

    pub async fn seed_location(&self, location: &Location) {
        self.resources.save_location(location).await.unwrap();
    }

    pub async fn plan(&self, plan_ref: Uuid) -> Plan {
        self.resources.get_plan(plan_ref).await.unwrap().unwrap()
    }

    pub async fn merchant(&self, merchant_ref: Uuid) -> Merchant {
        self.resources.get_merchant(merchant_ref).await.unwrap().unwrap()
    }

    pub async fn mid(&self, mid: &Mid) -> Mid {
        let refs = merchant_cascade::modules::resources::MidRefs::from_mids([mid]);
        self.resources
            .get_mids(&refs)
            .await
            .unwrap()
            .into_iter()
            .next()
            .unwrap()
    }

    pub async fn location(&self, location_ref: Uuid) -> Location {
        self.resources.get_location(location_ref).await.unwrap().unwrap()
    }

    /// Process one batch, the jobs queued before this call
    pub async fn run_generation(&self) -> merchant_cascade::modules::jobs::BatchSummary {
        self.services.worker.run_once().await.unwrap()
    }
}
