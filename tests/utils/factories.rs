/// Test data factories using builder pattern
///
/// Provides convenient methods to create hierarchy resources with sensible defaults
use merchant_cascade::modules::resources::{
    Location, Merchant, Mid, MidKind, Plan, ReconciliationStatus, ResourceStatus,
};
use uuid::Uuid;

pub struct PlanFactory {
    plan_ref: Uuid,
    name: String,
    slug: String,
    status: ResourceStatus,
}

impl Default for PlanFactory {
    fn default() -> Self {
        Self {
            plan_ref: Uuid::new_v4(),
            name: "Test Plan".to_string(),
            slug: "test-plan".to_string(),
            status: ResourceStatus::Active,
        }
    }
}

impl PlanFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_slug(mut self, slug: &str) -> Self {
        self.slug = slug.to_string();
        self
    }

    pub fn with_status(mut self, status: ResourceStatus) -> Self {
        self.status = status;
        self
    }

    pub fn build(self) -> Plan {
        Plan {
            plan_ref: self.plan_ref,
            name: self.name,
            slug: self.slug,
            status: self.status,
        }
    }
}

pub struct MerchantFactory {
    plan_ref: Uuid,
    name: String,
    status: ResourceStatus,
}

impl MerchantFactory {
    pub fn for_plan(plan: &Plan) -> Self {
        Self {
            plan_ref: plan.plan_ref,
            name: "Test Merchant".to_string(),
            status: ResourceStatus::Active,
        }
    }

    pub fn with_status(mut self, status: ResourceStatus) -> Self {
        self.status = status;
        self
    }

    pub fn build(self) -> Merchant {
        Merchant {
            merchant_ref: Uuid::new_v4(),
            plan_ref: self.plan_ref,
            name: self.name,
            status: self.status,
        }
    }
}

pub struct MidFactory {
    kind: MidKind,
    merchant_ref: Uuid,
    identifier: String,
    payment_scheme: String,
    location_ref: Option<Uuid>,
    status: ResourceStatus,
    reconciliation_status: ReconciliationStatus,
}

impl MidFactory {
    pub fn new(kind: MidKind, merchant: &Merchant) -> Self {
        Self {
            kind,
            merchant_ref: merchant.merchant_ref,
            identifier: format!("{:08}", rand_identifier()),
            payment_scheme: "visa".to_string(),
            location_ref: None,
            status: ResourceStatus::Active,
            reconciliation_status: ReconciliationStatus::NotOnboarded,
        }
    }

    pub fn primary(merchant: &Merchant) -> Self {
        Self::new(MidKind::PrimaryMid, merchant)
    }

    pub fn secondary(merchant: &Merchant) -> Self {
        Self::new(MidKind::SecondaryMid, merchant)
    }

    pub fn psimi(merchant: &Merchant) -> Self {
        Self::new(MidKind::Psimi, merchant)
    }

    pub fn onboarded(mut self) -> Self {
        self.reconciliation_status = ReconciliationStatus::Onboarded;
        self
    }

    pub fn with_identifier(mut self, identifier: &str) -> Self {
        self.identifier = identifier.to_string();
        self
    }

    pub fn with_payment_scheme(mut self, scheme: &str) -> Self {
        self.payment_scheme = scheme.to_string();
        self
    }

    pub fn at_location(mut self, location: &Location) -> Self {
        self.location_ref = Some(location.location_ref);
        self
    }

    pub fn with_status(mut self, status: ResourceStatus) -> Self {
        self.status = status;
        self
    }

    pub fn build(self) -> Mid {
        Mid {
            mid_ref: Uuid::new_v4(),
            kind: self.kind,
            merchant_ref: self.merchant_ref,
            identifier: self.identifier,
            payment_scheme: self.payment_scheme,
            location_ref: self.location_ref,
            status: self.status,
            reconciliation_status: self.reconciliation_status,
        }
    }
}

pub struct LocationFactory {
    merchant_ref: Uuid,
    parent_ref: Option<Uuid>,
    location_id: String,
}

impl LocationFactory {
    pub fn for_merchant(merchant: &Merchant) -> Self {
        Self {
            merchant_ref: merchant.merchant_ref,
            parent_ref: None,
            location_id: format!("LOC-{}", rand_identifier()),
        }
    }

    pub fn child_of(mut self, parent: &Location) -> Self {
        self.parent_ref = Some(parent.location_ref);
        self
    }

    pub fn with_location_id(mut self, location_id: &str) -> Self {
        self.location_id = location_id.to_string();
        self
    }

    pub fn build(self) -> Location {
        Location {
            location_ref: Uuid::new_v4(),
            merchant_ref: self.merchant_ref,
            parent_ref: self.parent_ref,
            name: format!("Store {}", self.location_id),
            location_id: self.location_id,
            status: ResourceStatus::Active,
        }
    }
}

fn rand_identifier() -> u32 {
    (Uuid::new_v4().as_u128() % 100_000_000) as u32
}
