/// Status value objects shared by every resource in the plan hierarchy
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle status carried by plans, merchants, MIDs and locations
#[derive(
    diesel_derive_enum::DbEnum, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[ExistingTypePath = "crate::schema::sql_types::ResourceStatus"]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceStatus {
    Active,
    Draft,
    ComingSoon,
    Suspended,
    PendingDeletion,
    Deleted,
}

impl ResourceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceStatus::Active => "ACTIVE",
            ResourceStatus::Draft => "DRAFT",
            ResourceStatus::ComingSoon => "COMING_SOON",
            ResourceStatus::Suspended => "SUSPENDED",
            ResourceStatus::PendingDeletion => "PENDING_DELETION",
            ResourceStatus::Deleted => "DELETED",
        }
    }

    pub fn is_deleted(&self) -> bool {
        matches!(self, ResourceStatus::Deleted)
    }

    pub fn is_pending_deletion(&self) -> bool {
        matches!(self, ResourceStatus::PendingDeletion)
    }

    /// Deleted or on its way there
    pub fn is_being_removed(&self) -> bool {
        matches!(
            self,
            ResourceStatus::PendingDeletion | ResourceStatus::Deleted
        )
    }
}

impl fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "ACTIVE" => Ok(ResourceStatus::Active),
            "DRAFT" => Ok(ResourceStatus::Draft),
            "COMING_SOON" => Ok(ResourceStatus::ComingSoon),
            "SUSPENDED" => Ok(ResourceStatus::Suspended),
            "PENDING_DELETION" => Ok(ResourceStatus::PendingDeletion),
            "DELETED" => Ok(ResourceStatus::Deleted),
            _ => Err(format!("Invalid resource status: {}", s)),
        }
    }
}

/// Onboarding state of a MID-like resource with the reconciliation service
#[derive(
    diesel_derive_enum::DbEnum, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[ExistingTypePath = "crate::schema::sql_types::ReconciliationStatus"]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReconciliationStatus {
    NotOnboarded,
    Onboarded,
    Offboarded,
}

impl ReconciliationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconciliationStatus::NotOnboarded => "NOT_ONBOARDED",
            ReconciliationStatus::Onboarded => "ONBOARDED",
            ReconciliationStatus::Offboarded => "OFFBOARDED",
        }
    }

    pub fn is_onboarded(&self) -> bool {
        matches!(self, ReconciliationStatus::Onboarded)
    }
}

impl fmt::Display for ReconciliationStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReconciliationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "NOT_ONBOARDED" => Ok(ReconciliationStatus::NotOnboarded),
            "ONBOARDED" => Ok(ReconciliationStatus::Onboarded),
            "OFFBOARDED" => Ok(ReconciliationStatus::Offboarded),
            _ => Err(format!("Invalid reconciliation status: {}", s)),
        }
    }
}
