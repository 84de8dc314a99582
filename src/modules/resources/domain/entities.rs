/// Domain entities for the plan → merchant → {MID, location} hierarchy
use super::value_objects::{ReconciliationStatus, ResourceStatus};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub plan_ref: Uuid,
    pub name: String,
    /// Sent to the reconciliation service as `loyalty_plan`
    pub slug: String,
    pub status: ResourceStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Merchant {
    pub merchant_ref: Uuid,
    pub plan_ref: Uuid,
    pub name: String,
    pub status: ResourceStatus,
}

/// The three MID-like resources share one shape; only primary MIDs carry a location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MidKind {
    PrimaryMid,
    SecondaryMid,
    Psimi,
}

impl MidKind {
    pub const ALL: [MidKind; 3] = [MidKind::PrimaryMid, MidKind::SecondaryMid, MidKind::Psimi];

    pub fn as_str(&self) -> &'static str {
        match self {
            MidKind::PrimaryMid => "primary_mid",
            MidKind::SecondaryMid => "secondary_mid",
            MidKind::Psimi => "psimi",
        }
    }

    /// Backing table for this kind
    pub fn table_name(&self) -> &'static str {
        match self {
            MidKind::PrimaryMid => "primary_mids",
            MidKind::SecondaryMid => "secondary_mids",
            MidKind::Psimi => "psimis",
        }
    }
}

impl fmt::Display for MidKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MidKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "primary_mid" => Ok(MidKind::PrimaryMid),
            "secondary_mid" => Ok(MidKind::SecondaryMid),
            "psimi" => Ok(MidKind::Psimi),
            _ => Err(format!("Invalid MID kind: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mid {
    pub mid_ref: Uuid,
    pub kind: MidKind,
    pub merchant_ref: Uuid,
    pub identifier: String,
    pub payment_scheme: String,
    pub location_ref: Option<Uuid>,
    pub status: ResourceStatus,
    pub reconciliation_status: ReconciliationStatus,
}

impl Mid {
    pub fn is_onboarded(&self) -> bool {
        self.reconciliation_status.is_onboarded()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub location_ref: Uuid,
    pub merchant_ref: Uuid,
    pub parent_ref: Option<Uuid>,
    /// External location identifier, sent as `location_id`
    pub location_id: String,
    pub name: String,
    pub status: ResourceStatus,
}

/// References to MID-like resources grouped by kind. Used as job payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MidRefs {
    #[serde(default)]
    pub primary_mid_refs: Vec<Uuid>,
    #[serde(default)]
    pub secondary_mid_refs: Vec<Uuid>,
    #[serde(default)]
    pub psimi_refs: Vec<Uuid>,
}

impl MidRefs {
    pub fn from_mids<'a>(mids: impl IntoIterator<Item = &'a Mid>) -> Self {
        let mut refs = Self::default();
        for mid in mids {
            refs.push(mid.kind, mid.mid_ref);
        }
        refs
    }

    /// Adds a reference, ignoring duplicates
    pub fn push(&mut self, kind: MidKind, mid_ref: Uuid) {
        let list = self.refs_mut(kind);
        if !list.contains(&mid_ref) {
            list.push(mid_ref);
        }
    }

    pub fn refs(&self, kind: MidKind) -> &[Uuid] {
        match kind {
            MidKind::PrimaryMid => &self.primary_mid_refs,
            MidKind::SecondaryMid => &self.secondary_mid_refs,
            MidKind::Psimi => &self.psimi_refs,
        }
    }

    fn refs_mut(&mut self, kind: MidKind) -> &mut Vec<Uuid> {
        match kind {
            MidKind::PrimaryMid => &mut self.primary_mid_refs,
            MidKind::SecondaryMid => &mut self.secondary_mid_refs,
            MidKind::Psimi => &mut self.psimi_refs,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (MidKind, Uuid)> + '_ {
        MidKind::ALL
            .into_iter()
            .flat_map(move |kind| self.refs(kind).iter().map(move |r| (kind, *r)))
    }

    pub fn len(&self) -> usize {
        self.primary_mid_refs.len() + self.secondary_mid_refs.len() + self.psimi_refs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
