/// Diesel models for the resource hierarchy tables
use crate::modules::resources::domain::{
    Location, Merchant, Mid, MidKind, Plan, ReconciliationStatus, ResourceStatus,
};
use crate::schema::{locations, merchants, plans};
use diesel::prelude::*;
use diesel::sql_types::{Nullable, Text, Uuid as SqlUuid};
use uuid::Uuid;

#[derive(Queryable, Selectable, Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = plans)]
#[diesel(primary_key(plan_ref))]
pub struct PlanModel {
    pub plan_ref: Uuid,
    pub name: String,
    pub slug: String,
    pub status: ResourceStatus,
}

impl From<&Plan> for PlanModel {
    fn from(plan: &Plan) -> Self {
        Self {
            plan_ref: plan.plan_ref,
            name: plan.name.clone(),
            slug: plan.slug.clone(),
            status: plan.status,
        }
    }
}

impl From<PlanModel> for Plan {
    fn from(model: PlanModel) -> Self {
        Self {
            plan_ref: model.plan_ref,
            name: model.name,
            slug: model.slug,
            status: model.status,
        }
    }
}

#[derive(Queryable, Selectable, Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = merchants)]
#[diesel(primary_key(merchant_ref))]
pub struct MerchantModel {
    pub merchant_ref: Uuid,
    pub plan_ref: Uuid,
    pub name: String,
    pub status: ResourceStatus,
}

impl From<&Merchant> for MerchantModel {
    fn from(merchant: &Merchant) -> Self {
        Self {
            merchant_ref: merchant.merchant_ref,
            plan_ref: merchant.plan_ref,
            name: merchant.name.clone(),
            status: merchant.status,
        }
    }
}

impl From<MerchantModel> for Merchant {
    fn from(model: MerchantModel) -> Self {
        Self {
            merchant_ref: model.merchant_ref,
            plan_ref: model.plan_ref,
            name: model.name,
            status: model.status,
        }
    }
}

#[derive(Queryable, Selectable, Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = locations)]
#[diesel(primary_key(location_ref))]
#[diesel(treat_none_as_null = true)]
pub struct LocationModel {
    pub location_ref: Uuid,
    pub merchant_ref: Uuid,
    pub parent_ref: Option<Uuid>,
    pub location_id: String,
    pub name: String,
    pub status: ResourceStatus,
}

impl From<&Location> for LocationModel {
    fn from(location: &Location) -> Self {
        Self {
            location_ref: location.location_ref,
            merchant_ref: location.merchant_ref,
            parent_ref: location.parent_ref,
            location_id: location.location_id.clone(),
            name: location.name.clone(),
            status: location.status,
        }
    }
}

impl From<LocationModel> for Location {
    fn from(model: LocationModel) -> Self {
        Self {
            location_ref: model.location_ref,
            merchant_ref: model.merchant_ref,
            parent_ref: model.parent_ref,
            location_id: model.location_id,
            name: model.name,
            status: model.status,
        }
    }
}

/// One row of any MID-like table, selected through `mid_select_sql`
#[derive(QueryableByName, Debug, Clone)]
pub struct MidRow {
    #[diesel(sql_type = SqlUuid)]
    pub mid_ref: Uuid,
    #[diesel(sql_type = Text)]
    pub kind: String,
    #[diesel(sql_type = SqlUuid)]
    pub merchant_ref: Uuid,
    #[diesel(sql_type = Text)]
    pub identifier: String,
    #[diesel(sql_type = Text)]
    pub payment_scheme: String,
    #[diesel(sql_type = Nullable<SqlUuid>)]
    pub location_ref: Option<Uuid>,
    #[diesel(sql_type = crate::schema::sql_types::ResourceStatus)]
    pub status: ResourceStatus,
    #[diesel(sql_type = crate::schema::sql_types::ReconciliationStatus)]
    pub reconciliation_status: ReconciliationStatus,
}

impl MidRow {
    pub fn into_entity(self) -> Result<Mid, String> {
        Ok(Mid {
            mid_ref: self.mid_ref,
            kind: self.kind.parse()?,
            merchant_ref: self.merchant_ref,
            identifier: self.identifier,
            payment_scheme: self.payment_scheme,
            location_ref: self.location_ref,
            status: self.status,
            reconciliation_status: self.reconciliation_status,
        })
    }
}

#[derive(QueryableByName, Debug)]
pub struct RefRow {
    #[diesel(sql_type = SqlUuid)]
    pub resource_ref: Uuid,
}

#[derive(QueryableByName, Debug)]
pub struct CountRow {
    #[diesel(sql_type = diesel::sql_types::BigInt)]
    pub count: i64,
}

/// SELECT over one MID table producing `MidRow` columns.
/// Only primary MIDs have a location column.
pub fn mid_select_sql(kind: MidKind) -> String {
    let location = match kind {
        MidKind::PrimaryMid => "location_ref",
        MidKind::SecondaryMid | MidKind::Psimi => "NULL::uuid",
    };
    format!(
        "SELECT mid_ref, '{}'::text AS kind, merchant_ref, identifier, payment_scheme, \
         {} AS location_ref, status, reconciliation_status FROM {}",
        kind.as_str(),
        location,
        kind.table_name()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mid_select_only_reads_location_for_primary_mids() {
        assert!(mid_select_sql(MidKind::PrimaryMid).contains("location_ref AS location_ref"));
        assert!(mid_select_sql(MidKind::Psimi).contains("NULL::uuid AS location_ref"));
        assert!(mid_select_sql(MidKind::SecondaryMid).ends_with("FROM secondary_mids"));
    }

    #[test]
    fn mid_row_rejects_unknown_kind() {
        let row = MidRow {
            mid_ref: Uuid::new_v4(),
            kind: "tertiary_mid".to_string(),
            merchant_ref: Uuid::new_v4(),
            identifier: "1".to_string(),
            payment_scheme: "visa".to_string(),
            location_ref: None,
            status: ResourceStatus::Active,
            reconciliation_status: ReconciliationStatus::NotOnboarded,
        };
        assert!(row.into_entity().is_err());
    }
}
