/// Diesel-based implementation of ResourceRepository
///
/// Plans, merchants and locations use the query DSL. The three MID tables share a
/// shape and are addressed through raw SQL keyed by `MidKind::table_name`.
use super::models::{
    mid_select_sql, CountRow, LocationModel, MerchantModel, MidRow, PlanModel, RefRow,
};
use crate::modules::resources::domain::{
    Location, Merchant, Mid, MidKind, MidRefs, Plan, ReconciliationStatus, ResourceRepository,
    ResourceStatus,
};
use crate::schema::{locations, merchants, plans, secondary_mid_location_links};
use crate::shared::database::Database;
use crate::shared::errors::{AppError, AppResult};
use crate::shared::utils::logger::TimedOperation;
use crate::log_debug;
use async_trait::async_trait;
use chrono::Utc;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::sql_types::{Array, Nullable, Text, Uuid as SqlUuid};
use std::sync::Arc;
use uuid::Uuid;

pub struct ResourceRepositoryImpl {
    db: Arc<Database>,
}

impl ResourceRepositoryImpl {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    fn load_mids_by_ref(conn: &mut PgConnection, refs: &MidRefs) -> AppResult<Vec<Mid>> {
        let mut mids = Vec::with_capacity(refs.len());
        for kind in MidKind::ALL {
            let ids = refs.refs(kind);
            if ids.is_empty() {
                continue;
            }
            let rows: Vec<MidRow> =
                diesel::sql_query(format!("{} WHERE mid_ref = ANY($1)", mid_select_sql(kind)))
                    .bind::<Array<SqlUuid>, _>(ids.to_vec())
                    .load(conn)?;
            mids.extend(Self::rows_to_entities(rows)?);
        }
        Ok(mids)
    }

    fn rows_to_entities(rows: Vec<MidRow>) -> AppResult<Vec<Mid>> {
        rows.into_iter()
            .map(|row| row.into_entity().map_err(AppError::DatabaseError))
            .collect()
    }

    fn mark_mids_pending_in(
        conn: &mut PgConnection,
        merchant_ref: Uuid,
        refs: &MidRefs,
    ) -> AppResult<usize> {
        let mut updated = 0;
        for kind in MidKind::ALL {
            let ids = refs.refs(kind);
            if ids.is_empty() {
                continue;
            }
            updated += diesel::sql_query(format!(
                "UPDATE {} SET status = 'pending_deletion', updated_at = NOW() \
                 WHERE mid_ref = ANY($1) AND merchant_ref = $2 AND status <> 'deleted'",
                kind.table_name()
            ))
            .bind::<Array<SqlUuid>, _>(ids.to_vec())
            .bind::<SqlUuid, _>(merchant_ref)
            .execute(conn)?;
        }
        Ok(updated)
    }

    fn delete_merchant_tree_in(conn: &mut PgConnection, merchant_ref: Uuid) -> AppResult<()> {
        diesel::update(merchants::table.filter(merchants::merchant_ref.eq(merchant_ref)))
            .set((
                merchants::status.eq(ResourceStatus::Deleted),
                merchants::updated_at.eq(Utc::now()),
            ))
            .execute(conn)?;

        diesel::sql_query(
            "DELETE FROM secondary_mid_location_links WHERE secondary_mid_ref IN \
             (SELECT mid_ref FROM secondary_mids WHERE merchant_ref = $1)",
        )
        .bind::<SqlUuid, _>(merchant_ref)
        .execute(conn)?;

        for kind in MidKind::ALL {
            let detach = match kind {
                MidKind::PrimaryMid => ", location_ref = NULL",
                MidKind::SecondaryMid | MidKind::Psimi => "",
            };
            diesel::sql_query(format!(
                "UPDATE {} SET status = 'deleted', updated_at = NOW(){} WHERE merchant_ref = $1",
                kind.table_name(),
                detach
            ))
            .bind::<SqlUuid, _>(merchant_ref)
            .execute(conn)?;
        }

        diesel::update(locations::table.filter(locations::merchant_ref.eq(merchant_ref)))
            .set((
                locations::status.eq(ResourceStatus::Deleted),
                locations::updated_at.eq(Utc::now()),
            ))
            .execute(conn)?;

        Ok(())
    }
}

#[async_trait]
impl ResourceRepository for ResourceRepositoryImpl {
    async fn save_plan(&self, plan: &Plan) -> AppResult<Plan> {
        let model = PlanModel::from(plan);
        self.db
            .interact(move |conn| {
                let saved: PlanModel = diesel::insert_into(plans::table)
                    .values(&model)
                    .on_conflict(plans::plan_ref)
                    .do_update()
                    .set((&model, plans::updated_at.eq(Utc::now())))
                    .returning(PlanModel::as_returning())
                    .get_result(conn)?;
                Ok(saved.into())
            })
            .await
    }

    async fn save_merchant(&self, merchant: &Merchant) -> AppResult<Merchant> {
        let model = MerchantModel::from(merchant);
        self.db
            .interact(move |conn| {
                let saved: MerchantModel = diesel::insert_into(merchants::table)
                    .values(&model)
                    .on_conflict(merchants::merchant_ref)
                    .do_update()
                    .set((&model, merchants::updated_at.eq(Utc::now())))
                    .returning(MerchantModel::as_returning())
                    .get_result(conn)?;
                Ok(saved.into())
            })
            .await
    }

    async fn save_mid(&self, mid: &Mid) -> AppResult<Mid> {
        let mid = mid.clone();
        self.db
            .interact(move |conn| {
                let table = mid.kind.table_name();
                match mid.kind {
                    MidKind::PrimaryMid => {
                        diesel::sql_query(format!(
                            "INSERT INTO {} (mid_ref, merchant_ref, identifier, payment_scheme, \
                             status, reconciliation_status, location_ref) \
                             VALUES ($1, $2, $3, $4, $5, $6, $7) \
                             ON CONFLICT (mid_ref) DO UPDATE SET \
                             merchant_ref = EXCLUDED.merchant_ref, identifier = EXCLUDED.identifier, \
                             payment_scheme = EXCLUDED.payment_scheme, status = EXCLUDED.status, \
                             reconciliation_status = EXCLUDED.reconciliation_status, \
                             location_ref = EXCLUDED.location_ref, updated_at = NOW()",
                            table
                        ))
                        .bind::<SqlUuid, _>(mid.mid_ref)
                        .bind::<SqlUuid, _>(mid.merchant_ref)
                        .bind::<Text, _>(&mid.identifier)
                        .bind::<Text, _>(&mid.payment_scheme)
                        .bind::<crate::schema::sql_types::ResourceStatus, _>(mid.status)
                        .bind::<crate::schema::sql_types::ReconciliationStatus, _>(
                            mid.reconciliation_status,
                        )
                        .bind::<Nullable<SqlUuid>, _>(mid.location_ref)
                        .execute(conn)?;
                    }
                    MidKind::SecondaryMid | MidKind::Psimi => {
                        diesel::sql_query(format!(
                            "INSERT INTO {} (mid_ref, merchant_ref, identifier, payment_scheme, \
                             status, reconciliation_status) \
                             VALUES ($1, $2, $3, $4, $5, $6) \
                             ON CONFLICT (mid_ref) DO UPDATE SET \
                             merchant_ref = EXCLUDED.merchant_ref, identifier = EXCLUDED.identifier, \
                             payment_scheme = EXCLUDED.payment_scheme, status = EXCLUDED.status, \
                             reconciliation_status = EXCLUDED.reconciliation_status, \
                             updated_at = NOW()",
                            table
                        ))
                        .bind::<SqlUuid, _>(mid.mid_ref)
                        .bind::<SqlUuid, _>(mid.merchant_ref)
                        .bind::<Text, _>(&mid.identifier)
                        .bind::<Text, _>(&mid.payment_scheme)
                        .bind::<crate::schema::sql_types::ResourceStatus, _>(mid.status)
                        .bind::<crate::schema::sql_types::ReconciliationStatus, _>(
                            mid.reconciliation_status,
                        )
                        .execute(conn)?;
                    }
                }

                Self::load_mids_by_ref(conn, &MidRefs::from_mids([&mid]))?
                    .into_iter()
                    .next()
                    .ok_or_else(|| AppError::DatabaseError(format!("MID {} not saved", mid.mid_ref)))
            })
            .await
    }

    async fn save_location(&self, location: &Location) -> AppResult<Location> {
        let model = LocationModel::from(location);
        self.db
            .interact(move |conn| {
                let saved: LocationModel = diesel::insert_into(locations::table)
                    .values(&model)
                    .on_conflict(locations::location_ref)
                    .do_update()
                    .set((&model, locations::updated_at.eq(Utc::now())))
                    .returning(LocationModel::as_returning())
                    .get_result(conn)?;
                Ok(saved.into())
            })
            .await
    }

    async fn link_secondary_mid_location(
        &self,
        secondary_mid_ref: Uuid,
        location_ref: Uuid,
    ) -> AppResult<()> {
        self.db
            .interact(move |conn| {
                diesel::insert_into(secondary_mid_location_links::table)
                    .values((
                        secondary_mid_location_links::link_ref.eq(Uuid::new_v4()),
                        secondary_mid_location_links::secondary_mid_ref.eq(secondary_mid_ref),
                        secondary_mid_location_links::location_ref.eq(location_ref),
                    ))
                    .on_conflict((
                        secondary_mid_location_links::secondary_mid_ref,
                        secondary_mid_location_links::location_ref,
                    ))
                    .do_nothing()
                    .execute(conn)?;
                Ok(())
            })
            .await
    }

    async fn get_plan(&self, plan_ref: Uuid) -> AppResult<Option<Plan>> {
        self.db
            .interact(move |conn| {
                let plan = plans::table
                    .find(plan_ref)
                    .select(PlanModel::as_select())
                    .first(conn)
                    .optional()?;
                Ok(plan.map(Plan::from))
            })
            .await
    }

    async fn get_merchant(&self, merchant_ref: Uuid) -> AppResult<Option<Merchant>> {
        self.db
            .interact(move |conn| {
                let merchant = merchants::table
                    .find(merchant_ref)
                    .select(MerchantModel::as_select())
                    .first(conn)
                    .optional()?;
                Ok(merchant.map(Merchant::from))
            })
            .await
    }

    async fn get_location(&self, location_ref: Uuid) -> AppResult<Option<Location>> {
        self.db
            .interact(move |conn| {
                let location = locations::table
                    .find(location_ref)
                    .select(LocationModel::as_select())
                    .first(conn)
                    .optional()?;
                Ok(location.map(Location::from))
            })
            .await
    }

    async fn list_merchants(&self, plan_ref: Uuid) -> AppResult<Vec<Merchant>> {
        self.db
            .interact(move |conn| {
                let rows = merchants::table
                    .filter(merchants::plan_ref.eq(plan_ref))
                    .select(MerchantModel::as_select())
                    .load(conn)?;
                Ok(rows.into_iter().map(Merchant::from).collect())
            })
            .await
    }

    async fn list_locations(&self, merchant_ref: Uuid) -> AppResult<Vec<Location>> {
        self.db
            .interact(move |conn| {
                let rows = locations::table
                    .filter(locations::merchant_ref.eq(merchant_ref))
                    .select(LocationModel::as_select())
                    .load(conn)?;
                Ok(rows.into_iter().map(Location::from).collect())
            })
            .await
    }

    async fn list_mids(&self, merchant_ref: Uuid) -> AppResult<Vec<Mid>> {
        self.db
            .interact(move |conn| {
                let sql = MidKind::ALL
                    .iter()
                    .map(|kind| format!("{} WHERE merchant_ref = $1", mid_select_sql(*kind)))
                    .collect::<Vec<_>>()
                    .join(" UNION ALL ");
                let rows: Vec<MidRow> = diesel::sql_query(sql)
                    .bind::<SqlUuid, _>(merchant_ref)
                    .load(conn)?;
                Self::rows_to_entities(rows)
            })
            .await
    }

    async fn get_mids(&self, refs: &MidRefs) -> AppResult<Vec<Mid>> {
        let refs = refs.clone();
        self.db
            .interact(move |conn| Self::load_mids_by_ref(conn, &refs))
            .await
    }

    async fn secondary_mid_locations(&self, secondary_mid_ref: Uuid) -> AppResult<Vec<Uuid>> {
        self.db
            .interact(move |conn| {
                let refs = secondary_mid_location_links::table
                    .filter(secondary_mid_location_links::secondary_mid_ref.eq(secondary_mid_ref))
                    .select(secondary_mid_location_links::location_ref)
                    .load::<Uuid>(conn)?;
                Ok(refs)
            })
            .await
    }

    async fn count_onboarded_mids(&self, merchant_ref: Uuid) -> AppResult<i64> {
        self.db
            .interact(move |conn| {
                let inner = MidKind::ALL
                    .iter()
                    .map(|kind| {
                        format!(
                            "SELECT mid_ref FROM {} WHERE merchant_ref = $1 \
                             AND status <> 'deleted' AND reconciliation_status = 'onboarded'",
                            kind.table_name()
                        )
                    })
                    .collect::<Vec<_>>()
                    .join(" UNION ALL ");
                let row: CountRow =
                    diesel::sql_query(format!("SELECT COUNT(*) AS count FROM ({}) onboarded", inner))
                        .bind::<SqlUuid, _>(merchant_ref)
                        .get_result(conn)?;
                Ok(row.count)
            })
            .await
    }

    async fn set_reconciliation_status(
        &self,
        refs: &MidRefs,
        status: ReconciliationStatus,
    ) -> AppResult<usize> {
        let refs = refs.clone();
        self.db
            .interact(move |conn| {
                let mut updated = 0;
                for kind in MidKind::ALL {
                    let ids = refs.refs(kind);
                    if ids.is_empty() {
                        continue;
                    }
                    updated += diesel::sql_query(format!(
                        "UPDATE {} SET reconciliation_status = $2, updated_at = NOW() \
                         WHERE mid_ref = ANY($1) AND status <> 'deleted'",
                        kind.table_name()
                    ))
                    .bind::<Array<SqlUuid>, _>(ids.to_vec())
                    .bind::<crate::schema::sql_types::ReconciliationStatus, _>(status)
                    .execute(conn)?;
                }
                Ok(updated)
            })
            .await
    }

    async fn mark_mids_pending_deletion(
        &self,
        merchant_ref: Uuid,
        refs: &MidRefs,
    ) -> AppResult<usize> {
        let refs = refs.clone();
        self.db
            .interact(move |conn| Self::mark_mids_pending_in(conn, merchant_ref, &refs))
            .await
    }

    async fn delete_mids(&self, refs: &MidRefs) -> AppResult<usize> {
        let refs = refs.clone();
        self.db
            .interact(move |conn| {
                conn.transaction::<usize, AppError, _>(|conn| {
                    let mut deleted = 0;
                    for kind in MidKind::ALL {
                        let ids = refs.refs(kind);
                        if ids.is_empty() {
                            continue;
                        }
                        let detach = match kind {
                            MidKind::PrimaryMid => ", location_ref = NULL",
                            MidKind::SecondaryMid | MidKind::Psimi => "",
                        };
                        deleted += diesel::sql_query(format!(
                            "UPDATE {} SET status = 'deleted', \
                             reconciliation_status = CASE WHEN reconciliation_status = 'onboarded' \
                             THEN 'offboarded'::reconciliation_status ELSE reconciliation_status END, \
                             updated_at = NOW(){} WHERE mid_ref = ANY($1)",
                            kind.table_name(),
                            detach
                        ))
                        .bind::<Array<SqlUuid>, _>(ids.to_vec())
                        .execute(conn)?;

                        if kind == MidKind::SecondaryMid {
                            diesel::delete(
                                secondary_mid_location_links::table.filter(
                                    secondary_mid_location_links::secondary_mid_ref
                                        .eq_any(ids.to_vec()),
                                ),
                            )
                            .execute(conn)?;
                        }
                    }
                    Ok(deleted)
                })
            })
            .await
    }

    async fn mark_merchant_pending_deletion(
        &self,
        merchant_ref: Uuid,
        mids: &MidRefs,
    ) -> AppResult<()> {
        let mids = mids.clone();
        self.db
            .interact(move |conn| {
                conn.transaction::<(), AppError, _>(|conn| {
                    diesel::update(
                        merchants::table
                            .filter(merchants::merchant_ref.eq(merchant_ref))
                            .filter(merchants::status.ne(ResourceStatus::Deleted)),
                    )
                    .set((
                        merchants::status.eq(ResourceStatus::PendingDeletion),
                        merchants::updated_at.eq(Utc::now()),
                    ))
                    .execute(conn)?;

                    let marked = Self::mark_mids_pending_in(conn, merchant_ref, &mids)?;
                    log_debug!(
                        "Merchant {} pending deletion with {} MIDs awaiting offboarding",
                        merchant_ref,
                        marked
                    );
                    Ok(())
                })
            })
            .await
    }

    async fn mark_plan_pending_deletion(&self, plan_ref: Uuid) -> AppResult<Vec<Uuid>> {
        self.db
            .interact(move |conn| {
                conn.transaction::<Vec<Uuid>, AppError, _>(|conn| {
                    diesel::update(
                        plans::table
                            .filter(plans::plan_ref.eq(plan_ref))
                            .filter(plans::status.ne(ResourceStatus::Deleted)),
                    )
                    .set((
                        plans::status.eq(ResourceStatus::PendingDeletion),
                        plans::updated_at.eq(Utc::now()),
                    ))
                    .execute(conn)?;

                    let pending = diesel::update(
                        merchants::table
                            .filter(merchants::plan_ref.eq(plan_ref))
                            .filter(merchants::status.ne(ResourceStatus::Deleted)),
                    )
                    .set((
                        merchants::status.eq(ResourceStatus::PendingDeletion),
                        merchants::updated_at.eq(Utc::now()),
                    ))
                    .returning(merchants::merchant_ref)
                    .get_results::<Uuid>(conn)?;

                    Ok(pending)
                })
            })
            .await
    }

    async fn delete_merchant_tree(&self, merchant_ref: Uuid) -> AppResult<()> {
        self.db
            .interact(move |conn| {
                let timer = TimedOperation::new("delete_merchant_tree");
                conn.transaction::<(), AppError, _>(|conn| {
                    Self::delete_merchant_tree_in(conn, merchant_ref)
                })?;
                timer.finish_with_info(&merchant_ref.to_string());
                Ok(())
            })
            .await
    }

    async fn delete_plan_tree(&self, plan_ref: Uuid) -> AppResult<()> {
        self.db
            .interact(move |conn| {
                let timer = TimedOperation::new("delete_plan_tree");
                conn.transaction::<(), AppError, _>(|conn| {
                    let merchant_refs = merchants::table
                        .filter(merchants::plan_ref.eq(plan_ref))
                        .select(merchants::merchant_ref)
                        .load::<Uuid>(conn)?;

                    for merchant_ref in merchant_refs {
                        Self::delete_merchant_tree_in(conn, merchant_ref)?;
                    }

                    diesel::update(plans::table.filter(plans::plan_ref.eq(plan_ref)))
                        .set((
                            plans::status.eq(ResourceStatus::Deleted),
                            plans::updated_at.eq(Utc::now()),
                        ))
                        .execute(conn)?;
                    Ok(())
                })?;
                timer.finish_with_info(&plan_ref.to_string());
                Ok(())
            })
            .await
    }

    async fn delete_location(&self, merchant_ref: Uuid, location_ref: Uuid) -> AppResult<usize> {
        self.db
            .interact(move |conn| {
                conn.transaction::<usize, AppError, _>(|conn| {
                    let deleted: Vec<RefRow> = diesel::sql_query(
                        "WITH RECURSIVE subtree AS ( \
                             SELECT location_ref FROM locations \
                             WHERE location_ref = $1 AND merchant_ref = $2 \
                             UNION \
                             SELECT l.location_ref FROM locations l \
                             JOIN subtree s ON l.parent_ref = s.location_ref \
                         ) \
                         UPDATE locations SET status = 'deleted', updated_at = NOW() \
                         WHERE location_ref IN (SELECT location_ref FROM subtree) \
                         RETURNING location_ref AS resource_ref",
                    )
                    .bind::<SqlUuid, _>(location_ref)
                    .bind::<SqlUuid, _>(merchant_ref)
                    .load(conn)?;

                    let refs: Vec<Uuid> = deleted.into_iter().map(|r| r.resource_ref).collect();
                    if refs.is_empty() {
                        return Ok(0);
                    }

                    diesel::sql_query(
                        "UPDATE primary_mids SET location_ref = NULL, updated_at = NOW() \
                         WHERE location_ref = ANY($1)",
                    )
                    .bind::<Array<SqlUuid>, _>(refs.clone())
                    .execute(conn)?;

                    diesel::delete(
                        secondary_mid_location_links::table
                            .filter(secondary_mid_location_links::location_ref.eq_any(refs.clone())),
                    )
                    .execute(conn)?;

                    Ok(refs.len())
                })
            })
            .await
    }
}
