/// Resource repository tests - Postgres operations
///
/// Tests cover:
/// - Upserts across the hierarchy
/// - MID lookups by kind
/// - Transactional cascade updates
/// - Recursive location deletion
///
/// Require TEST_DATABASE_URL; run with `cargo test -- --ignored`.
mod utils;

use merchant_cascade::modules::resources::{
    Merchant, MidRefs, Plan, ReconciliationStatus, ResourceRepository, ResourceRepositoryImpl,
    ResourceStatus,
};
use utils::db;
use utils::factories::{LocationFactory, MerchantFactory, MidFactory, PlanFactory};

fn repo() -> ResourceRepositoryImpl {
    ResourceRepositoryImpl::new(db::test_database())
}

async fn seed_merchant(repo: &ResourceRepositoryImpl) -> (Plan, Merchant) {
    let plan = repo.save_plan(&PlanFactory::new().build()).await.unwrap();
    let merchant = repo
        .save_merchant(&MerchantFactory::for_plan(&plan).build())
        .await
        .unwrap();
    (plan, merchant)
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn saves_and_reads_the_hierarchy() {
    let _guard = db::acquire_test_lock();
    db::clean_test_db();
    let repo = repo();

    let (plan, merchant) = seed_merchant(&repo).await;
    let location = repo
        .save_location(&LocationFactory::for_merchant(&merchant).build())
        .await
        .unwrap();
    let primary = repo
        .save_mid(&MidFactory::primary(&merchant).at_location(&location).build())
        .await
        .unwrap();
    let psimi = repo
        .save_mid(&MidFactory::psimi(&merchant).onboarded().build())
        .await
        .unwrap();

    assert_eq!(repo.get_plan(plan.plan_ref).await.unwrap(), Some(plan.clone()));
    assert_eq!(repo.list_merchants(plan.plan_ref).await.unwrap(), vec![merchant.clone()]);
    assert_eq!(repo.list_locations(merchant.merchant_ref).await.unwrap(), vec![location]);

    let mids = repo.list_mids(merchant.merchant_ref).await.unwrap();
    assert_eq!(mids.len(), 2);
    assert!(mids.contains(&primary));
    assert!(mids.contains(&psimi));
    assert_eq!(repo.count_onboarded_mids(merchant.merchant_ref).await.unwrap(), 1);
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn save_plan_updates_existing_row() {
    let _guard = db::acquire_test_lock();
    db::clean_test_db();
    let repo = repo();

    let mut plan = repo.save_plan(&PlanFactory::new().build()).await.unwrap();
    plan.slug = "renamed".to_string();
    repo.save_plan(&plan).await.unwrap();

    let stored = repo.get_plan(plan.plan_ref).await.unwrap().unwrap();
    assert_eq!(stored.slug, "renamed");
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn get_mids_matches_kind() {
    let _guard = db::acquire_test_lock();
    db::clean_test_db();
    let repo = repo();

    let (_, merchant) = seed_merchant(&repo).await;
    let secondary = repo
        .save_mid(&MidFactory::secondary(&merchant).build())
        .await
        .unwrap();

    let mut wrong_kind = MidRefs::default();
    wrong_kind.psimi_refs.push(secondary.mid_ref);
    assert!(repo.get_mids(&wrong_kind).await.unwrap().is_empty());

    let found = repo.get_mids(&MidRefs::from_mids([&secondary])).await.unwrap();
    assert_eq!(found, vec![secondary]);
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn delete_mids_offboards_and_detaches() {
    let _guard = db::acquire_test_lock();
    db::clean_test_db();
    let repo = repo();

    let (_, merchant) = seed_merchant(&repo).await;
    let location = repo
        .save_location(&LocationFactory::for_merchant(&merchant).build())
        .await
        .unwrap();
    let primary = repo
        .save_mid(&MidFactory::primary(&merchant).onboarded().at_location(&location).build())
        .await
        .unwrap();
    let secondary = repo
        .save_mid(&MidFactory::secondary(&merchant).build())
        .await
        .unwrap();
    repo.link_secondary_mid_location(secondary.mid_ref, location.location_ref)
        .await
        .unwrap();

    let deleted = repo
        .delete_mids(&MidRefs::from_mids([&primary, &secondary]))
        .await
        .unwrap();
    assert_eq!(deleted, 2);

    let after = repo
        .get_mids(&MidRefs::from_mids([&primary, &secondary]))
        .await
        .unwrap();
    for mid in &after {
        assert_eq!(mid.status, ResourceStatus::Deleted);
        assert_eq!(mid.location_ref, None);
    }
    let primary_after = after.iter().find(|m| m.mid_ref == primary.mid_ref).unwrap();
    assert_eq!(primary_after.reconciliation_status, ReconciliationStatus::Offboarded);
    let secondary_after = after.iter().find(|m| m.mid_ref == secondary.mid_ref).unwrap();
    assert_eq!(secondary_after.reconciliation_status, ReconciliationStatus::NotOnboarded);
    assert!(repo
        .secondary_mid_locations(secondary.mid_ref)
        .await
        .unwrap()
        .is_empty());
    assert_eq!(repo.count_onboarded_mids(merchant.merchant_ref).await.unwrap(), 0);
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn mark_plan_pending_deletion_skips_deleted_merchants() {
    let _guard = db::acquire_test_lock();
    db::clean_test_db();
    let repo = repo();

    let (plan, live) = seed_merchant(&repo).await;
    let gone = repo
        .save_merchant(
            &MerchantFactory::for_plan(&plan)
                .with_status(ResourceStatus::Deleted)
                .build(),
        )
        .await
        .unwrap();

    let pending = repo.mark_plan_pending_deletion(plan.plan_ref).await.unwrap();

    assert_eq!(pending, vec![live.merchant_ref]);
    assert_eq!(
        repo.get_plan(plan.plan_ref).await.unwrap().unwrap().status,
        ResourceStatus::PendingDeletion
    );
    assert_eq!(
        repo.get_merchant(gone.merchant_ref).await.unwrap().unwrap().status,
        ResourceStatus::Deleted
    );
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn mark_merchant_pending_deletion_marks_given_mids() {
    let _guard = db::acquire_test_lock();
    db::clean_test_db();
    let repo = repo();

    let (_, merchant) = seed_merchant(&repo).await;
    let onboarded = repo
        .save_mid(&MidFactory::primary(&merchant).onboarded().build())
        .await
        .unwrap();
    let idle = repo
        .save_mid(&MidFactory::primary(&merchant).build())
        .await
        .unwrap();

    repo.mark_merchant_pending_deletion(merchant.merchant_ref, &MidRefs::from_mids([&onboarded]))
        .await
        .unwrap();

    let merchant_after = repo.get_merchant(merchant.merchant_ref).await.unwrap().unwrap();
    assert_eq!(merchant_after.status, ResourceStatus::PendingDeletion);
    let mids = repo.list_mids(merchant.merchant_ref).await.unwrap();
    let status_of = |r: uuid::Uuid| mids.iter().find(|m| m.mid_ref == r).unwrap().status;
    assert_eq!(status_of(onboarded.mid_ref), ResourceStatus::PendingDeletion);
    assert_eq!(status_of(idle.mid_ref), ResourceStatus::Active);
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn delete_plan_tree_deletes_everything_below() {
    let _guard = db::acquire_test_lock();
    db::clean_test_db();
    let repo = repo();

    let (plan, merchant) = seed_merchant(&repo).await;
    let mid = repo
        .save_mid(&MidFactory::psimi(&merchant).build())
        .await
        .unwrap();
    let location = repo
        .save_location(&LocationFactory::for_merchant(&merchant).build())
        .await
        .unwrap();

    repo.delete_plan_tree(plan.plan_ref).await.unwrap();

    assert_eq!(
        repo.get_plan(plan.plan_ref).await.unwrap().unwrap().status,
        ResourceStatus::Deleted
    );
    assert_eq!(
        repo.get_merchant(merchant.merchant_ref).await.unwrap().unwrap().status,
        ResourceStatus::Deleted
    );
    assert_eq!(
        repo.get_mids(&MidRefs::from_mids([&mid])).await.unwrap()[0].status,
        ResourceStatus::Deleted
    );
    assert_eq!(
        repo.get_location(location.location_ref).await.unwrap().unwrap().status,
        ResourceStatus::Deleted
    );
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn delete_location_walks_sub_locations() {
    let _guard = db::acquire_test_lock();
    db::clean_test_db();
    let repo = repo();

    let (_, merchant) = seed_merchant(&repo).await;
    let root = repo
        .save_location(&LocationFactory::for_merchant(&merchant).build())
        .await
        .unwrap();
    let child = repo
        .save_location(&LocationFactory::for_merchant(&merchant).child_of(&root).build())
        .await
        .unwrap();
    let grandchild = repo
        .save_location(&LocationFactory::for_merchant(&merchant).child_of(&child).build())
        .await
        .unwrap();
    let other = repo
        .save_location(&LocationFactory::for_merchant(&merchant).build())
        .await
        .unwrap();
    let mid = repo
        .save_mid(&MidFactory::primary(&merchant).at_location(&grandchild).build())
        .await
        .unwrap();

    let removed = repo
        .delete_location(merchant.merchant_ref, root.location_ref)
        .await
        .unwrap();

    assert_eq!(removed, 3);
    for location in [&root, &child, &grandchild] {
        assert_eq!(
            repo.get_location(location.location_ref).await.unwrap().unwrap().status,
            ResourceStatus::Deleted
        );
    }
    assert_eq!(
        repo.get_location(other.location_ref).await.unwrap().unwrap().status,
        ResourceStatus::Active
    );
    let mid_after = &repo.get_mids(&MidRefs::from_mids([&mid])).await.unwrap()[0];
    assert_eq!(mid_after.location_ref, None);
    assert_eq!(mid_after.status, ResourceStatus::Active);
}
