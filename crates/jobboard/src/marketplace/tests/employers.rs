use std::sync::Arc;

use super::common::{
    marketplace, principal, publish, seed_employer, snapshot, world, Fault, FaultyStore,
};
use crate::marketplace::domain::{EmployerId, EntityKind, Principal, Role, UserId};
use crate::marketplace::error::MarketplaceError;
use crate::marketplace::store::DirectoryStore;

#[tokio::test]
async fn account_deletion_cascades_and_spares_seekers() {
    let world = world().await;
    let market = marketplace(world.store.clone());
    let application = market
        .applications
        .submit_application(&world.seeker_user.id, &world.posting.id)
        .await
        .expect("submission");

    let deletion = market
        .employers
        .delete_account(&principal(&world.employer_user), &world.employer_user.id)
        .await
        .expect("deletion");
    assert!(deletion.cascade_complete);
    assert_eq!(deletion.employer_id, Some(world.employer.id));
    let cascade = deletion.cascade.expect("cascade report");
    assert_eq!(cascade.postings, 1);
    assert_eq!(cascade.applications, 1);
    assert_eq!(cascade.chat_threads, 1);

    let state = snapshot(&world.store).await;
    assert!(state.clear_of(&world.employer.id));
    assert!(state.applications.iter().all(|row| row.id != application.id));
    assert!(world
        .store
        .user(&world.employer_user.id)
        .await
        .expect("lookup")
        .is_none());
    assert!(world
        .store
        .seeker(&world.seeker.id)
        .await
        .expect("lookup")
        .is_some());

    let listing = market
        .applications
        .applications_for_seeker(&world.seeker_user.id)
        .await
        .expect("seeker listing");
    assert!(listing.is_empty());
}

#[tokio::test]
async fn deleting_someone_elses_account_is_forbidden() {
    let world = world().await;
    let (rival_user, _) = seed_employer(&world.store, "Rita Rival").await;
    let market = marketplace(world.store.clone());

    match market
        .employers
        .delete_account(&principal(&rival_user), &world.employer_user.id)
        .await
    {
        Err(MarketplaceError::Forbidden) => {}
        other => panic!("expected forbidden, got {other:?}"),
    }
    assert!(world
        .store
        .employer(&world.employer.id)
        .await
        .expect("lookup")
        .is_some());
}

#[tokio::test]
async fn deleting_unknown_account_is_not_found() {
    let world = world().await;
    let market = marketplace(world.store.clone());
    let ghost = UserId::new();
    let caller = Principal {
        id: ghost,
        email: "ghost@example.test".to_string(),
        role: Role::Employer,
    };

    match market.employers.delete_account(&caller, &ghost).await {
        Err(MarketplaceError::NotFound(EntityKind::User)) => {}
        other => panic!("expected user not found, got {other:?}"),
    }
}

#[tokio::test]
async fn account_without_employer_profile_deletes_cleanly() {
    let world = world().await;
    let market = marketplace(world.store.clone());

    let deletion = market
        .employers
        .delete_account(&principal(&world.seeker_user), &world.seeker_user.id)
        .await
        .expect("deletion");
    assert!(deletion.cascade_complete);
    assert!(deletion.employer_id.is_none());
    assert!(deletion.cascade.is_none());
    assert_eq!(snapshot(&world.store).await.postings.len(), 1);
}

#[tokio::test]
async fn profile_lists_postings_in_publication_order() {
    let world = world().await;
    let market = marketplace(world.store.clone());
    market
        .employers
        .publish_posting(&world.employer_user.id, "  Line Cook ")
        .await
        .expect("publish");
    publish(&world.store, &world.employer, "Dishwasher").await;

    let profile = market
        .employers
        .profile(&world.employer_user.id)
        .await
        .expect("profile");
    assert_eq!(profile.employer_id, world.employer.id);
    assert_eq!(profile.name, "Erin Employer");
    assert_eq!(profile.role, Role::Employer);
    let titles: Vec<&str> = profile
        .job_postings
        .iter()
        .map(|headline| headline.job_post_title.as_str())
        .collect();
    assert_eq!(titles, ["Barista", "Line Cook", "Dishwasher"]);

    let by_id = market
        .employers
        .employer(&world.employer.id)
        .await
        .expect("lookup by id");
    assert_eq!(by_id, profile);
}

#[tokio::test]
async fn publishing_requires_employer_profile() {
    let world = world().await;
    let market = marketplace(world.store.clone());

    match market
        .employers
        .publish_posting(&world.seeker_user.id, "Barista")
        .await
    {
        Err(MarketplaceError::NotFound(EntityKind::Employer)) => {}
        other => panic!("expected employer not found, got {other:?}"),
    }
    assert_eq!(snapshot(&world.store).await.postings.len(), 1);
}

#[tokio::test]
async fn unknown_employer_lookup_is_not_found() {
    let world = world().await;
    let market = marketplace(world.store.clone());

    match market.employers.employer(&EmployerId::new()).await {
        Err(MarketplaceError::NotFound(EntityKind::Employer)) => {}
        other => panic!("expected employer not found, got {other:?}"),
    }
}

#[tokio::test]
async fn directory_skips_employers_without_user() {
    let world = world().await;
    let (rival_user, rival) = seed_employer(&world.store, "Rita Rival").await;
    let market = marketplace(world.store.clone());

    let all = market.employers.employers().await.expect("directory");
    assert_eq!(all.len(), 2);

    world
        .store
        .delete_user(&rival_user.id)
        .await
        .expect("user removed");
    let remaining = market.employers.employers().await.expect("directory");
    assert_eq!(remaining.len(), 1);
    assert!(remaining.iter().all(|profile| profile.employer_id != rival.id));
}

#[tokio::test]
async fn profile_removed_by_reconciliation_reports_incomplete_cascade() {
    let world = world().await;
    let store = Arc::new(FaultyStore::new(world.store.clone()));
    let market = marketplace(store.clone());
    market
        .applications
        .submit_application(&world.seeker_user.id, &world.posting.id)
        .await
        .expect("submission");

    store.arm(Fault::EmployerProfileTakenByReconcile);
    let deletion = market
        .employers
        .delete_account(&principal(&world.employer_user), &world.employer_user.id)
        .await
        .expect("user deletion stands");
    assert!(!store.armed(Fault::EmployerProfileTakenByReconcile));
    assert!(!deletion.cascade_complete);
    assert!(deletion.employer_id.is_none());
    assert!(deletion.cascade.is_none());

    let report = market.reconciler.reconcile().await.expect("reconcile");
    assert_eq!(report.orphaned_postings, 1);
    assert!(snapshot(&world.store).await.clear_of(&world.employer.id));
}
