//! Store creation against the in-memory ledger: charging, refunds and
//! concurrent spending.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use tokio::task::JoinSet;

use vitrine_admin::services::{NewStoreRequest, StoreCreationError, StoreProvisioner};
use vitrine_core::{Credits, OwnerId, STORE_CREATION_COST};
use vitrine_integration_tests::MemoryLedger;

fn request(name: &str) -> NewStoreRequest {
    NewStoreRequest {
        name: name.to_owned(),
        slug: None,
        contact_email: "owner@shop.test".to_owned(),
        access_username: None,
        access_password: None,
    }
}

fn credits(amount: i64) -> Credits {
    Credits::new(amount).unwrap()
}

#[tokio::test]
async fn test_store_creation_debits_balance() {
    let owner = OwnerId::generate();
    let ledger = MemoryLedger::new().with_owner(owner, 75);
    let provisioner = StoreProvisioner::new(ledger.clone());

    let store = provisioner
        .create_store(owner, request("Corner Shop"))
        .await
        .unwrap();

    assert_eq!(store.slug.as_str(), "corner-shop");
    assert_eq!(store.owner_id, owner);
    assert_eq!(ledger.balance(owner), Some(credits(25)));
    assert_eq!(ledger.stores().len(), 1);
}

#[tokio::test]
async fn test_exact_cost_is_accepted() {
    let owner = OwnerId::generate();
    let ledger = MemoryLedger::new().with_owner(owner, 50);
    let provisioner = StoreProvisioner::new(ledger.clone());

    provisioner
        .create_store(owner, request("Corner Shop"))
        .await
        .unwrap();

    assert_eq!(ledger.balance(owner), Some(Credits::ZERO));
    assert_eq!(ledger.stores().len(), 1);
}

#[tokio::test]
async fn test_one_credit_short_is_refused() {
    let owner = OwnerId::generate();
    let ledger = MemoryLedger::new().with_owner(owner, 49);
    let provisioner = StoreProvisioner::new(ledger.clone());

    let err = provisioner
        .create_store(owner, request("Corner Shop"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        StoreCreationError::InsufficientCredits { balance, shortfall, .. }
            if balance == credits(49) && shortfall == credits(1)
    ));
    assert_eq!(ledger.balance(owner), Some(credits(49)));
    assert!(ledger.stores().is_empty());
}

#[tokio::test]
async fn test_repeated_refusals_change_nothing() {
    let owner = OwnerId::generate();
    let ledger = MemoryLedger::new().with_owner(owner, 30);
    let provisioner = StoreProvisioner::new(ledger.clone());

    for attempt in 0..3 {
        let err = provisioner
            .create_store(owner, request(&format!("Shop {attempt}")))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreCreationError::InsufficientCredits { .. }));
        assert_eq!(ledger.balance(owner), Some(credits(30)));
        assert!(ledger.stores().is_empty());
    }
    assert_eq!(ledger.refund_attempts(), 0);
}

#[tokio::test]
async fn test_failed_debit_creates_nothing() {
    let owner = OwnerId::generate();
    let ledger = MemoryLedger::new().with_owner(owner, 80);
    ledger.fail_debits();
    let provisioner = StoreProvisioner::new(ledger.clone());

    let err = provisioner
        .create_store(owner, request("Corner Shop"))
        .await
        .unwrap_err();

    assert!(matches!(err, StoreCreationError::CreditDeductionFailed(_)));
    assert_eq!(ledger.balance(owner), Some(credits(80)));
    assert!(ledger.stores().is_empty());
    assert_eq!(ledger.refund_attempts(), 0);
}

#[tokio::test]
async fn test_first_visit_creates_empty_profile() {
    let owner = OwnerId::generate();
    let ledger = MemoryLedger::new();
    let provisioner = StoreProvisioner::new(ledger.clone());

    let err = provisioner
        .create_store(owner, request("Corner Shop"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        StoreCreationError::InsufficientCredits { balance, shortfall, .. }
            if balance == Credits::ZERO && shortfall == STORE_CREATION_COST
    ));
    assert_eq!(ledger.balance(owner), Some(Credits::ZERO));
}

#[tokio::test]
async fn test_taken_slug_costs_nothing() {
    let first = OwnerId::generate();
    let second = OwnerId::generate();
    let ledger = MemoryLedger::new()
        .with_owner(first, 50)
        .with_owner(second, 50);
    let provisioner = StoreProvisioner::new(ledger.clone());

    provisioner
        .create_store(first, request("Corner Shop"))
        .await
        .unwrap();
    let err = provisioner
        .create_store(second, request("Corner Shop"))
        .await
        .unwrap_err();

    assert!(matches!(err, StoreCreationError::DuplicateSlug(slug) if slug == "corner-shop"));
    assert_eq!(ledger.balance(second), Some(credits(50)));
    assert_eq!(ledger.refund_attempts(), 0);
}

#[tokio::test]
async fn test_failed_insert_restores_balance() {
    let owner = OwnerId::generate();
    let ledger = MemoryLedger::new().with_owner(owner, 60);
    ledger.fail_inserts();
    let provisioner = StoreProvisioner::new(ledger.clone());

    let err = provisioner
        .create_store(owner, request("Corner Shop"))
        .await
        .unwrap_err();

    assert!(matches!(err, StoreCreationError::Persistence(_)));
    assert_eq!(ledger.balance(owner), Some(credits(60)));
    assert_eq!(ledger.refund_attempts(), 1);
    assert!(ledger.stores().is_empty());
}

#[tokio::test]
async fn test_failed_refund_is_reported_with_both_causes() {
    let owner = OwnerId::generate();
    let ledger = MemoryLedger::new().with_owner(owner, 60);
    ledger.fail_inserts();
    ledger.fail_refunds();
    let provisioner = StoreProvisioner::new(ledger.clone());

    let err = provisioner
        .create_store(owner, request("Corner Shop"))
        .await
        .unwrap_err();

    let StoreCreationError::RefundFailed { amount, insert, .. } = err else {
        panic!("expected RefundFailed, got {err:?}");
    };
    assert_eq!(amount, STORE_CREATION_COST);
    assert!(matches!(*insert, StoreCreationError::Persistence(_)));
    assert_eq!(ledger.balance(owner), Some(credits(10)));
    assert_eq!(ledger.refund_attempts(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creations_never_overdraw() {
    let owner = OwnerId::generate();
    let ledger = MemoryLedger::new().with_owner(owner, 100);
    let provisioner = Arc::new(StoreProvisioner::new(ledger.clone()));

    let mut tasks = JoinSet::new();
    for i in 0..5 {
        let provisioner = Arc::clone(&provisioner);
        tasks.spawn(async move {
            provisioner
                .create_store(owner, request(&format!("Shop {i}")))
                .await
        });
    }

    let mut created = 0;
    let mut refused = 0;
    while let Some(result) = tasks.join_next().await {
        match result.unwrap() {
            Ok(_) => created += 1,
            Err(StoreCreationError::InsufficientCredits { .. }) => refused += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(created, 2);
    assert_eq!(refused, 3);
    assert_eq!(ledger.balance(owner), Some(Credits::ZERO));
    assert_eq!(ledger.stores().len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_same_slug_charges_once() {
    let owner = OwnerId::generate();
    let ledger = MemoryLedger::new().with_owner(owner, 200);
    let provisioner = Arc::new(StoreProvisioner::new(ledger.clone()));

    let mut tasks = JoinSet::new();
    for _ in 0..4 {
        let provisioner = Arc::clone(&provisioner);
        tasks.spawn(async move { provisioner.create_store(owner, request("Corner Shop")).await });
    }

    let mut created = 0;
    while let Some(result) = tasks.join_next().await {
        match result.unwrap() {
            Ok(_) => created += 1,
            Err(StoreCreationError::DuplicateSlug(_)) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    // Losers either saw the slug up front or were refunded after the insert.
    assert_eq!(created, 1);
    assert_eq!(ledger.balance(owner), Some(credits(150)));
}
