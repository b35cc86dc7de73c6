//! Write-path validation tests for usage-ledger.

mod common;

use chrono::Duration;
use common::{additional_storage, closed, resource_usage, spawn_ledger, t0};
use std::sync::Arc;
use usage_ledger::error::UsageError;
use usage_ledger::models::{UsageKind, UsageTypeRegistry};
use usage_ledger::services::{MemoryUsageStore, UsageLedger};

#[tokio::test]
async fn record_then_list_by_user_includes_event_once() {
    let ledger = spawn_ledger();

    let recorded = ledger
        .record_event(resource_usage("alice", "res-1", "small", t0()))
        .await
        .unwrap();

    let events = ledger.list_by_user("alice").await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].id, recorded.id);
    assert_eq!(events[0].login, "alice");
    assert_eq!(events[0].resource_size.as_deref(), Some("small"));
    assert!(events[0].is_open());
}

#[tokio::test]
async fn closed_event_is_stored_with_end_time() {
    let ledger = spawn_ledger();

    let recorded = ledger
        .record_event(closed(
            resource_usage("alice", "res-1", "small", t0()),
            t0() + Duration::hours(2),
        ))
        .await
        .unwrap();

    assert!(!recorded.is_open());
    assert_eq!(recorded.end_time_utc(), Some(t0() + Duration::hours(2)));
}

#[tokio::test]
async fn unknown_usage_type_is_rejected_and_store_unchanged() {
    let ledger = spawn_ledger();

    let mut input = resource_usage("alice", "res-1", "small", t0());
    input.usage_type = "premium_usage".to_string();

    let err = ledger.record_event(input).await.unwrap_err();
    assert!(matches!(err, UsageError::InvalidUsageType(_)));
    assert!(ledger.list_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn usage_type_outside_registry_is_rejected() {
    common::init_tracing();
    let ledger = UsageLedger::new(
        Arc::new(MemoryUsageStore::new()),
        UsageTypeRegistry::new([UsageKind::AdditionalStorage]),
    );

    // valid kind, but the injected registry does not accept it
    let err = ledger
        .record_event(resource_usage("alice", "res-1", "small", t0()))
        .await
        .unwrap_err();
    assert!(matches!(err, UsageError::InvalidUsageType(_)));

    ledger
        .record_event(additional_storage("alice", "res-1", 5, t0()))
        .await
        .unwrap();
    assert_eq!(ledger.list_all().await.unwrap().len(), 1);
}

#[tokio::test]
async fn resource_usage_requires_resource_size() {
    let ledger = spawn_ledger();

    let mut input = resource_usage("alice", "res-1", "small", t0());
    input.resource_size = None;

    let err = ledger.record_event(input).await.unwrap_err();
    assert!(matches!(
        err,
        UsageError::MissingRequiredField {
            field: "resource_size",
            usage_type: UsageKind::ResourceUsage,
        }
    ));
    assert!(ledger.list_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn additional_storage_requires_gb_amount() {
    let ledger = spawn_ledger();

    let mut input = additional_storage("alice", "res-1", 5, t0());
    input.additional_storage_gb = None;

    let err = ledger.record_event(input).await.unwrap_err();
    assert!(matches!(
        err,
        UsageError::MissingRequiredField {
            field: "additional_storage_gb",
            usage_type: UsageKind::AdditionalStorage,
        }
    ));
    assert!(ledger.list_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn end_time_before_begin_time_is_rejected() {
    let ledger = spawn_ledger();

    let input = closed(
        resource_usage("alice", "res-1", "small", t0()),
        t0() - Duration::hours(1),
    );

    let err = ledger.record_event(input).await.unwrap_err();
    assert!(matches!(err, UsageError::InvalidInterval { .. }));
    assert!(ledger.list_all().await.unwrap().is_empty());
}
