//! Contract Test: Stale Data and Failure Isolation
//!
//! Verifies that a failed refresh never erases cached data.
//!
//! Constraints verified:
//! - Last-known-good data survives any failed poll
//! - One failing package does not affect the others
//! - A later successful poll returns the package to active
//! - Event history only grows between refreshes

mod common;

use common::*;
use shiptrack_core::{
    CoordinatorEvent, FailureKind, PackageSensor, PackageState, PackageStatus, UpdateCoordinator,
};
use std::sync::Arc;

#[tokio::test]
async fn failed_poll_keeps_last_known_good() {
    let backend = MockBackend::new();
    let store = CountingStore::new();
    let (coordinator, _events) = UpdateCoordinator::new(
        Arc::new(backend.clone()),
        Arc::new(store.clone()),
        &minimal_config(),
    )
    .unwrap();

    backend.set_response(sample_package("S24DEMO456393", PackageStatus::OutForDelivery, 3));
    coordinator.add_tracking("S24DEMO456393", None).await.unwrap();

    backend.fail_all(Some(FailureMode::Timeout));
    let summary = coordinator.refresh_all().await;
    assert_eq!(summary.failed, 1);

    let entry = coordinator.package("S24DEMO456393").await.unwrap();
    assert!(matches!(
        entry.state,
        PackageState::Error {
            kind: FailureKind::Transient,
            ..
        }
    ));
    let data = entry.data.clone().expect("cached data survives the failure");
    assert_eq!(data.status, PackageStatus::OutForDelivery);
    assert_eq!(data.events.len(), 3);

    let sensor = PackageSensor::from_entry(&entry);
    assert!(sensor.available);
    assert!(sensor.stale);
    assert_eq!(sensor.native_value.as_deref(), Some("Out for Delivery"));

    // Recovery
    backend.fail_all(None);
    let summary = coordinator.refresh_all().await;
    assert_eq!(summary.refreshed, 1);
    assert_eq!(
        coordinator.package("S24DEMO456393").await.unwrap().state,
        PackageState::Active
    );
}

#[tokio::test]
async fn failures_are_isolated_per_package() {
    let backend = MockBackend::new();
    let store = CountingStore::new();
    let (coordinator, mut events) = UpdateCoordinator::new(
        Arc::new(backend.clone()),
        Arc::new(store.clone()),
        &minimal_config(),
    )
    .unwrap();

    coordinator.add_tracking("AA111", None).await.unwrap();
    coordinator.add_tracking("BB222", None).await.unwrap();
    coordinator.add_tracking("CC333", None).await.unwrap();

    backend.fail_number("BB222", FailureMode::Timeout);
    let summary = coordinator.refresh_all().await;

    assert_eq!(summary.refreshed, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(
        coordinator.package("AA111").await.unwrap().state,
        PackageState::Active
    );
    assert!(coordinator.package("BB222").await.unwrap().state.is_error());
    assert_eq!(
        coordinator.package("CC333").await.unwrap().state,
        PackageState::Active
    );

    let status = coordinator.status_message().await;
    assert_eq!(
        status.last_error.as_deref(),
        Some("1 of 3 packages failed to update")
    );

    let mut failed = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let CoordinatorEvent::RefreshFailed {
            tracking_number, ..
        } = event
        {
            failed.push(tracking_number);
        }
    }
    assert_eq!(failed, vec!["BB222".to_string()]);
}

#[tokio::test]
async fn history_is_append_only_across_refreshes() {
    let backend = MockBackend::new();
    let store = CountingStore::new();
    let (coordinator, _events) = UpdateCoordinator::new(
        Arc::new(backend.clone()),
        Arc::new(store.clone()),
        &minimal_config(),
    )
    .unwrap();

    backend.set_response(sample_package("S24DEMO456393", PackageStatus::InTransit, 3));
    coordinator.add_tracking("S24DEMO456393", None).await.unwrap();

    // The API now returns a truncated timeline
    let mut truncated = sample_package("S24DEMO456393", PackageStatus::InTransit, 3);
    truncated.events.remove(0);
    backend.set_response(truncated);

    let data = coordinator.refresh_package("S24DEMO456393").await.unwrap();
    assert_eq!(data.events.len(), 3);
    assert!(data.events.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
}
