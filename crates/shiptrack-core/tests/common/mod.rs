//! Test doubles and common utilities for coordinator contract tests
//!
//! These doubles count calls and fail on demand. They do not talk to any
//! real tracking API.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use shiptrack_core::error::{Error, Result};
use shiptrack_core::model::{PackageData, PackageStatus, TrackingEvent};
use shiptrack_core::state::MemoryTrackedStore;
use shiptrack_core::traits::{TrackedPackage, TrackedStore, TrackingBackend};
use shiptrack_core::TrackerConfig;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// How a scripted backend call should fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    Auth,
    NotFound,
    Timeout,
}

impl FailureMode {
    fn to_error(self, tracking_number: &str) -> Error {
        match self {
            Self::Auth => Error::auth("Invalid API key"),
            Self::NotFound => Error::not_found(tracking_number.to_string()),
            Self::Timeout => Error::timeout("request exceeded 30s"),
        }
    }
}

/// Build a package with `event_count` in-transit events one hour apart
pub fn sample_package(tracking_number: &str, status: PackageStatus, event_count: u32) -> PackageData {
    let mut data = PackageData::new(tracking_number);
    data.status = status;
    data.status_text = status.default_text().to_string();
    data.carrier = Some("dhl".to_string());
    data.events = (0..event_count)
        .map(|i| TrackingEvent {
            timestamp: Utc.with_ymd_and_hms(2025, 3, 1, i, 0, 0).unwrap(),
            status: PackageStatus::InTransit,
            status_text: format!("Scan {}", i),
            location_text: None,
            location: None,
        })
        .collect();
    data.last_update = data.events.last().map(|e| e.timestamp);
    data
}

/// A scripted TrackingBackend that tracks calls
#[derive(Clone, Default)]
pub struct MockBackend {
    create_calls: Arc<AtomicUsize>,
    fetch_calls: Arc<AtomicUsize>,
    /// Failure applied to every call unless overridden per number
    default_failure: Arc<std::sync::Mutex<Option<FailureMode>>>,
    failures: Arc<std::sync::Mutex<HashMap<String, FailureMode>>>,
    responses: Arc<std::sync::Mutex<HashMap<String, PackageData>>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_call_count(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_call_count(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    /// Fail every call (or stop failing with `None`)
    pub fn fail_all(&self, mode: Option<FailureMode>) {
        *self.default_failure.lock().unwrap() = mode;
    }

    /// Fail calls for one tracking number
    pub fn fail_number(&self, tracking_number: &str, mode: FailureMode) {
        self.failures
            .lock()
            .unwrap()
            .insert(tracking_number.to_string(), mode);
    }

    pub fn clear_failure(&self, tracking_number: &str) {
        self.failures.lock().unwrap().remove(tracking_number);
    }

    /// Script the package returned for a tracking number
    pub fn set_response(&self, data: PackageData) {
        self.responses
            .lock()
            .unwrap()
            .insert(data.tracking_number.clone(), data);
    }

    /// Script a response filed under a different number than requested
    pub fn set_response_for(&self, tracking_number: &str, data: PackageData) {
        self.responses
            .lock()
            .unwrap()
            .insert(tracking_number.to_string(), data);
    }

    fn respond(&self, tracking_number: &str) -> Result<PackageData> {
        let failure = self
            .failures
            .lock()
            .unwrap()
            .get(tracking_number)
            .copied()
            .or(*self.default_failure.lock().unwrap());
        if let Some(mode) = failure {
            return Err(mode.to_error(tracking_number));
        }

        Ok(self
            .responses
            .lock()
            .unwrap()
            .get(tracking_number)
            .cloned()
            .unwrap_or_else(|| sample_package(tracking_number, PackageStatus::InTransit, 1)))
    }
}

#[async_trait]
impl TrackingBackend for MockBackend {
    async fn create_tracker(
        &self,
        tracking_number: &str,
        _carrier_code: Option<&str>,
    ) -> Result<PackageData> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.respond(tracking_number)
    }

    async fn fetch_package(&self, tracking_number: &str) -> Result<PackageData> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.respond(tracking_number)
    }

    /// Accepts `{"trackings": [{"trackingNumber": ..., "status": "delivered"}]}`
    fn parse_webhook(&self, payload: &serde_json::Value) -> Result<Vec<Result<PackageData>>> {
        let trackings = payload
            .get("trackings")
            .and_then(|t| t.as_array())
            .ok_or_else(|| Error::malformed("missing trackings"))?;

        Ok(trackings
            .iter()
            .map(|t| {
                let tracking_number = t
                    .get("trackingNumber")
                    .and_then(|n| n.as_str())
                    .ok_or_else(|| Error::malformed("missing trackingNumber"))?;
                let status = match t.get("status").and_then(|s| s.as_str()) {
                    Some("delivered") => PackageStatus::Delivered,
                    Some("out_for_delivery") => PackageStatus::OutForDelivery,
                    _ => PackageStatus::InTransit,
                };
                Ok(sample_package(tracking_number, status, 2))
            })
            .collect())
    }

    async fn verify_credentials(&self) -> Result<()> {
        match *self.default_failure.lock().unwrap() {
            Some(mode) => Err(mode.to_error("")),
            None => Ok(()),
        }
    }

    fn backend_name(&self) -> &'static str {
        "mock"
    }
}

/// A TrackedStore that counts flushes, backed by MemoryTrackedStore
#[derive(Clone, Default)]
pub struct CountingStore {
    inner: MemoryTrackedStore,
    flush_calls: Arc<AtomicUsize>,
}

impl CountingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn flush_call_count(&self) -> usize {
        self.flush_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TrackedStore for CountingStore {
    async fn get_package(&self, tracking_number: &str) -> Result<Option<TrackedPackage>> {
        self.inner.get_package(tracking_number).await
    }

    async fn set_package(&self, package: &TrackedPackage) -> Result<()> {
        self.inner.set_package(package).await
    }

    async fn delete_package(&self, tracking_number: &str) -> Result<()> {
        self.inner.delete_package(tracking_number).await
    }

    async fn list_packages(&self) -> Result<Vec<TrackedPackage>> {
        self.inner.list_packages().await
    }

    async fn flush(&self) -> Result<()> {
        self.flush_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.flush().await
    }
}

/// Create a minimal valid configuration
pub fn minimal_config() -> TrackerConfig {
    TrackerConfig::new("test-key")
}
