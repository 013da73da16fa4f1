//! Test doubles for router tests

#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response};
use serde_json::Value;
use shiptrack_core::model::{PackageData, PackageStatus};
use shiptrack_core::state::MemoryTrackedStore;
use shiptrack_core::traits::TrackingBackend;
use shiptrack_core::{CoordinatorEvent, Error, Result, TrackerConfig, UpdateCoordinator};
use shiptrack_http::{AppState, router};
use std::sync::Arc;
use tokio::sync::mpsc;
use tower::ServiceExt;

pub const WEBHOOK_ID: &str = "hook-123";

/// Backend that returns an in-transit package for any number
///
/// Numbers starting with `BAD` are rejected as unknown; the key `bad-key`
/// fails authentication.
pub struct StubBackend {
    pub api_key: &'static str,
}

#[async_trait]
impl TrackingBackend for StubBackend {
    async fn create_tracker(
        &self,
        tracking_number: &str,
        _carrier_code: Option<&str>,
    ) -> Result<PackageData> {
        self.fetch_package(tracking_number).await
    }

    async fn fetch_package(&self, tracking_number: &str) -> Result<PackageData> {
        if self.api_key == "bad-key" {
            return Err(Error::auth("Invalid API key"));
        }
        if tracking_number.starts_with("BAD") {
            return Err(Error::not_found(tracking_number.to_string()));
        }
        let mut data = PackageData::new(tracking_number);
        data.status = PackageStatus::InTransit;
        data.status_text = "In Transit".to_string();
        Ok(data)
    }

    fn parse_webhook(&self, payload: &Value) -> Result<Vec<Result<PackageData>>> {
        let trackings = payload
            .get("trackings")
            .and_then(Value::as_array)
            .ok_or_else(|| Error::malformed("missing trackings"))?;
        Ok(trackings
            .iter()
            .filter_map(|t| t.get("trackingNumber").and_then(Value::as_str))
            .map(|n| {
                let mut data = PackageData::new(n);
                data.status = PackageStatus::Delivered;
                data.status_text = "Delivered".to_string();
                Ok(data)
            })
            .collect())
    }

    async fn verify_credentials(&self) -> Result<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "stub"
    }
}

pub struct TestApp {
    pub router: Router,
    pub coordinator: Arc<UpdateCoordinator>,
    pub events: mpsc::Receiver<CoordinatorEvent>,
}

pub fn test_app(api_key: &'static str, webhook_queue_capacity: usize) -> TestApp {
    let mut config = TrackerConfig::new("test-key");
    config.coordinator.webhook_queue_capacity = webhook_queue_capacity;

    let (coordinator, events) = UpdateCoordinator::new(
        Arc::new(StubBackend { api_key }),
        Arc::new(MemoryTrackedStore::new()),
        &config,
    )
    .expect("coordinator construction succeeds");
    let coordinator = Arc::new(coordinator);

    let state = AppState::new(Arc::clone(&coordinator), Some(WEBHOOK_ID.to_string()));
    TestApp {
        router: router(state),
        coordinator,
        events,
    }
}

pub async fn send(router: &Router, request: Request<Body>) -> Response<Body> {
    router.clone().oneshot(request).await.unwrap()
}

pub fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
