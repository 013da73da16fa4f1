//! Route handlers

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};
use shiptrack_core::{AddOutcome, PackageSensor, RefreshSummary, StatusSensor};

use crate::AppState;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct AddTrackingRequest {
    pub tracking_number: String,
    #[serde(default)]
    pub custom_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AddTrackingResponse {
    pub tracking_number: String,
    pub outcome: AddOutcome,
}

#[derive(Debug, Deserialize)]
pub struct RemoveTrackingRequest {
    pub tracking_number: String,
}

#[derive(Debug, Serialize)]
pub struct RemoveTrackingResponse {
    pub tracking_number: String,
    pub removed: bool,
}

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

pub async fn list_packages(State(state): State<AppState>) -> Json<Vec<PackageSensor>> {
    let sensors = state
        .coordinator
        .packages()
        .await
        .iter()
        .map(PackageSensor::from_entry)
        .collect();
    Json(sensors)
}

pub async fn get_package(
    State(state): State<AppState>,
    Path(tracking_number): Path<String>,
) -> Result<Json<PackageSensor>, ApiError> {
    state
        .coordinator
        .package(&tracking_number)
        .await
        .map(|entry| Json(PackageSensor::from_entry(&entry)))
        .ok_or_else(|| ApiError::not_found(format!("{} is not tracked", tracking_number)))
}

pub async fn status(State(state): State<AppState>) -> Json<StatusSensor> {
    Json(StatusSensor::from_status(
        &state.coordinator.status_message().await,
    ))
}

pub async fn add_tracking(
    State(state): State<AppState>,
    Json(request): Json<AddTrackingRequest>,
) -> Result<Json<AddTrackingResponse>, ApiError> {
    let outcome = state
        .coordinator
        .add_tracking(&request.tracking_number, request.custom_name)
        .await?;

    Ok(Json(AddTrackingResponse {
        tracking_number: request.tracking_number.trim().to_string(),
        outcome,
    }))
}

pub async fn remove_tracking(
    State(state): State<AppState>,
    Json(request): Json<RemoveTrackingRequest>,
) -> Result<Json<RemoveTrackingResponse>, ApiError> {
    let removed = state
        .coordinator
        .remove_tracking(&request.tracking_number)
        .await?;

    Ok(Json(RemoveTrackingResponse {
        tracking_number: request.tracking_number.trim().to_string(),
        removed,
    }))
}

pub async fn refresh(State(state): State<AppState>) -> Json<RefreshSummary> {
    Json(state.coordinator.refresh_all().await)
}

/// Receive a pushed Ship24 update
///
/// The payload is queued for the coordinator's run loop, so the sender
/// gets its answer before the update is applied.
pub async fn webhook(
    State(state): State<AppState>,
    Path(webhook_id): Path<String>,
    body: Bytes,
) -> impl IntoResponse {
    if state.webhook_id.as_deref() != Some(webhook_id.as_str()) {
        tracing::debug!("Webhook for unknown id rejected");
        return (StatusCode::NOT_FOUND, "Not Found");
    }

    let payload: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::warn!("Webhook body is not JSON: {}", e);
            return (StatusCode::BAD_REQUEST, "Invalid JSON");
        }
    };

    match state.inbox.try_submit(payload) {
        Ok(()) => (StatusCode::OK, "OK"),
        Err(e) => {
            tracing::warn!("Webhook payload rejected: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, "Busy")
        }
    }
}
