//! Contract Test: HTTP Router
//!
//! Constraints verified:
//! - Services mutate the tracked set and report outcomes
//! - Sensor endpoints read the coordinator cache
//! - The webhook receiver checks its id, validates JSON and applies backpressure

mod common;

use axum::http::StatusCode;
use common::*;
use serde_json::json;

#[tokio::test]
async fn health_is_ok() {
    let app = test_app("test-key", 8);
    let response = send(&app.router, get("/health")).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "OK");
}

#[tokio::test]
async fn add_list_and_remove_package() {
    let app = test_app("test-key", 8);

    let response = send(
        &app.router,
        post_json(
            "/api/services/add_tracking",
            &json!({ "tracking_number": " S24DEMO456393 ", "custom_name": "Shoes" }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["tracking_number"], "S24DEMO456393");
    assert_eq!(body["outcome"], "added");

    let response = send(&app.router, get("/api/packages")).await;
    let sensors = body_json(response).await;
    assert_eq!(sensors.as_array().map(Vec::len), Some(1));
    assert_eq!(sensors[0]["unique_id"], "ship24_S24DEMO456393");
    assert_eq!(sensors[0]["name"], "Shoes");
    assert_eq!(sensors[0]["native_value"], "In Transit");
    assert_eq!(sensors[0]["icon"], "mdi:truck-delivery");

    let response = send(&app.router, get("/api/packages/S24DEMO456393")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(
        &app.router,
        post_json(
            "/api/services/remove_tracking",
            &json!({ "tracking_number": "S24DEMO456393" }),
        ),
    )
    .await;
    assert_eq!(body_json(response).await["removed"], true);

    let response = send(&app.router, get("/api/packages/S24DEMO456393")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn add_rejects_empty_number() {
    let app = test_app("test-key", 8);

    let response = send(
        &app.router,
        post_json("/api/services/add_tracking", &json!({ "tracking_number": "  " })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["error"].is_string());
}

#[tokio::test]
async fn add_with_rejected_key_is_unauthorized() {
    let app = test_app("bad-key", 8);

    let response = send(
        &app.router,
        post_json(
            "/api/services/add_tracking",
            &json!({ "tracking_number": "S24DEMO456393" }),
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(app.coordinator.tracked_numbers().await.unwrap().is_empty());
}

#[tokio::test]
async fn unknown_number_is_tracked_with_error_sensor() {
    let app = test_app("test-key", 8);

    let response = send(
        &app.router,
        post_json("/api/services/add_tracking", &json!({ "tracking_number": "BAD1" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let sensor = body_json(send(&app.router, get("/api/packages/BAD1")).await).await;
    assert_eq!(sensor["available"], false);
    assert_eq!(sensor["stale"], true);

    let status = body_json(send(&app.router, get("/api/status")).await).await;
    assert!(
        status["native_value"]
            .as_str()
            .is_some_and(|v| v.starts_with("Error: "))
    );
}

#[tokio::test]
async fn refresh_reports_summary() {
    let app = test_app("test-key", 8);
    app.coordinator.add_tracking("AA111", None).await.unwrap();
    app.coordinator.add_tracking("BAD2", None).await.unwrap();

    let response = send(&app.router, post_json("/api/services/refresh", &json!({}))).await;
    let summary = body_json(response).await;

    assert_eq!(summary["refreshed"], 1);
    assert_eq!(summary["failed"], 1);
}

#[tokio::test]
async fn webhook_with_wrong_id_is_not_found() {
    let app = test_app("test-key", 8);

    let response = send(
        &app.router,
        post_json("/api/webhook/wrong", &json!({ "trackings": [] })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn webhook_with_invalid_json_is_bad_request() {
    let app = test_app("test-key", 8);

    let request = axum::http::Request::post(format!("/api/webhook/{}", WEBHOOK_ID))
        .body(axum::body::Body::from("{ not json"))
        .unwrap();
    let response = send(&app.router, request).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn webhook_is_queued_for_the_coordinator() {
    let mut app = test_app("test-key", 8);
    app.coordinator.add_tracking("S24DEMO456393", None).await.unwrap();

    let response = send(
        &app.router,
        post_json(
            &format!("/api/webhook/{}", WEBHOOK_ID),
            &json!({ "trackings": [{ "trackingNumber": "S24DEMO456393" }] }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "OK");

    // Not applied until the run loop picks it up
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let runner = std::sync::Arc::clone(&app.coordinator);
    let handle = tokio::spawn(async move { runner.run_with_shutdown(Some(shutdown_rx)).await });

    let applied = tokio::time::timeout(std::time::Duration::from_secs(5), async {
        while let Some(event) = app.events.recv().await {
            if matches!(event, shiptrack_core::CoordinatorEvent::WebhookApplied { .. }) {
                return true;
            }
        }
        false
    })
    .await
    .unwrap();
    assert!(applied);

    shutdown_tx.send(()).unwrap();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn full_webhook_inbox_is_service_unavailable() {
    let app = test_app("test-key", 1);
    let uri = format!("/api/webhook/{}", WEBHOOK_ID);
    let payload = json!({ "trackings": [] });

    // Nothing drains the inbox, so the second payload overflows it
    let first = send(&app.router, post_json(&uri, &payload)).await;
    let second = send(&app.router, post_json(&uri, &payload)).await;

    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(second.status(), StatusCode::SERVICE_UNAVAILABLE);
}
