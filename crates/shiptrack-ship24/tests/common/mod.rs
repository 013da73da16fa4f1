//! Shared fixtures for Ship24 backend tests

#![allow(dead_code)]

use serde_json::{Value, json};
use shiptrack_core::config::ApiConfig;
use shiptrack_ship24::Ship24Backend;

pub const API_KEY: &str = "test-key";

/// A backend pointed at a mock server
pub fn backend_for(base_url: &str) -> Ship24Backend {
    Ship24Backend::from_config(&ApiConfig::new(API_KEY).with_base_url(base_url))
        .expect("backend construction succeeds")
}

/// A results response for an in-transit shipment with two events
pub fn tracking_response(tracking_number: &str) -> Value {
    json!({
        "data": {
            "trackings": [{
                "tracker": {
                    "trackerId": "5f7c0a4e-0000-4000-8000-000000000001",
                    "trackingNumber": tracking_number,
                    "isSubscribed": true,
                    "courierCode": ["us-post"]
                },
                "shipment": {
                    "statusMilestone": "in_transit",
                    "statusCode": "transit_pickup",
                    "delivery": { "estimatedDeliveryDate": "2025-03-05T00:00:00Z" }
                },
                "events": [
                    {
                        "occurrenceDatetime": "2025-03-02T09:12:00Z",
                        "status": "Departed facility",
                        "statusMilestone": "in_transit",
                        "location": "Chicago, IL",
                        "courierCode": "us-post"
                    },
                    {
                        "occurrenceDatetime": "2025-03-01T16:40:00Z",
                        "status": "Shipping label created",
                        "statusMilestone": "info_received",
                        "location": "Denver, CO",
                        "courierCode": "us-post"
                    }
                ],
                "statistics": {
                    "timestamps": { "inTransitDatetime": "2025-03-02T09:12:00Z" }
                }
            }]
        }
    })
}

/// A `GET /trackers` response listing the given trackers
pub fn tracker_list(entries: &[(&str, bool, bool)]) -> Value {
    let trackers: Vec<Value> = entries
        .iter()
        .map(|(number, subscribed, tracked)| {
            json!({
                "trackerId": format!("id-{}", number),
                "trackingNumber": number,
                "isSubscribed": subscribed,
                "isTracked": tracked
            })
        })
        .collect();
    json!({ "data": { "trackers": trackers } })
}
